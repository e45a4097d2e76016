use crate::domain::models::{
    event::Event,
    purchase::{PaymentStatus, Purchase},
    ticket_category::TicketCategory,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Time source used to derive event status and stamp new records.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    async fn list(&self) -> Result<Vec<Event>, AppError>;
    /// Leaves `stream_key` and `created_at` as stored. Fails with a `max_attendees`
    /// validation error if the new ceiling is below the tickets allocated to categories.
    async fn update(&self, event: &Event) -> Result<Event, AppError>;
}

#[async_trait]
pub trait TicketCategoryRepository: Send + Sync {
    /// Fails with a `quantity` validation error if the event's categories would then hold
    /// more tickets than `max_attendees`. The check and the insert are one atomic step.
    async fn create(&self, category: &TicketCategory) -> Result<TicketCategory, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<TicketCategory>, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<TicketCategory>, AppError>;
    async fn list(&self) -> Result<Vec<TicketCategory>, AppError>;
    /// Updates name, price and quantity. Fails if the new quantity is below what has already
    /// sold or would push the event's allocation past `max_attendees`.
    async fn update(&self, category: &TicketCategory) -> Result<TicketCategory, AppError>;
    /// Atomically adds `quantity` to `sold_quantity`, failing with `CapacityExceeded`
    /// rather than overselling.
    async fn record_sale(&self, category_id: &str, quantity: u32) -> Result<TicketCategory, AppError>;
}

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Records the sale on the purchase's category and inserts the purchase in one transaction.
    async fn create_with_sale(&self, purchase: &Purchase) -> Result<(Purchase, TicketCategory), AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Purchase>, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Purchase>, AppError>;
    async fn list(&self) -> Result<Vec<Purchase>, AppError>;
    /// Sets `status` only if the stored status is still `expected`.
    async fn update_status(&self, id: &str, expected: PaymentStatus, status: PaymentStatus) -> Result<Purchase, AppError>;
}
