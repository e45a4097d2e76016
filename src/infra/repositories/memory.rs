//! In-process provider used by `memory://` and by the service-level tests.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use crate::domain::models::{
    event::Event,
    purchase::{PaymentStatus, Purchase},
    ticket_category::TicketCategory,
};
use crate::domain::ports::{EventRepository, PurchaseRepository, TicketCategoryRepository};
use crate::domain::services::inventory;
use crate::error::AppError;

#[derive(Default)]
struct Store {
    events: Vec<Event>,
    categories: Vec<TicketCategory>,
    purchases: Vec<Purchase>,
}

/// All three repositories behind one lock, so a sale and its purchase row are
/// written under the same guard.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Store>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::InternalWithMsg("In-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        let mut store = self.lock()?;
        if store.events.iter().any(|e| e.id == event.id) {
            return Err(AppError::Constraint(format!("Duplicate event id {}", event.id)));
        }
        store.events.push(event.clone());
        Ok(event.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError> {
        Ok(self.lock()?.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Event>, AppError> {
        let mut events = self.lock()?.events.clone();
        events.sort_by_key(|e| e.start_time);
        Ok(events)
    }

    async fn update(&self, event: &Event) -> Result<Event, AppError> {
        let mut store = self.lock()?;
        let current = store
            .events
            .iter()
            .find(|e| e.id == event.id)
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
        let stored = Event {
            created_at: current.created_at,
            stream_key: current.stream_key.clone(),
            ..event.clone()
        };
        inventory::ensure_ceiling_covers_allocation(&stored, &store.categories)?;

        if let Some(slot) = store.events.iter_mut().find(|e| e.id == event.id) {
            *slot = stored.clone();
        }
        Ok(stored)
    }
}

#[async_trait]
impl TicketCategoryRepository for InMemoryStore {
    async fn create(&self, category: &TicketCategory) -> Result<TicketCategory, AppError> {
        let mut store = self.lock()?;
        let event = store
            .events
            .iter()
            .find(|e| e.id == category.event_id)
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
        if store.categories.iter().any(|c| c.id == category.id) {
            return Err(AppError::Constraint(format!("Duplicate ticket category id {}", category.id)));
        }
        inventory::ensure_allocation_fits(event, &store.categories, category.quantity, None)?;
        store.categories.push(category.clone());
        Ok(category.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TicketCategory>, AppError> {
        Ok(self.lock()?.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<TicketCategory>, AppError> {
        Ok(self
            .lock()?
            .categories
            .iter()
            .filter(|c| c.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<TicketCategory>, AppError> {
        Ok(self.lock()?.categories.clone())
    }

    async fn update(&self, category: &TicketCategory) -> Result<TicketCategory, AppError> {
        let mut store = self.lock()?;
        let current = store
            .categories
            .iter()
            .find(|c| c.id == category.id)
            .ok_or_else(|| AppError::NotFound("Ticket category not found".into()))?;

        // Only the editable fields move; sold_quantity stays whatever sales made it.
        let mut updated = current.clone();
        updated.name = category.name.clone();
        updated.price = category.price;
        updated.quantity = category.quantity;
        updated.validate()?;

        let event = store
            .events
            .iter()
            .find(|e| e.id == updated.event_id)
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
        inventory::ensure_allocation_fits(event, &store.categories, updated.quantity, Some(updated.id.as_str()))?;

        if let Some(slot) = store.categories.iter_mut().find(|c| c.id == updated.id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    async fn record_sale(&self, category_id: &str, quantity: u32) -> Result<TicketCategory, AppError> {
        let mut store = self.lock()?;
        let slot = store
            .categories
            .iter_mut()
            .find(|c| c.id == category_id)
            .ok_or_else(|| AppError::NotFound("Ticket category not found".into()))?;

        let updated = inventory::record_sale(slot, quantity)?;
        *slot = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryStore {
    async fn create_with_sale(&self, purchase: &Purchase) -> Result<(Purchase, TicketCategory), AppError> {
        let mut store = self.lock()?;
        if store.purchases.iter().any(|p| p.id == purchase.id) {
            return Err(AppError::Constraint(format!("Duplicate purchase id {}", purchase.id)));
        }

        let slot = store
            .categories
            .iter_mut()
            .find(|c| c.id == purchase.ticket_category_id)
            .ok_or_else(|| AppError::NotFound("Ticket category not found".into()))?;

        let category = inventory::record_sale(slot, purchase.quantity)?;
        *slot = category.clone();
        store.purchases.push(purchase.clone());

        Ok((purchase.clone(), category))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Purchase>, AppError> {
        Ok(self.lock()?.purchases.iter().find(|p| p.id == id).cloned())
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Purchase>, AppError> {
        Ok(self
            .lock()?
            .purchases
            .iter()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Purchase>, AppError> {
        Ok(self.lock()?.purchases.clone())
    }

    async fn update_status(&self, id: &str, expected: PaymentStatus, status: PaymentStatus) -> Result<Purchase, AppError> {
        let mut store = self.lock()?;
        let slot = store
            .purchases
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound("Purchase not found".into()))?;

        if slot.payment_status != expected {
            return Err(AppError::InvalidStateTransition { from: slot.payment_status, to: status });
        }
        slot.payment_status = status;
        Ok(slot.clone())
    }
}
