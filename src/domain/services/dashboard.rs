use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::models::{
    event::{Event, EventPatch, NewEventParams},
    purchase::{Buyer, NewPurchaseParams, PaymentStatus, Purchase},
    ticket_category::{NewTicketCategoryParams, TicketCategory, TicketCategoryPatch, TicketType},
};
use crate::domain::ports::{Clock, EventRepository, PurchaseRepository, TicketCategoryRepository};
use crate::domain::services::{
    analytics::{self, BreakdownEntry, BuyerSummary, DashboardStats, EventSummary, PeriodComparison, TimeRange, TimeSeriesPoint, TypeRevenue},
    export,
    inventory::{self, InventoryTotals},
    lifecycle,
    query::{self, BuyerFilter, EventFilter},
    streaming::{self, StreamingSettings},
};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Global,
    Event(String),
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AggregateMetrics {
    /// Present when the metrics are scoped to one event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSummary>,
    pub stats: DashboardStats,
    pub inventory: InventoryTotals,
    pub buyers: BuyerSummary,
    pub capacity_remaining: Option<u32>,
    pub revenue_by_type: BTreeMap<TicketType, TypeRevenue>,
    pub sales_mix: Vec<BreakdownEntry>,
    pub payment_statuses: Vec<BreakdownEntry>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Analytics {
    pub range: TimeRange,
    pub comparison: PeriodComparison,
    pub time_series: Vec<TimeSeriesPoint<NaiveDate>>,
    pub revenue_by_type: BTreeMap<TicketType, TypeRevenue>,
    pub sales_mix: Vec<BreakdownEntry>,
    pub stats: DashboardStats,
}

/// CSV body plus the file name the dashboard offers for download.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyerExport {
    pub file_name: String,
    pub csv: String,
}

pub struct DashboardService {
    events: Arc<dyn EventRepository>,
    categories: Arc<dyn TicketCategoryRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        categories: Arc<dyn TicketCategoryRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { events, categories, purchases, clock }
    }

    async fn require_event(&self, event_id: &str) -> Result<Event, AppError> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))
    }

    async fn require_category(&self, category_id: &str) -> Result<TicketCategory, AppError> {
        self.categories
            .find_by_id(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket category not found".into()))
    }

    async fn require_purchase(&self, purchase_id: &str) -> Result<Purchase, AppError> {
        self.purchases
            .find_by_id(purchase_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase not found".into()))
    }

    // --- Events ---

    pub async fn get_event(&self, event_id: &str) -> Result<EventSummary, AppError> {
        let event = self.require_event(event_id).await?;
        let categories = self.categories.list_by_event(event_id).await?;
        Ok(analytics::event_summary(&event, &categories, self.clock.now()))
    }

    pub async fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventSummary>, AppError> {
        let now = self.clock.now();
        let events = self.events.list().await?;
        let categories = self.categories.list().await?;

        Ok(query::filter_events(&events, filter, now)
            .iter()
            .map(|event| analytics::event_summary(event, &categories, now))
            .collect())
    }

    pub async fn create_event(&self, params: NewEventParams) -> Result<Event, AppError> {
        let event = Event::new(params, self.clock.now())?;
        let created = self.events.create(&event).await?;
        info!("Event created: {} ({})", created.title, created.id);
        Ok(created)
    }

    pub async fn update_event(&self, event_id: &str, patch: EventPatch) -> Result<Event, AppError> {
        let existing = self.require_event(event_id).await?;
        let updated = existing.apply_patch(patch)?;

        // The repository refuses a ceiling below what categories already hold.
        let saved = self.events.update(&updated).await?;
        info!("Event updated: {}", saved.id);
        Ok(saved)
    }

    pub async fn streaming_settings(&self, event_id: &str) -> Result<StreamingSettings, AppError> {
        let event = self.require_event(event_id).await?;
        streaming::streaming_settings(&event)
    }

    // --- Ticket categories ---

    pub async fn list_categories(&self, event_id: &str) -> Result<Vec<TicketCategory>, AppError> {
        self.require_event(event_id).await?;
        self.categories.list_by_event(event_id).await
    }

    pub async fn create_ticket_category(
        &self,
        event_id: &str,
        params: NewTicketCategoryParams,
    ) -> Result<TicketCategory, AppError> {
        let event = self.require_event(event_id).await?;
        let category = TicketCategory::new(event.id.clone(), params, self.clock.now())?;
        let created = self.categories.create(&category).await?;
        info!("Ticket category {} ({}) added to event {}", created.name, created.ticket_type, event.id);
        Ok(created)
    }

    pub async fn update_ticket_category(
        &self,
        category_id: &str,
        patch: TicketCategoryPatch,
    ) -> Result<TicketCategory, AppError> {
        let existing = self.require_category(category_id).await?;
        let updated = inventory::apply_category_patch(&existing, patch)?;
        let saved = self.categories.update(&updated).await?;
        info!("Ticket category updated: {}", saved.id);
        Ok(saved)
    }

    // --- Purchases ---

    async fn buyers_for_event(&self, event_id: &str) -> Result<Vec<Buyer>, AppError> {
        self.require_event(event_id).await?;
        let categories: HashMap<String, TicketCategory> = self
            .categories
            .list_by_event(event_id)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let purchases = self.purchases.list_by_event(event_id).await?;
        let mut buyers = Vec::with_capacity(purchases.len());
        for purchase in purchases {
            match categories.get(&purchase.ticket_category_id) {
                Some(category) => buyers.push(Buyer::new(purchase, category)),
                None => warn!(
                    "Purchase {} references unknown ticket category {}",
                    purchase.id, purchase.ticket_category_id
                ),
            }
        }
        Ok(buyers)
    }

    pub async fn list_purchases(&self, event_id: &str, filter: &BuyerFilter) -> Result<Vec<Buyer>, AppError> {
        let buyers = self.buyers_for_event(event_id).await?;
        Ok(query::filter_buyers(&buyers, filter))
    }

    pub async fn recent_attendees(&self, event_id: &str, limit: usize) -> Result<Vec<Buyer>, AppError> {
        let buyers = self.buyers_for_event(event_id).await?;
        Ok(query::recent_buyers(&buyers, limit))
    }

    pub async fn record_purchase(
        &self,
        event_id: &str,
        params: NewPurchaseParams,
    ) -> Result<(Purchase, TicketCategory), AppError> {
        let category = self.require_category(&params.ticket_category_id).await?;
        if category.event_id != event_id {
            return Err(AppError::NotFound("Ticket category not found for this event".into()));
        }

        let purchase = Purchase::new(params, &category, self.clock.now())?;
        if !purchase.seat_count_matches() {
            warn!(
                "Purchase {} has {} seat numbers for {} tickets",
                purchase.id,
                purchase.seat_numbers.as_ref().map_or(0, Vec::len),
                purchase.quantity
            );
        }

        let (saved, category) = self.purchases.create_with_sale(&purchase).await?;
        info!(
            "Purchase {} recorded: {} x {} for {} ({} of {} sold)",
            saved.id, saved.quantity, category.name, saved.buyer_email, category.sold_quantity, category.quantity
        );
        Ok((saved, category))
    }

    pub async fn refund_purchase(&self, purchase_id: &str) -> Result<Purchase, AppError> {
        let purchase = self.require_purchase(purchase_id).await?;
        let refunded = lifecycle::refund(&purchase)?;
        let saved = self
            .purchases
            .update_status(purchase_id, purchase.payment_status, refunded.payment_status)
            .await?;
        info!("Purchase {} refunded; inventory unchanged", saved.id);
        Ok(saved)
    }

    pub async fn update_payment_status(&self, purchase_id: &str, status: PaymentStatus) -> Result<Purchase, AppError> {
        let purchase = self.require_purchase(purchase_id).await?;
        lifecycle::validate_transition(purchase.payment_status, status)?;
        let saved = self
            .purchases
            .update_status(purchase_id, purchase.payment_status, status)
            .await?;
        info!("Purchase {} moved from {} to {}", saved.id, purchase.payment_status, saved.payment_status);
        Ok(saved)
    }

    pub async fn export_buyers_csv(&self, event_id: &str, filter: &BuyerFilter) -> Result<BuyerExport, AppError> {
        let event = self.require_event(event_id).await?;
        let buyers = self.list_purchases(event_id, filter).await?;
        info!("Exporting {} buyers for event {}", buyers.len(), event.id);

        Ok(BuyerExport {
            file_name: export::export_file_name(&event.title),
            csv: export::to_csv(&buyers),
        })
    }

    // --- Metrics ---

    pub async fn get_aggregate_metrics(&self, scope: Scope) -> Result<AggregateMetrics, AppError> {
        let now = self.clock.now();

        let (events, categories, purchases) = match &scope {
            Scope::Event(event_id) => {
                let event = self.require_event(event_id).await?;
                let categories = self.categories.list_by_event(event_id).await?;
                let purchases = self.purchases.list_by_event(event_id).await?;
                (vec![event], categories, purchases)
            }
            Scope::Global => (
                self.events.list().await?,
                self.categories.list().await?,
                self.purchases.list().await?,
            ),
        };

        let (event, capacity_remaining) = match scope {
            Scope::Event(_) => match events.first() {
                Some(e) => (
                    Some(analytics::event_summary(e, &categories, now)),
                    inventory::capacity_remaining(e, &categories)?,
                ),
                None => (None, None),
            },
            Scope::Global => (None, None),
        };

        Ok(AggregateMetrics {
            event,
            stats: analytics::dashboard_stats(&events, &categories, now),
            inventory: inventory::aggregate_across_categories(&categories),
            buyers: analytics::buyer_summary(&purchases),
            capacity_remaining,
            revenue_by_type: analytics::revenue_by_category_type(&categories),
            sales_mix: analytics::sales_mix(&categories),
            payment_statuses: analytics::payment_status_breakdown(&purchases),
        })
    }

    pub async fn get_analytics(&self, range: TimeRange) -> Result<Analytics, AppError> {
        let now = self.clock.now();
        let events = self.events.list().await?;
        let categories = self.categories.list().await?;
        let purchases = self.purchases.list().await?;

        let window_start = now - range.duration();
        let in_window: Vec<Purchase> = purchases
            .iter()
            .filter(|p| p.payment_status == PaymentStatus::Paid)
            .filter(|p| p.purchased_at > window_start && p.purchased_at <= now)
            .cloned()
            .collect();

        Ok(Analytics {
            range,
            comparison: analytics::compare_periods(&purchases, range, now),
            time_series: analytics::aggregate_time_series(&in_window, range.bucket()),
            revenue_by_type: analytics::revenue_by_category_type(&categories),
            sales_mix: analytics::sales_mix(&categories),
            stats: analytics::dashboard_stats(&events, &categories, now),
        })
    }
}
