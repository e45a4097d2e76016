use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::domain::models::{
    event::{EventPatch, NewEventParams, VirtualMode},
    purchase::{NewPurchaseParams, PaymentStatus},
    ticket_category::{NewTicketCategoryParams, TicketCategoryPatch, TicketType},
};
use crate::domain::services::analytics::TimeRange;
use crate::domain::services::query::{parse_selection, BuyerFilter, EventFilter};
use crate::error::AppError;

pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    #[serde(default)]
    pub virtual_mode: VirtualMode,
    pub virtual_url: Option<String>,
    pub max_attendees: Option<u32>,
}

impl From<CreateEventRequest> for NewEventParams {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            category: req.category,
            start_time: req.start_time,
            end_time: req.end_time,
            location: req.location,
            virtual_mode: req.virtual_mode,
            virtual_url: req.virtual_url,
            max_attendees: req.max_attendees,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub virtual_mode: Option<VirtualMode>,
    pub virtual_url: Option<String>,
    /// Absent leaves the ceiling alone; `null` removes it.
    #[serde(default, deserialize_with = "present")]
    pub max_attendees: Option<Option<u32>>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateEventRequest> for EventPatch {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            category: req.category,
            start_time: req.start_time,
            end_time: req.end_time,
            location: req.location,
            virtual_mode: req.virtual_mode,
            virtual_url: req.virtual_url,
            max_attendees: req.max_attendees,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateTicketCategoryRequest {
    pub name: String,
    pub ticket_type: TicketType,
    pub price: i64,
    pub quantity: u32,
}

impl From<CreateTicketCategoryRequest> for NewTicketCategoryParams {
    fn from(req: CreateTicketCategoryRequest) -> Self {
        Self {
            name: req.name,
            ticket_type: req.ticket_type,
            price: req.price,
            quantity: req.quantity,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateTicketCategoryRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub quantity: Option<u32>,
}

impl From<UpdateTicketCategoryRequest> for TicketCategoryPatch {
    fn from(req: UpdateTicketCategoryRequest) -> Self {
        Self {
            name: req.name,
            price: req.price,
            quantity: req.quantity,
        }
    }
}

#[derive(Deserialize)]
pub struct CreatePurchaseRequest {
    pub ticket_category_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub quantity: u32,
    pub payment_status: Option<PaymentStatus>,
    pub seat_numbers: Option<Vec<String>>,
}

impl From<CreatePurchaseRequest> for NewPurchaseParams {
    fn from(req: CreatePurchaseRequest) -> Self {
        Self {
            ticket_category_id: req.ticket_category_id,
            buyer_name: req.buyer_name,
            buyer_email: req.buyer_email,
            buyer_phone: req.buyer_phone,
            quantity: req.quantity,
            payment_status: req.payment_status,
            seat_numbers: req.seat_numbers,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub status: PaymentStatus,
}

// Query strings carry raw text so that `all` and mixed case are accepted.

#[derive(Deserialize, Default)]
pub struct EventListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

impl TryFrom<EventListQuery> for EventFilter {
    type Error = AppError;

    fn try_from(query: EventListQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            search: query.search,
            status: parse_selection(query.status.as_deref())?,
        })
    }
}

#[derive(Deserialize, Default)]
pub struct BuyerListQuery {
    pub search: Option<String>,
    pub ticket_type: Option<String>,
    pub payment_status: Option<String>,
}

impl TryFrom<BuyerListQuery> for BuyerFilter {
    type Error = AppError;

    fn try_from(query: BuyerListQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            search: query.search,
            ticket_type: parse_selection(query.ticket_type.as_deref())?,
            payment_status: parse_selection(query.payment_status.as_deref())?,
        })
    }
}

#[derive(Deserialize)]
pub struct RecentAttendeesQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
}

impl AnalyticsQuery {
    pub fn time_range(&self) -> Result<TimeRange, AppError> {
        match self.range.as_deref() {
            None | Some("") => Ok(TimeRange::default()),
            Some(raw) => raw.parse(),
        }
    }
}
