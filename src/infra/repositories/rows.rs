//! Column-level row types shared by the SQLite and Postgres repositories.
//! Counts are stored as signed integers and enums as their upper-case names.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::models::{
    event::Event,
    purchase::Purchase,
    ticket_category::TicketCategory,
};
use crate::error::AppError;

#[derive(Debug, FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub virtual_mode: String,
    pub virtual_url: Option<String>,
    pub max_attendees: Option<i64>,
    pub stream_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct TicketCategoryRow {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub ticket_type: String,
    pub price: i64,
    pub quantity: i64,
    pub sold_quantity: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct PurchaseRow {
    pub id: String,
    pub event_id: String,
    pub ticket_category_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub quantity: i64,
    pub total_amount: i64,
    pub purchased_at: DateTime<Utc>,
    pub payment_status: String,
    pub seat_numbers: Option<String>,
}

fn to_u32(column: &str, value: i64) -> Result<u32, AppError> {
    u32::try_from(value).map_err(|_| {
        AppError::InternalWithMsg(format!("Column {} holds out-of-range value {}", column, value))
    })
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            start_time: row.start_time,
            end_time: row.end_time,
            location: row.location,
            virtual_mode: row.virtual_mode.parse()?,
            virtual_url: row.virtual_url,
            max_attendees: row.max_attendees.map(|v| to_u32("max_attendees", v)).transpose()?,
            stream_key: row.stream_key,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<TicketCategoryRow> for TicketCategory {
    type Error = AppError;

    fn try_from(row: TicketCategoryRow) -> Result<Self, Self::Error> {
        Ok(TicketCategory {
            id: row.id,
            event_id: row.event_id,
            name: row.name,
            ticket_type: row.ticket_type.parse()?,
            price: row.price,
            quantity: to_u32("quantity", row.quantity)?,
            sold_quantity: to_u32("sold_quantity", row.sold_quantity)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = AppError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        let seat_numbers = row
            .seat_numbers
            .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
            .transpose()
            .map_err(|e| AppError::InternalWithMsg(format!("Bad seat_numbers on purchase {}: {}", row.id, e)))?;

        Ok(Purchase {
            id: row.id,
            event_id: row.event_id,
            ticket_category_id: row.ticket_category_id,
            buyer_name: row.buyer_name,
            buyer_email: row.buyer_email,
            buyer_phone: row.buyer_phone,
            quantity: to_u32("quantity", row.quantity)?,
            total_amount: row.total_amount,
            purchased_at: row.purchased_at,
            payment_status: row.payment_status.parse()?,
            seat_numbers,
        })
    }
}

/// Seat labels are kept as a JSON array in a text column.
pub fn encode_seats(purchase: &Purchase) -> Result<Option<String>, AppError> {
    purchase
        .seat_numbers
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| AppError::InternalWithMsg(e.to_string()))
}

/// Converts a `SUM(quantity)` result, which is never negative, into a ticket count.
pub fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

pub fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}
