use chrono::{DateTime, Utc};
use std::str::FromStr;
use crate::domain::models::event::{Event, EventStatus};
use crate::domain::models::purchase::{Buyer, PaymentStatus};
use crate::domain::models::ticket_category::TicketType;
use crate::domain::services::lifecycle::compute_status;
use crate::error::AppError;

/// Sentinel the dashboard sends for "no filter on this dimension".
pub const ALL: &str = "all";

#[derive(Debug, Default, Clone)]
pub struct BuyerFilter {
    pub search: Option<String>,
    pub ticket_type: Option<TicketType>,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub search: Option<String>,
    pub status: Option<EventStatus>,
}

/// Parses an optional filter value where missing, blank and `all` all mean "any".
pub fn parse_selection<T>(raw: Option<&str>) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = AppError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case(ALL) => Ok(None),
        Some(v) => v.parse().map(Some),
    }
}

fn normalized_search(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

/// Case-insensitive name/email search combined with exact type and status filters.
/// Preserves input order.
pub fn filter_buyers(buyers: &[Buyer], filter: &BuyerFilter) -> Vec<Buyer> {
    let needle = normalized_search(&filter.search);

    buyers
        .iter()
        .filter(|buyer| match &needle {
            Some(n) => {
                buyer.purchase.buyer_name.to_lowercase().contains(n)
                    || buyer.purchase.buyer_email.to_lowercase().contains(n)
            }
            None => true,
        })
        .filter(|buyer| filter.ticket_type.is_none_or(|t| buyer.ticket_type == t))
        .filter(|buyer| filter.payment_status.is_none_or(|s| buyer.purchase.payment_status == s))
        .cloned()
        .collect()
}

pub fn filter_events(events: &[Event], filter: &EventFilter, now: DateTime<Utc>) -> Vec<Event> {
    let needle = normalized_search(&filter.search);

    events
        .iter()
        .filter(|event| match &needle {
            Some(n) => event.title.to_lowercase().contains(n) || event.category.to_lowercase().contains(n),
            None => true,
        })
        .filter(|event| filter.status.is_none_or(|s| compute_status(event, now) == s))
        .cloned()
        .collect()
}

/// Newest purchases first, capped at `limit`.
pub fn recent_buyers(buyers: &[Buyer], limit: usize) -> Vec<Buyer> {
    let mut sorted = buyers.to_vec();
    sorted.sort_by(|a, b| b.purchase.purchased_at.cmp(&a.purchase.purchased_at));
    sorted.truncate(limit);
    sorted
}
