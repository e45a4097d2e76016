use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use crate::domain::models::event::{Event, EventStatus};
use crate::domain::models::purchase::{PaymentStatus, Purchase};
use crate::domain::models::ticket_category::{TicketCategory, TicketType};
use crate::domain::services::inventory::aggregate_across_categories;
use crate::domain::services::lifecycle::compute_status;
use crate::error::AppError;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TimeSeriesPoint<K> {
    pub period: K,
    pub sales_count: u64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeRevenue {
    pub revenue: i64,
    pub count: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BreakdownEntry {
    pub label: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuyerSummary {
    pub total_buyers: u64,
    pub total_tickets: u64,
    pub total_revenue: i64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total_events: u64,
    pub active_events: u64,
    pub total_attendees: u64,
    pub total_revenue: i64,
}

/// Card view of an event: schedule-derived status plus inventory totals.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    pub status: EventStatus,
    pub tickets_sold: u64,
    pub total_tickets: u64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct PeriodComparison {
    pub revenue: i64,
    pub previous_revenue: i64,
    pub revenue_growth: f64,
    pub tickets_sold: u64,
    pub previous_tickets_sold: u64,
    pub ticket_growth: f64,
    pub average_ticket_price: f64,
    pub previous_average_ticket_price: f64,
    pub price_growth: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Last7Days,
    #[default]
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
}

impl TimeRange {
    pub fn duration(&self) -> Duration {
        match self {
            TimeRange::Last7Days => Duration::days(7),
            TimeRange::Last30Days => Duration::days(30),
            TimeRange::Last90Days => Duration::days(90),
        }
    }

    /// Short ranges chart per day, longer ones per week.
    pub fn bucket(&self) -> fn(DateTime<Utc>) -> NaiveDate {
        match self {
            TimeRange::Last7Days => daily_bucket,
            TimeRange::Last30Days | TimeRange::Last90Days => weekly_bucket,
        }
    }
}

impl FromStr for TimeRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" => Ok(TimeRange::Last7Days),
            "30d" => Ok(TimeRange::Last30Days),
            "90d" => Ok(TimeRange::Last90Days),
            other => Err(AppError::validation("range", format!("Unknown time range '{}'", other))),
        }
    }
}

pub fn daily_bucket(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Buckets by the Monday that starts the ISO week.
pub fn weekly_bucket(at: DateTime<Utc>) -> NaiveDate {
    let date = at.date_naive();
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Sums ticket quantity and locked purchase amounts per bucket, in bucket order.
/// Periods without purchases are not emitted.
pub fn aggregate_time_series<K, F>(purchases: &[Purchase], bucket: F) -> Vec<TimeSeriesPoint<K>>
where
    K: Ord,
    F: Fn(DateTime<Utc>) -> K,
{
    let mut buckets: BTreeMap<K, (u64, i64)> = BTreeMap::new();
    for purchase in purchases {
        let entry = buckets.entry(bucket(purchase.purchased_at)).or_default();
        entry.0 += u64::from(purchase.quantity);
        entry.1 = entry.1.saturating_add(purchase.total_amount);
    }

    buckets
        .into_iter()
        .map(|(period, (sales_count, revenue))| TimeSeriesPoint { period, sales_count, revenue })
        .collect()
}

pub fn revenue_by_category_type(categories: &[TicketCategory]) -> BTreeMap<TicketType, TypeRevenue> {
    let mut totals: BTreeMap<TicketType, TypeRevenue> = BTreeMap::new();
    for category in categories {
        let entry = totals.entry(category.ticket_type).or_default();
        entry.revenue = entry.revenue.saturating_add(category.revenue());
        entry.count += u64::from(category.sold_quantity);
    }
    totals
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of each bucket in the total, rounded to one decimal. A zero total yields 0% everywhere.
pub fn breakdown<L, I>(buckets: I) -> Vec<BreakdownEntry>
where
    L: Into<String>,
    I: IntoIterator<Item = (L, u64)>,
{
    let entries: Vec<(String, u64)> = buckets.into_iter().map(|(l, c)| (l.into(), c)).collect();
    let total: u64 = entries.iter().map(|(_, c)| c).sum();

    entries
        .into_iter()
        .map(|(label, count)| {
            let percentage = if total == 0 {
                0.0
            } else {
                round_one_decimal(count as f64 / total as f64 * 100.0)
            };
            BreakdownEntry { label, count, percentage }
        })
        .collect()
}

/// Ticket counts per ticket type from sold inventory.
pub fn sales_mix(categories: &[TicketCategory]) -> Vec<BreakdownEntry> {
    let by_type = revenue_by_category_type(categories);
    breakdown(
        TicketType::ALL
            .iter()
            .map(|t| (t.as_str(), by_type.get(t).map_or(0, |r| r.count))),
    )
}

/// Number of purchases in each payment state.
pub fn payment_status_breakdown(purchases: &[Purchase]) -> Vec<BreakdownEntry> {
    breakdown(PaymentStatus::ALL.iter().map(|status| {
        let count = purchases.iter().filter(|p| p.payment_status == *status).count() as u64;
        (status.label(), count)
    }))
}

pub fn buyer_summary<'a, I>(purchases: I) -> BuyerSummary
where
    I: IntoIterator<Item = &'a Purchase>,
{
    purchases.into_iter().fold(BuyerSummary::default(), |mut acc, p| {
        acc.total_buyers += 1;
        acc.total_tickets += u64::from(p.quantity);
        acc.total_revenue = acc.total_revenue.saturating_add(p.total_amount);
        acc
    })
}

pub fn event_summary(event: &Event, categories: &[TicketCategory], now: DateTime<Utc>) -> EventSummary {
    let owned: Vec<TicketCategory> = categories.iter().filter(|c| c.event_id == event.id).cloned().collect();
    let totals = aggregate_across_categories(&owned);

    EventSummary {
        event: event.clone(),
        status: compute_status(event, now),
        tickets_sold: totals.total_sold,
        total_tickets: totals.total_capacity,
        revenue: totals.total_revenue,
    }
}

pub fn dashboard_stats(events: &[Event], categories: &[TicketCategory], now: DateTime<Utc>) -> DashboardStats {
    let totals = aggregate_across_categories(categories);
    let active_events = events
        .iter()
        .filter(|e| compute_status(e, now) == EventStatus::Live)
        .count() as u64;

    DashboardStats {
        total_events: events.len() as u64,
        active_events,
        total_attendees: totals.total_sold,
        total_revenue: totals.total_revenue,
    }
}

pub fn average_ticket_price(revenue: i64, tickets: u64) -> f64 {
    if tickets == 0 {
        return 0.0;
    }
    revenue as f64 / tickets as f64
}

/// Percentage change from `previous` to `current`, rounded to one decimal. No baseline means 0%.
pub fn growth_percentage(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    round_one_decimal((current - previous) / previous * 100.0)
}

/// Compares paid sales in `[now - range, now]` with the window of equal length before it.
pub fn compare_periods(purchases: &[Purchase], range: TimeRange, now: DateTime<Utc>) -> PeriodComparison {
    let window = range.duration();
    let current_start = now - window;
    let previous_start = current_start - window;

    let paid = purchases.iter().filter(|p| p.payment_status == PaymentStatus::Paid);
    let current = buyer_summary(paid.clone().filter(|p| p.purchased_at > current_start && p.purchased_at <= now));
    let previous = buyer_summary(paid.filter(|p| p.purchased_at > previous_start && p.purchased_at <= current_start));

    let average = average_ticket_price(current.total_revenue, current.total_tickets);
    let previous_average = average_ticket_price(previous.total_revenue, previous.total_tickets);

    PeriodComparison {
        revenue: current.total_revenue,
        previous_revenue: previous.total_revenue,
        revenue_growth: growth_percentage(current.total_revenue as f64, previous.total_revenue as f64),
        tickets_sold: current.total_tickets,
        previous_tickets_sold: previous.total_tickets,
        ticket_growth: growth_percentage(current.total_tickets as f64, previous.total_tickets as f64),
        average_ticket_price: round_cents(average),
        previous_average_ticket_price: round_cents(previous_average),
        price_growth: growth_percentage(average, previous_average),
    }
}
