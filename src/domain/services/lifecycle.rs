use chrono::{DateTime, Utc};
use crate::domain::models::event::{Event, EventStatus};
use crate::domain::models::purchase::{PaymentStatus, Purchase};
use crate::error::AppError;

/// Both schedule bounds are inclusive: an event is live at its start and at its end.
pub fn compute_status(event: &Event, now: DateTime<Utc>) -> EventStatus {
    if now < event.start_time {
        EventStatus::Upcoming
    } else if now <= event.end_time {
        EventStatus::Live
    } else {
        EventStatus::Ended
    }
}

pub fn validate_transition(from: PaymentStatus, to: PaymentStatus) -> Result<(), AppError> {
    use PaymentStatus::*;

    match (from, to) {
        (Pending, Paid) | (Pending, Failed) | (Paid, Refunded) => Ok(()),
        (Paid | Pending | Failed | Refunded, _) => Err(AppError::InvalidStateTransition { from, to }),
    }
}

pub fn transition(purchase: &Purchase, to: PaymentStatus) -> Result<Purchase, AppError> {
    validate_transition(purchase.payment_status, to)?;
    let mut updated = purchase.clone();
    updated.payment_status = to;
    Ok(updated)
}

/// Marks a paid purchase refunded. Inventory is deliberately left as sold.
pub fn refund(purchase: &Purchase) -> Result<Purchase, AppError> {
    transition(purchase, PaymentStatus::Refunded)
}
