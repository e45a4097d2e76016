use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::models::ticket_category::{TicketCategory, TicketType};
use crate::error::AppError;

/// Payment state supplied by the external payment provider.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[serde(alias = "paid")]
    Paid,
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "failed")]
    Failed,
    #[serde(alias = "refunded")]
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Paid,
        PaymentStatus::Pending,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    /// Lowercase label used by the dashboard and the CSV export.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PAID" => Ok(PaymentStatus::Paid),
            "PENDING" => Ok(PaymentStatus::Pending),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(AppError::validation("payment_status", format!("Unknown payment status '{}'", other))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Purchase {
    pub id: String,
    pub event_id: String,
    pub ticket_category_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub quantity: u32,
    pub total_amount: i64,
    pub purchased_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub seat_numbers: Option<Vec<String>>,
}

pub struct NewPurchaseParams {
    pub ticket_category_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub quantity: u32,
    pub payment_status: Option<PaymentStatus>,
    pub seat_numbers: Option<Vec<String>>,
}

impl Purchase {
    /// Builds a purchase against `category`, locking its current price into `total_amount`.
    pub fn new(params: NewPurchaseParams, category: &TicketCategory, now: DateTime<Utc>) -> Result<Self, AppError> {
        let buyer_name = params.buyer_name.trim().to_string();
        let buyer_email = params.buyer_email.trim().to_string();

        if buyer_name.is_empty() {
            return Err(AppError::validation("buyer_name", "Buyer name is required"));
        }
        if buyer_email.is_empty() {
            return Err(AppError::validation("buyer_email", "Buyer email is required"));
        }
        if params.quantity == 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }
        if params.ticket_category_id != category.id {
            return Err(AppError::validation("ticket_category_id", "Purchase does not match ticket category"));
        }

        let payment_status = match params.payment_status {
            None | Some(PaymentStatus::Pending) => PaymentStatus::Pending,
            Some(PaymentStatus::Paid) => PaymentStatus::Paid,
            Some(other @ (PaymentStatus::Failed | PaymentStatus::Refunded)) => {
                return Err(AppError::validation(
                    "payment_status",
                    format!("A new purchase cannot start as {}", other),
                ));
            }
        };

        let total_amount = category.price
            .checked_mul(i64::from(params.quantity))
            .ok_or_else(|| AppError::validation("quantity", "Order total is out of range"))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            event_id: category.event_id.clone(),
            ticket_category_id: category.id.clone(),
            buyer_name,
            buyer_email,
            buyer_phone: params.buyer_phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            quantity: params.quantity,
            total_amount,
            purchased_at: now,
            payment_status,
            seat_numbers: params.seat_numbers,
        })
    }

    /// Seat labels are optional, but when present there should be one per ticket.
    pub fn seat_count_matches(&self) -> bool {
        self.seat_numbers
            .as_ref()
            .is_none_or(|seats| seats.len() == self.quantity as usize)
    }
}

/// A purchase joined with the name and type of the category it was bought from.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Buyer {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub ticket_type: TicketType,
    pub ticket_category: String,
}

impl Buyer {
    pub fn new(purchase: Purchase, category: &TicketCategory) -> Self {
        Self {
            purchase,
            ticket_type: category.ticket_type,
            ticket_category: category.name.clone(),
        }
    }
}
