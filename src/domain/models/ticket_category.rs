use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketType {
    #[serde(alias = "normal")]
    Normal,
    #[serde(alias = "vip")]
    Vip,
    #[serde(alias = "vr")]
    Vr,
}

impl TicketType {
    pub const ALL: [TicketType; 3] = [TicketType::Normal, TicketType::Vip, TicketType::Vr];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Normal => "NORMAL",
            TicketType::Vip => "VIP",
            TicketType::Vr => "VR",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(TicketType::Normal),
            "VIP" => Ok(TicketType::Vip),
            "VR" => Ok(TicketType::Vr),
            other => Err(AppError::validation("ticket_type", format!("Unknown ticket type '{}'", other))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TicketCategory {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub ticket_type: TicketType,
    pub price: i64,
    pub quantity: u32,
    pub sold_quantity: u32,
    pub created_at: DateTime<Utc>,
}

pub struct NewTicketCategoryParams {
    pub name: String,
    pub ticket_type: TicketType,
    pub price: i64,
    pub quantity: u32,
}

#[derive(Debug, Default, Clone)]
pub struct TicketCategoryPatch {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub quantity: Option<u32>,
}

impl TicketCategory {
    pub fn new(event_id: String, params: NewTicketCategoryParams, now: DateTime<Utc>) -> Result<Self, AppError> {
        let category = Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            name: params.name.trim().to_string(),
            ticket_type: params.ticket_type,
            price: params.price,
            quantity: params.quantity,
            sold_quantity: 0,
            created_at: now,
        };
        category.validate()?;
        Ok(category)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.is_empty() {
            return Err(AppError::validation("name", "Category name is required"));
        }
        if self.price < 0 {
            return Err(AppError::validation("price", "Price cannot be negative"));
        }
        if self.quantity == 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }
        // Selling out the whole category must still produce a representable revenue.
        if self.price.checked_mul(i64::from(self.quantity)).is_none() {
            return Err(AppError::validation("price", "Price times quantity is out of range"));
        }
        if self.sold_quantity > self.quantity {
            return Err(AppError::validation(
                "quantity",
                format!("Quantity cannot drop below the {} tickets already sold", self.sold_quantity),
            ));
        }
        Ok(())
    }

    pub fn available(&self) -> u32 {
        self.quantity.saturating_sub(self.sold_quantity)
    }

    pub fn revenue(&self) -> i64 {
        self.price.saturating_mul(i64::from(self.sold_quantity))
    }

    /// Zero-quantity categories report 0% instead of dividing by zero.
    pub fn sold_percentage(&self) -> f64 {
        if self.quantity == 0 {
            return 0.0;
        }
        f64::from(self.sold_quantity) / f64::from(self.quantity) * 100.0
    }

    pub fn is_sold_out(&self) -> bool {
        self.available() == 0
    }
}
