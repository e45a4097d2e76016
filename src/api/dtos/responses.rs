use serde::Serialize;

use crate::domain::models::{purchase::Purchase, ticket_category::TicketCategory};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Category plus the inventory figures the dashboard shows next to it.
#[derive(Serialize)]
pub struct TicketCategoryResponse {
    #[serde(flatten)]
    pub category: TicketCategory,
    pub available: u32,
    pub sold_percentage: f64,
    pub revenue: i64,
    pub sold_out: bool,
}

impl From<TicketCategory> for TicketCategoryResponse {
    fn from(category: TicketCategory) -> Self {
        Self {
            available: category.available(),
            sold_percentage: category.sold_percentage(),
            revenue: category.revenue(),
            sold_out: category.is_sold_out(),
            category,
        }
    }
}

#[derive(Serialize)]
pub struct PurchaseCreatedResponse {
    pub purchase: Purchase,
    pub ticket_category: TicketCategoryResponse,
}
