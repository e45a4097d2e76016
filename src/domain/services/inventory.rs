use serde::Serialize;
use crate::domain::models::event::Event;
use crate::domain::models::ticket_category::{TicketCategory, TicketCategoryPatch};
use crate::error::AppError;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct InventoryTotals {
    pub total_sold: u64,
    pub total_capacity: u64,
    pub total_revenue: i64,
}

/// The single capacity check for ticket sales. Returns the category with the sale
/// applied; on failure the input is left as it was.
pub fn record_sale(category: &TicketCategory, quantity: u32) -> Result<TicketCategory, AppError> {
    if quantity == 0 {
        return Err(AppError::validation("quantity", "Quantity must be positive"));
    }

    let available = category.available();
    if quantity > available {
        return Err(AppError::CapacityExceeded {
            category_id: category.id.clone(),
            requested: quantity,
            available,
        });
    }

    let mut updated = category.clone();
    updated.sold_quantity += quantity;
    Ok(updated)
}

pub fn aggregate_across_categories(categories: &[TicketCategory]) -> InventoryTotals {
    categories.iter().fold(InventoryTotals::default(), |mut acc, category| {
        acc.total_sold += u64::from(category.sold_quantity);
        acc.total_capacity += u64::from(category.quantity);
        acc.total_revenue = acc.total_revenue.saturating_add(category.revenue());
        acc
    })
}

/// Seats left under the event ceiling, or `None` for events without one.
pub fn capacity_remaining(event: &Event, categories: &[TicketCategory]) -> Result<Option<u32>, AppError> {
    let Some(max_attendees) = event.max_attendees else {
        return Ok(None);
    };

    let sold: u64 = categories
        .iter()
        .filter(|c| c.event_id == event.id)
        .map(|c| u64::from(c.sold_quantity))
        .sum();

    let remaining = i64::from(max_attendees) - sold as i64;
    if remaining < 0 {
        return Err(AppError::Constraint(format!(
            "Event {} has sold {} tickets against a capacity of {}",
            event.id, sold, max_attendees
        )));
    }
    Ok(Some(remaining as u32))
}

/// Tickets already allocated to the event's categories, leaving out `replacing`.
pub fn allocated_quantity(event_id: &str, categories: &[TicketCategory], replacing: Option<&str>) -> u64 {
    categories
        .iter()
        .filter(|c| c.event_id == event_id && Some(c.id.as_str()) != replacing)
        .map(|c| u64::from(c.quantity))
        .sum()
}

pub fn allocation_error(max_attendees: u64, allocated: u64) -> AppError {
    AppError::validation(
        "quantity",
        format!(
            "Only {} of {} seats are left to allocate",
            max_attendees.saturating_sub(allocated),
            max_attendees
        ),
    )
}

pub fn ceiling_below_allocation_error(allocated: u64) -> AppError {
    AppError::validation(
        "max_attendees",
        format!("{} tickets are already allocated to categories", allocated),
    )
}

/// Checks that allocating `quantity` more tickets keeps the event within `max_attendees`.
/// `replacing` names a category whose current allocation is being resized.
pub fn ensure_allocation_fits(
    event: &Event,
    categories: &[TicketCategory],
    quantity: u32,
    replacing: Option<&str>,
) -> Result<(), AppError> {
    let Some(max_attendees) = event.max_attendees else {
        return Ok(());
    };

    let allocated = allocated_quantity(&event.id, categories, replacing);
    if allocated + u64::from(quantity) > u64::from(max_attendees) {
        return Err(allocation_error(u64::from(max_attendees), allocated));
    }
    Ok(())
}

/// Checks that the event's ceiling still covers every ticket allocated to its categories.
pub fn ensure_ceiling_covers_allocation(event: &Event, categories: &[TicketCategory]) -> Result<(), AppError> {
    let Some(max_attendees) = event.max_attendees else {
        return Ok(());
    };

    let allocated = allocated_quantity(&event.id, categories, None);
    if allocated > u64::from(max_attendees) {
        return Err(ceiling_below_allocation_error(allocated));
    }
    Ok(())
}

pub fn apply_category_patch(category: &TicketCategory, patch: TicketCategoryPatch) -> Result<TicketCategory, AppError> {
    let mut updated = category.clone();
    if let Some(name) = patch.name { updated.name = name.trim().to_string(); }
    if let Some(price) = patch.price { updated.price = price; }
    if let Some(quantity) = patch.quantity { updated.quantity = quantity; }
    updated.validate()?;
    Ok(updated)
}
