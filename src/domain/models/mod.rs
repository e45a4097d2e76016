pub mod event;
pub mod purchase;
pub mod ticket_category;
