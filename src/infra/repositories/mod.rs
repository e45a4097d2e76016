pub mod memory;
pub mod rows;

pub mod sqlite_event_repo;
pub mod sqlite_purchase_repo;
pub mod sqlite_ticket_category_repo;

pub mod postgres_event_repo;
pub mod postgres_purchase_repo;
pub mod postgres_ticket_category_repo;
