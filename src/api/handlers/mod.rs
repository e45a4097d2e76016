pub mod analytics;
pub mod category;
pub mod event;
pub mod health;
pub mod purchase;
