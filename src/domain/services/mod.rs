pub mod analytics;
pub mod dashboard;
pub mod export;
pub mod inventory;
pub mod lifecycle;
pub mod query;
pub mod streaming;
