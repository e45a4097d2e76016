use std::sync::Arc;
use crate::config::Config;
use crate::domain::services::dashboard::DashboardService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dashboard: Arc<DashboardService>,
}
