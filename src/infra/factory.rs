use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::ports::Clock;
use crate::domain::services::dashboard::DashboardService;
use crate::error::AppError;
use crate::infra::clock::SystemClock;
use crate::infra::repositories::{
    memory::InMemoryStore,
    postgres_event_repo::PostgresEventRepo, postgres_purchase_repo::PostgresPurchaseRepo,
    postgres_ticket_category_repo::PostgresTicketCategoryRepo,
    sqlite_event_repo::SqliteEventRepo, sqlite_purchase_repo::SqlitePurchaseRepo,
    sqlite_ticket_category_repo::SqliteTicketCategoryRepo,
};
use crate::state::AppState;

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    build_state(config, Arc::new(SystemClock)).await
}

/// Picks the persistence provider from `DATABASE_URL`: `memory://`, `postgres://` or SQLite.
pub async fn build_state(config: &Config, clock: Arc<dyn Clock>) -> Result<AppState, AppError> {
    let database_url = &config.database_url;

    let dashboard = if config.uses_memory_store() {
        info!("Using in-memory store; data is lost on restart");
        memory_dashboard(clock)
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().map_err(AppError::Database)?;
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .map_err(AppError::Database)?;

        run_postgres_migrations(&pool).await?;
        postgres_dashboard(pool, clock)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");
        let pool = connect_sqlite(database_url).await?;
        run_sqlite_migrations(&pool).await?;
        sqlite_dashboard(pool, clock)
    };

    Ok(AppState {
        config: config.clone(),
        dashboard: Arc::new(dashboard),
    })
}

pub async fn connect_sqlite(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)
        .map_err(AppError::Database)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .map_err(AppError::Database)
}

pub fn memory_dashboard(clock: Arc<dyn Clock>) -> DashboardService {
    let store = Arc::new(InMemoryStore::new());
    DashboardService::new(store.clone(), store.clone(), store, clock)
}

pub fn sqlite_dashboard(pool: SqlitePool, clock: Arc<dyn Clock>) -> DashboardService {
    DashboardService::new(
        Arc::new(SqliteEventRepo::new(pool.clone())),
        Arc::new(SqliteTicketCategoryRepo::new(pool.clone())),
        Arc::new(SqlitePurchaseRepo::new(pool)),
        clock,
    )
}

pub fn postgres_dashboard(pool: PgPool, clock: Arc<dyn Clock>) -> DashboardService {
    DashboardService::new(
        Arc::new(PostgresEventRepo::new(pool.clone())),
        Arc::new(PostgresTicketCategoryRepo::new(pool.clone())),
        Arc::new(PostgresPurchaseRepo::new(pool)),
        clock,
    )
}

async fn run_postgres_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run Postgres migrations: {}", e)))
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run SQLite migrations: {}", e)))
}
