use eventpro_backend::{
    api::router::create_router,
    config::Config,
    domain::models::{
        event::{Event, NewEventParams, VirtualMode},
        purchase::{NewPurchaseParams, PaymentStatus},
        ticket_category::{NewTicketCategoryParams, TicketCategory, TicketType},
    },
    domain::services::dashboard::DashboardService,
    infra::clock::FixedClock,
    infra::factory::{connect_sqlite, memory_dashboard, run_sqlite_migrations, sqlite_dashboard},
    state::AppState,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// 2024-02-20 12:00 UTC, the instant every test clock starts at.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 20, 12, 0, 0).unwrap()
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub clock: Arc<FixedClock>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let pool = connect_sqlite(&db_url).await.expect("Failed to connect to test db");
        run_sqlite_migrations(&pool).await.expect("Failed to migrate test db");

        let clock = Arc::new(FixedClock::new(test_now()));
        let config = Config {
            database_url: db_url,
            port: 0,
            log_dir: "./logs".to_string(),
        };

        let state = Arc::new(AppState {
            config,
            dashboard: Arc::new(sqlite_dashboard(pool.clone(), clock.clone())),
        });
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            clock,
        }
    }

    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    pub async fn json(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(method, uri, body).await;
        let status = response.status();
        (status, parse_body(response).await)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

#[allow(dead_code)]
pub async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// Service over the in-memory store with its own controllable clock.
#[allow(dead_code)]
pub fn memory_service() -> (DashboardService, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(test_now()));
    (memory_dashboard(clock.clone()), clock)
}

#[allow(dead_code)]
pub fn in_person_event(title: &str, max_attendees: Option<u32>) -> NewEventParams {
    NewEventParams {
        title: title.to_string(),
        description: "Annual gathering".to_string(),
        category: "Technology".to_string(),
        start_time: test_now() + Duration::days(24),
        end_time: test_now() + Duration::days(24) + Duration::hours(8),
        location: Some("San Francisco Convention Center".to_string()),
        virtual_mode: VirtualMode::None,
        virtual_url: None,
        max_attendees,
    }
}

#[allow(dead_code)]
pub fn category_params(name: &str, ticket_type: TicketType, price: i64, quantity: u32) -> NewTicketCategoryParams {
    NewTicketCategoryParams {
        name: name.to_string(),
        ticket_type,
        price,
        quantity,
    }
}

#[allow(dead_code)]
pub fn purchase_params(category_id: &str, name: &str, quantity: u32, status: Option<PaymentStatus>) -> NewPurchaseParams {
    NewPurchaseParams {
        ticket_category_id: category_id.to_string(),
        buyer_name: name.to_string(),
        buyer_email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        buyer_phone: None,
        quantity,
        payment_status: status,
        seat_numbers: None,
    }
}

/// One event with a single category of `quantity` tickets at `price`.
#[allow(dead_code)]
pub async fn seed_event_with_category(
    service: &DashboardService,
    quantity: u32,
    price: i64,
) -> (Event, TicketCategory) {
    let event = service
        .create_event(in_person_event("Tech Conference 2024", Some(500)))
        .await
        .unwrap();
    let category = service
        .create_ticket_category(&event.id, category_params("Early Bird", TicketType::Normal, price, quantity))
        .await
        .unwrap();
    (event, category)
}
