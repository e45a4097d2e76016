use axum::{
    body::Body,
    extract::Request,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{analytics, category, event, health, purchase};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Events
        .route("/api/v1/events", get(event::list_events).post(event::create_event))
        .route("/api/v1/events/{event_id}", get(event::get_event).put(event::update_event))
        .route("/api/v1/events/{event_id}/streaming", get(event::get_streaming_settings))

        // Ticket categories
        .route("/api/v1/events/{event_id}/categories", get(category::list_categories).post(category::create_category))
        .route("/api/v1/categories/{category_id}", put(category::update_category))

        // Purchases
        .route("/api/v1/events/{event_id}/purchases", get(purchase::list_purchases).post(purchase::create_purchase))
        .route("/api/v1/events/{event_id}/purchases/export", get(purchase::export_purchases))
        .route("/api/v1/events/{event_id}/attendees/recent", get(purchase::recent_attendees))
        .route("/api/v1/purchases/{purchase_id}/refund", post(purchase::refund_purchase))
        .route("/api/v1/purchases/{purchase_id}/status", put(purchase::update_payment_status))

        // Metrics & analytics
        .route("/api/v1/events/{event_id}/metrics", get(analytics::event_metrics))
        .route("/api/v1/metrics", get(analytics::global_metrics))
        .route("/api/v1/analytics", get(analytics::analytics))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
