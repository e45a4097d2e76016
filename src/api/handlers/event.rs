use axum::{extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{CreateEventRequest, EventListQuery, UpdateEventRequest};
use crate::domain::services::query::EventFilter;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("Creating event: {}", payload.title);
    let created = state.dashboard.create_event(payload.into()).await?;
    let summary = state.dashboard.get_event(&created.id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = EventFilter::try_from(query)?;
    let events = state.dashboard.list_events(&filter).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.dashboard.get_event(&event_id).await?;
    Ok(Json(event))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.dashboard.update_event(&event_id, payload.into()).await?;
    let summary = state.dashboard.get_event(&event_id).await?;
    Ok(Json(summary))
}

pub async fn get_streaming_settings(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.dashboard.streaming_settings(&event_id).await?;
    Ok(Json(settings))
}
