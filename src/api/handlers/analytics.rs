use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::AnalyticsQuery;
use crate::domain::services::dashboard::Scope;
use crate::error::AppError;
use std::sync::Arc;

pub async fn event_metrics(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let metrics = state.dashboard.get_aggregate_metrics(Scope::Event(event_id)).await?;
    Ok(Json(metrics))
}

pub async fn global_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let metrics = state.dashboard.get_aggregate_metrics(Scope::Global).await?;
    Ok(Json(metrics))
}

pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = query.time_range()?;
    let analytics = state.dashboard.get_analytics(range).await?;
    Ok(Json(analytics))
}
