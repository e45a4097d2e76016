use axum::{
    extract::{State, Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use crate::state::AppState;
use crate::api::dtos::{
    requests::{BuyerListQuery, CreatePurchaseRequest, RecentAttendeesQuery, UpdatePaymentStatusRequest, DEFAULT_RECENT_LIMIT},
    responses::PurchaseCreatedResponse,
};
use crate::domain::services::query::BuyerFilter;
use crate::error::AppError;
use std::sync::Arc;

pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(payload): Json<CreatePurchaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (purchase, category) = state.dashboard.record_purchase(&event_id, payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(PurchaseCreatedResponse { purchase, ticket_category: category.into() }),
    ))
}

pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(query): Query<BuyerListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = BuyerFilter::try_from(query)?;
    let buyers = state.dashboard.list_purchases(&event_id, &filter).await?;
    Ok(Json(buyers))
}

pub async fn export_purchases(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(query): Query<BuyerListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = BuyerFilter::try_from(query)?;
    let export = state.dashboard.export_buyers_csv(&event_id, &filter).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", export.file_name)),
        ],
        export.csv,
    ))
}

pub async fn recent_attendees(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(query): Query<RecentAttendeesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let buyers = state.dashboard.recent_attendees(&event_id, limit).await?;
    Ok(Json(buyers))
}

pub async fn refund_purchase(
    State(state): State<Arc<AppState>>,
    Path(purchase_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let purchase = state.dashboard.refund_purchase(&purchase_id).await?;
    Ok(Json(purchase))
}

pub async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    Path(purchase_id): Path<String>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let purchase = state.dashboard.update_payment_status(&purchase_id, payload.status).await?;
    Ok(Json(purchase))
}
