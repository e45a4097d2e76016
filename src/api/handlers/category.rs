use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::{
    requests::{CreateTicketCategoryRequest, UpdateTicketCategoryRequest},
    responses::TicketCategoryResponse,
};
use crate::error::AppError;
use std::sync::Arc;

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let categories: Vec<TicketCategoryResponse> = state
        .dashboard
        .list_categories(&event_id)
        .await?
        .into_iter()
        .map(TicketCategoryResponse::from)
        .collect();
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(payload): Json<CreateTicketCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.dashboard.create_ticket_category(&event_id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(TicketCategoryResponse::from(category))))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
    Json(payload): Json<UpdateTicketCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.dashboard.update_ticket_category(&category_id, payload.into()).await?;
    Ok(Json(TicketCategoryResponse::from(category)))
}
