use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::domain::models::purchase::PaymentStatus;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("Capacity exceeded for ticket category {category_id}: requested {requested}, available {available}")]
    CapacityExceeded {
        category_id: String,
        requested: u32,
        available: u32,
    },
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Invalid payment status transition from {from} to {to}")]
    InvalidStateTransition { from: PaymentStatus, to: PaymentStatus },
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation { field, message: message.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Database(e) => {
                if let Some(db_err) = e.as_database_error() {
                    let code = db_err.code().unwrap_or_default();

                    // 2067 = SQLite Unique Constraint
                    // 23505 = PostgreSQL Unique Violation
                    if code == "2067" || code == "23505" {
                        return (
                            StatusCode::CONFLICT,
                            Json(json!({ "error": "Resource already exists (duplicate entry)" }))
                        ).into_response();
                    }
                }

                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal server error" }))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "field": field }),
            ),
            AppError::CapacityExceeded { category_id, requested, available } => {
                warn!("Sale rejected for {}: requested {}, available {}", category_id, requested, available);
                (
                    StatusCode::CONFLICT,
                    json!({
                        "error": self.to_string(),
                        "ticket_category_id": category_id,
                        "requested": requested,
                        "available": available,
                    }),
                )
            }
            AppError::Constraint(msg) => {
                error!("Constraint violation: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": self.to_string() }))
            }
            AppError::InvalidStateTransition { from, to } => (
                StatusCode::CONFLICT,
                json!({ "error": self.to_string(), "from": from, "to": to }),
            ),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}
