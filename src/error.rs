use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::delivery::DeliveryStatus;

/// Business-rule violations are ordinary `Err` values, not panics. Only
/// `Internal` represents an infrastructure fault.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("driver already bid on this delivery")]
    DuplicateBid,

    #[error("status {current:?} does not permit this action")]
    StatusConflict { current: DeliveryStatus },

    #[error("delivery is no longer eligible for assignment")]
    AssignmentConflict,

    #[error("actor is not permitted to perform this action")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DuplicateBid => (StatusCode::CONFLICT, self.to_string()),
            AppError::StatusConflict { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::AssignmentConflict => (StatusCode::CONFLICT, self.to_string()),
            AppError::Unauthorized => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
