//! Error types for the task API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::service::ServiceError;
use crate::session::SessionError;

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Task API errors
#[derive(Debug, Error)]
pub enum ApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Task does not exist
    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    /// Request body failed validation
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] SessionError),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::TaskNotFound(id) => ApiError::TaskNotFound(id),
            ServiceError::Backend(err) => ApiError::Storage(err),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Storage details stay in the log; clients get a generic message.
        let message = match &self {
            ApiError::Storage(err) => {
                error!(%err, "request failed on storage");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });
        (status, body).into_response()
    }
}
