//! Error types for the HTTP API.
//!
//! Every failure leaves the server as `{"error": "<message>"}` with a status
//! picked from the error's kind:
//!
//! ```text
//! AccessError::Unauthenticated, bad token      → 401
//! AccessError::Forbidden                       → 403
//! *NotFound                                    → 404
//! Validation, EmptyOrder, InsufficientPayment  → 400
//! UniqueViolation, Conflict                    → 409
//! InvalidTransition, InsufficientStock         → 422
//! anything else                                → 500 (logged, message hidden)
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use bistro_core::{AccessError, CoreError, ValidationError};
use bistro_db::DbError;

/// An HTTP error response.
#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

/// Convenience type alias for handler results.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, message)
    }

    /// A 500 whose detail goes to the log, not the client.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        let status = match err {
            AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden { .. } => StatusCode::FORBIDDEN,
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::Access(access) => return access.clone().into(),
            CoreError::ProductNotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::CustomerNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::EmptyOrder
            | CoreError::OrderTooLarge { .. }
            | CoreError::InsufficientPayment { .. }
            | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::InvalidTransition { .. } | CoreError::InsufficientStock { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DbError::UniqueViolation { .. } | DbError::Conflict(_) | DbError::Busy => {
                ApiError::new(StatusCode::CONFLICT, err.to_string())
            }
            DbError::ForeignKeyViolation { .. } => ApiError::bad_request(err.to_string()),
            other => ApiError::internal(other),
        }
    }
}
