//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient credits for a generation.
    #[error("insufficient credits: free={free}, purchased={purchased}")]
    InsufficientCredits {
        /// Free credits remaining.
        free: i64,
        /// Purchased credits remaining.
        purchased: i64,
    },

    /// Effect already processed (idempotency).
    ///
    /// Ingress handlers translate this into a success-equivalent
    /// response before it ever reaches a caller.
    #[error("duplicate effect: {0}")]
    DuplicateEffect(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientCredits { free, purchased } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                "Out of credits - buy a credit pack or go Pro for unlimited themes".to_string(),
                Some(serde_json::json!({
                    "free_credits_remaining": free,
                    "purchased_credits": purchased,
                })),
            ),
            Self::DuplicateEffect(key) => (
                StatusCode::CONFLICT,
                "duplicate_effect",
                format!("Effect {key} already processed"),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<palette_billing_store::StoreError> for ApiError {
    fn from(err: palette_billing_store::StoreError) -> Self {
        match err {
            palette_billing_store::StoreError::NotFound => Self::NotFound("Account not found".into()),
            palette_billing_store::StoreError::InsufficientCredits { free, purchased } => {
                Self::InsufficientCredits { free, purchased }
            }
            palette_billing_store::StoreError::DuplicateEffect { key } => {
                Self::DuplicateEffect(key)
            }
            palette_billing_store::StoreError::Database(msg)
            | palette_billing_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
