//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps credential-operation failures and validation errors to HTTP status
//! codes. Every error response has the same JSON body:
//!
//! ```json
//! { "success": false, "status": 401, "message": "..." }
//! ```
//!
//! Internal error details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use idgate_core::{AuthFailure, ErrorKind, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Message returned for every 401.
pub const UNAUTHENTICATED_MESSAGE: &str = "Missing or invalid authentication token.";

const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// HTTP status code, repeated for clients that only see the body.
    pub status: u16,
    /// Caller-safe description of what went wrong.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking a required role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request body parsed but a field is invalid (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// The identity provider declined the operation (400).
    #[error("rejected: {0}")]
    Rejected(String),

    /// No such route (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The identity provider is unreachable or refusing calls (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) | Self::Rejected(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message placed in the response body.
    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Validation(msg)
            | Self::Rejected(msg)
            | Self::NotFound(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log internal errors for operator visibility.
        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            success: false,
            status: status.as_u16(),
            message: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Credential-operation failures. `AuthFailure::message` is already
/// caller-safe; 500-class kinds still get the generic message.
impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        if failure.kind.is_upstream_fault() {
            tracing::warn!(kind = ?failure.kind, "identity provider fault surfaced to caller");
            return match failure.kind {
                ErrorKind::MalformedProviderResponse | ErrorKind::Unknown => {
                    Self::Internal(format!("{:?}: {}", failure.kind, failure.message))
                }
                _ => Self::ServiceUnavailable(failure.message),
            };
        }
        match failure.kind {
            ErrorKind::Unauthenticated => Self::Unauthorized(failure.message),
            ErrorKind::ProviderRejected(_) => Self::Rejected(failure.message),
            _ => Self::Validation(failure.message),
        }
    }
}
