//! # Request Body Helpers
//!
//! Handlers accept `Result<Json<T>, JsonRejection>` instead of `Json<T>` so a
//! body that fails to parse still answers with the gateway's JSON error
//! shape. These helpers unwrap that result and run field checks.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use idgate_core::ValidationError;

use crate::error::AppError;

/// Field checks a request DTO runs after it has deserialized.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Unwrap a parsed body; a rejection becomes [`AppError::BadRequest`] (400).
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match result {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// [`extract_json`], then [`Validate::validate`]; a failed check becomes
/// [`AppError::Validation`] with the field's message.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate()?;
    Ok(value)
}
