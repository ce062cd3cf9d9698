//! # Provider Error Taxonomy
//!
//! Maps the identity provider's error codes onto [`RejectionKind`] plus a
//! stable, caller-facing message. Raw provider text never reaches a caller:
//! unknown codes fall back to a generic message.

use idgate_core::{AuthFailure, ErrorKind, RejectionKind};

use crate::error::TransportError;

/// Message for any upstream outage (network, exhausted retries, open circuit).
pub const SERVICE_UNAVAILABLE: &str = "Service unavailable. Please try again later.";

/// Message for internal or unexpected failures.
pub const UNEXPECTED: &str = "An unexpected error occurred. Please try again later.";

/// Generic message for provider codes this gateway does not know.
pub const GENERIC_REJECTION: &str = "Authentication failed. Please try again.";

/// Extract the bare error code from a provider message.
///
/// The provider sometimes appends detail: `"WEAK_PASSWORD : Password should
/// be at least 6 characters"`. Only the part before `" : "` is the code.
pub fn provider_code(message: &str) -> &str {
    message
        .split_once(" : ")
        .map_or(message, |(code, _)| code)
        .trim()
}

/// Classify a provider error code.
pub fn classify(code: &str) -> (RejectionKind, &'static str) {
    match provider_code(code) {
        "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS"
        | "MISSING_PASSWORD" => (
            RejectionKind::InvalidCredentials,
            "Invalid email or password.",
        ),
        "EMAIL_EXISTS" => (
            RejectionKind::EmailExists,
            "An account with this email already exists.",
        ),
        "USER_DISABLED" => (RejectionKind::UserDisabled, "This account has been disabled."),
        "WEAK_PASSWORD" => (
            RejectionKind::WeakPassword,
            "Password is too weak. Please choose a stronger password.",
        ),
        "INVALID_EMAIL" | "MISSING_EMAIL" => {
            (RejectionKind::InvalidEmail, "Invalid email address.")
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" => (
            RejectionKind::TooManyAttempts,
            "Too many attempts. Please try again later.",
        ),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "MISSING_REFRESH_TOKEN" | "USER_NOT_FOUND"
        | "INVALID_ID_TOKEN" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => (
            RejectionKind::SessionExpired,
            "Your session has expired. Please sign in again.",
        ),
        "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => (
            RejectionKind::OperationNotAllowed,
            "This sign-in method is not enabled.",
        ),
        _ => (RejectionKind::Unrecognized, GENERIC_REJECTION),
    }
}

/// Build the caller-facing failure for a provider rejection.
pub fn rejection(code: &str) -> AuthFailure {
    let (kind, message) = classify(code);
    AuthFailure::new(ErrorKind::ProviderRejected(kind), message)
}

/// Build the caller-facing failure for a transport error.
pub fn from_transport(err: &TransportError) -> AuthFailure {
    tracing::debug!(endpoint = err.endpoint(), error = %err, "transport failure mapped to caller message");
    let kind = match err {
        TransportError::Network { .. } => ErrorKind::NetworkUnavailable,
        TransportError::UpstreamStatus { .. } => ErrorKind::TransientUpstreamFailure,
        TransportError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
    };
    AuthFailure::new(kind, SERVICE_UNAVAILABLE)
}

/// Failure for a 2xx answer that could not be turned into a token bundle.
pub fn malformed_response() -> AuthFailure {
    AuthFailure::new(ErrorKind::MalformedProviderResponse, UNEXPECTED)
}

/// Failure for anything that fits no other category.
pub fn unknown() -> AuthFailure {
    AuthFailure::new(ErrorKind::Unknown, UNEXPECTED)
}
