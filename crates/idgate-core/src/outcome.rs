//! # Outcome Taxonomy
//!
//! The stable internal error vocabulary. Provider-specific codes, transport
//! faults, and verification failures are all translated into an
//! [`ErrorKind`] before they leave the component that observed them.

use serde::Serialize;

/// Result of a credential operation: the value, or a caller-safe failure.
pub type AuthOutcome<T> = Result<T, AuthFailure>;

/// Why the identity provider declined a credential operation.
///
/// Produced by the error taxonomy from the provider's error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Unknown email or wrong password.
    InvalidCredentials,
    /// Sign-up for an address that already has an account.
    EmailExists,
    /// The account exists but has been disabled.
    UserDisabled,
    /// The provider judged the password too weak.
    WeakPassword,
    /// The provider judged the email address malformed.
    InvalidEmail,
    /// Too many failed attempts; the provider is throttling this account.
    TooManyAttempts,
    /// The refresh token is expired, revoked, or otherwise unusable.
    SessionExpired,
    /// The sign-in method is disabled for this project.
    OperationNotAllowed,
    /// A provider code this gateway does not recognize.
    Unrecognized,
}

/// Internal error kind, stable across provider changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, malformed, or expired bearer token.
    Unauthenticated,
    /// The request body failed shape validation.
    ValidationFailed,
    /// The provider declined the credential operation.
    ProviderRejected(RejectionKind),
    /// The provider could not be reached at all.
    NetworkUnavailable,
    /// The provider kept answering 5xx or 429 until retries ran out.
    TransientUpstreamFailure,
    /// The circuit breaker is open; no call was attempted.
    CircuitOpen,
    /// The provider answered 2xx with a body missing required fields.
    MalformedProviderResponse,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Whether the failure is the provider's (or the network's) fault rather
    /// than the caller's.
    pub fn is_upstream_fault(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable
                | Self::TransientUpstreamFailure
                | Self::CircuitOpen
                | Self::MalformedProviderResponse
                | Self::Unknown
        )
    }
}

/// A failed credential operation.
///
/// `message` is always safe to return to the caller: it never contains raw
/// provider text or internal diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    /// What went wrong, in internal terms.
    pub kind: ErrorKind,
    /// What to tell the caller.
    pub message: String,
}

impl AuthFailure {
    /// Build a failure from a kind and a caller-safe message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AuthFailure {}
