//! Transport-level errors for identity provider calls.
//!
//! These carry full diagnostic detail and stay inside this crate's logs.
//! [`crate::TokenExchangeClient`] turns them into caller-safe
//! [`idgate_core::AuthFailure`] values before returning.

/// Errors from the resilient transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("HTTP request to {endpoint} failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider kept answering with a transient status (5xx or 429)
    /// until retries ran out.
    #[error("{endpoint} returned {status} after {attempts} attempt(s): {body}")]
    UpstreamStatus {
        endpoint: String,
        status: u16,
        body: String,
        attempts: u32,
    },

    /// The circuit breaker refused the call without touching the network.
    #[error("circuit open for {endpoint}")]
    CircuitOpen { endpoint: String },
}

/// Errors building the provider clients.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl TransportError {
    /// The logical endpoint name the failure belongs to.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Network { endpoint, .. }
            | Self::UpstreamStatus { endpoint, .. }
            | Self::CircuitOpen { endpoint } => endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_display_includes_attempts() {
        let err = TransportError::UpstreamStatus {
            endpoint: "sign_in".into(),
            status: 503,
            body: "unavailable".into(),
            attempts: 4,
        };
        assert_eq!(
            err.to_string(),
            "sign_in returned 503 after 4 attempt(s): unavailable"
        );
        assert_eq!(err.endpoint(), "sign_in");
    }

    #[test]
    fn circuit_open_names_endpoint() {
        let err = TransportError::CircuitOpen {
            endpoint: "refresh".into(),
        };
        assert_eq!(err.to_string(), "circuit open for refresh");
    }
}
