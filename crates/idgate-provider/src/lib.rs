//! # idgate-provider -- Typed client for the upstream identity provider
//!
//! Everything that talks to the identity provider lives here:
//! - **Token exchange**: sign-in, sign-up and refresh over the provider's
//!   REST endpoints, plus a revoke operation that reports it is unsupported.
//! - **Token verification**: RS256 signature, expiry, issuer and audience
//!   checks against the provider's published signing keys.
//! - **Resilience**: retry with exponential backoff behind a circuit breaker.
//! - **Error taxonomy**: provider error codes mapped to stable internal kinds
//!   and caller-safe messages.
//!
//! No other crate in the workspace issues HTTP requests to the provider.

pub mod circuit;
pub mod config;
pub mod error;
pub mod exchange;
pub mod keys;
pub mod retry;
pub mod taxonomy;
pub mod transport;
pub mod verify;
mod wire;

pub use circuit::{BreakerConfig, CircuitState};
pub use config::{ConfigError, ProviderConfig};
pub use error::{InitError, TransportError};
pub use exchange::{Revocation, TokenExchangeClient};
pub use keys::KeyCache;
pub use retry::RetryPolicy;
pub use verify::{JwtVerifier, TokenVerifier, VerifiedToken, VerifyError};

use std::sync::Arc;
use std::time::Duration;

/// Top-level provider handle. Holds the exchange client and the verifier,
/// which share one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    exchange: Arc<TokenExchangeClient>,
    verifier: Arc<JwtVerifier>,
}

impl IdentityProvider {
    /// Build the provider clients from configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, InitError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(InitError::HttpClient)?;

        let keys = KeyCache::new(
            http.clone(),
            config.jwks_url.as_str(),
            Duration::from_secs(config.key_cache_ttl_secs),
        );

        Ok(Self {
            exchange: Arc::new(TokenExchangeClient::new(http, config)),
            verifier: Arc::new(JwtVerifier::new(
                keys,
                config.issuer(),
                config.project_id.clone(),
            )),
        })
    }

    /// The credential-operation client.
    pub fn exchange(&self) -> Arc<TokenExchangeClient> {
        Arc::clone(&self.exchange)
    }

    /// The bearer-token verifier.
    pub fn verifier(&self) -> Arc<JwtVerifier> {
        Arc::clone(&self.verifier)
    }
}
