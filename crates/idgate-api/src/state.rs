//! # Application State
//!
//! Shared state for the Axum application, passed to route handlers via the
//! `State` extractor. Everything here is built once at startup and never
//! mutated; the only cross-request mutable state lives inside the provider
//! client (circuit breaker) and the verifier (signing-key cache).

use std::sync::Arc;

use idgate_core::PasswordPolicy;
use idgate_provider::{IdentityProvider, TokenExchangeClient, TokenVerifier};

use crate::auth::{AuthGateway, PublicPathSet};

/// Process configuration outside the provider itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// HTTP listen port (`PORT`, default 8080).
    pub port: u16,
    /// Extra public path prefixes (`PUBLIC_PATHS`, comma-separated).
    pub extra_public_paths: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            extra_public_paths: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Read `PORT` and `PUBLIC_PATHS` from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(8080);
        let extra_public_paths = lookup("PUBLIC_PATHS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            port,
            extra_public_paths,
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Credential operations against the identity provider.
    pub exchange: Arc<TokenExchangeClient>,
    /// Request gate used by the auth middleware.
    pub gateway: AuthGateway,
    /// Strength rules enforced on registration.
    pub password_policy: PasswordPolicy,
}

impl AppState {
    /// Wire state from an already-built provider.
    pub fn new(config: &AppConfig, provider: &IdentityProvider) -> Self {
        let verifier: Arc<dyn TokenVerifier> = provider.verifier();
        Self::with_verifier(config, provider.exchange(), verifier)
    }

    /// Wire state with an arbitrary verifier.
    pub fn with_verifier(
        config: &AppConfig,
        exchange: Arc<TokenExchangeClient>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let public_paths = PublicPathSet::with_defaults(&config.extra_public_paths);
        Self {
            exchange,
            gateway: AuthGateway::new(public_paths, verifier),
            password_policy: PasswordPolicy::default(),
        }
    }
}
