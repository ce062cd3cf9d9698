//! Typed client for the provider's credential operations.
//!
//! ## Endpoints
//!
//! | Operation | Method | Path | Body |
//! |-----------|--------|------|------|
//! | Sign in   | POST | `{identity_toolkit}/v1/accounts:signInWithPassword?key=` | JSON, camelCase |
//! | Sign up   | POST | `{identity_toolkit}/v1/accounts:signUp?key=` | JSON, camelCase |
//! | Refresh   | POST | `{secure_token}/v1/token?key=` | form, snake_case response |
//!
//! The provider has no endpoint for revoking a single refresh token, so
//! [`TokenExchangeClient::revoke`] does nothing and says so through
//! [`Revocation::NotSupported`] and [`TokenExchangeClient::revocation_supported`].

use chrono::Utc;
use idgate_core::{
    AuthFailure, AuthOutcome, Credential, ErrorKind, TokenBundle, ValidationError,
};
use zeroize::Zeroizing;

use crate::circuit::CircuitState;
use crate::config::ProviderConfig;
use crate::taxonomy;
use crate::transport::{RawResponse, ResilientTransport};
use crate::wire::{
    PasswordGrantRequest, PasswordGrantResponse, ProviderErrorBody, RefreshGrantResponse,
};

const SIGN_IN_PATH: &str = "v1/accounts:signInWithPassword";
const SIGN_UP_PATH: &str = "v1/accounts:signUp";
const REFRESH_PATH: &str = "v1/token";

/// What happened to a refresh token handed to [`TokenExchangeClient::revoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    /// The token can no longer be exchanged.
    Revoked,
    /// Nothing was done; the token stays valid until the provider expires it.
    NotSupported,
}

impl Revocation {
    pub fn is_revoked(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

/// Client for sign-in, sign-up, refresh and revoke.
///
/// All calls share one [`ResilientTransport`], and therefore one circuit
/// breaker.
pub struct TokenExchangeClient {
    http: reqwest::Client,
    identity_toolkit_url: String,
    secure_token_url: String,
    api_key: Zeroizing<String>,
    transport: ResilientTransport,
}

impl std::fmt::Debug for TokenExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchangeClient")
            .field("identity_toolkit_url", &self.identity_toolkit_url)
            .field("secure_token_url", &self.secure_token_url)
            .field("api_key", &"[REDACTED]")
            .field("transport", &self.transport)
            .finish()
    }
}

impl TokenExchangeClient {
    pub(crate) fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            identity_toolkit_url: config.identity_toolkit_url.as_str().trim_end_matches('/').to_string(),
            secure_token_url: config.secure_token_url.as_str().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            transport: ResilientTransport::new(config.retry, config.breaker),
        }
    }

    /// Exchange an email/password pair for a token bundle.
    pub async fn sign_in(&self, credential: &Credential) -> AuthOutcome<TokenBundle> {
        self.password_grant("sign_in", SIGN_IN_PATH, credential).await
    }

    /// Create an account and return its first token bundle.
    pub async fn sign_up(&self, credential: &Credential) -> AuthOutcome<TokenBundle> {
        self.password_grant("sign_up", SIGN_UP_PATH, credential).await
    }

    /// Exchange a refresh token for a new bundle. The old bundle is
    /// superseded, not updated.
    pub async fn refresh(&self, refresh_token: &str) -> AuthOutcome<TokenBundle> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            let err = ValidationError::Empty {
                field: "refreshToken",
            };
            return Err(AuthFailure::new(ErrorKind::ValidationFailed, err.to_string()));
        }

        let url = format!("{}/{}", self.secure_token_url, REFRESH_PATH);
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let raw = self
            .transport
            .execute("refresh", || {
                self.http
                    .post(&url)
                    .query(&[("key", self.api_key.as_str())])
                    .form(&form)
                    .send()
            })
            .await
            .map_err(|e| taxonomy::from_transport(&e))?;

        if !raw.is_success() {
            return Err(rejection("refresh", &raw));
        }
        let parsed: RefreshGrantResponse = serde_json::from_str(&raw.body).map_err(|e| {
            tracing::error!(endpoint = "refresh", error = %e, "unparseable provider response");
            taxonomy::malformed_response()
        })?;

        let bundle = TokenBundle {
            id_token: required("refresh", "id_token", parsed.id_token)?,
            refresh_token: required("refresh", "refresh_token", parsed.refresh_token)?,
            expires_in_secs: required("refresh", "expires_in", parsed.expires_in)?,
            issued_at: Utc::now(),
            user_id: required("refresh", "user_id", parsed.user_id)?,
            email: None,
        };
        usable("refresh", bundle)
    }

    /// Best-effort revocation. The provider offers no per-token revocation,
    /// so this never contacts it and always reports
    /// [`Revocation::NotSupported`].
    pub async fn revoke(&self, refresh_token: &str) -> AuthOutcome<Revocation> {
        if refresh_token.trim().is_empty() {
            let err = ValidationError::Empty {
                field: "refreshToken",
            };
            return Err(AuthFailure::new(ErrorKind::ValidationFailed, err.to_string()));
        }
        tracing::warn!("refresh token revocation requested but not supported by the provider; token remains valid until expiry");
        Ok(Revocation::NotSupported)
    }

    /// Whether [`TokenExchangeClient::revoke`] actually revokes anything.
    pub fn revocation_supported(&self) -> bool {
        false
    }

    /// State of the circuit breaker guarding provider calls.
    pub fn breaker_state(&self) -> CircuitState {
        self.transport.breaker_state()
    }

    async fn password_grant(
        &self,
        endpoint: &'static str,
        path: &str,
        credential: &Credential,
    ) -> AuthOutcome<TokenBundle> {
        let url = format!("{}/{}", self.identity_toolkit_url, path);
        let body = PasswordGrantRequest {
            email: credential.email(),
            password: credential.password(),
            return_secure_token: true,
        };
        let raw = self
            .transport
            .execute(endpoint, || {
                self.http
                    .post(&url)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&body)
                    .send()
            })
            .await
            .map_err(|e| taxonomy::from_transport(&e))?;

        if !raw.is_success() {
            return Err(rejection(endpoint, &raw));
        }
        let parsed: PasswordGrantResponse = serde_json::from_str(&raw.body).map_err(|e| {
            tracing::error!(endpoint, error = %e, "unparseable provider response");
            taxonomy::malformed_response()
        })?;

        let bundle = TokenBundle {
            id_token: required(endpoint, "idToken", parsed.id_token)?,
            refresh_token: required(endpoint, "refreshToken", parsed.refresh_token)?,
            expires_in_secs: required(endpoint, "expiresIn", parsed.expires_in)?,
            issued_at: Utc::now(),
            user_id: required(endpoint, "localId", parsed.local_id)?,
            email: Some(
                parsed
                    .email
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| credential.email().to_string()),
            ),
        };
        usable(endpoint, bundle)
    }
}

/// Turn a non-2xx, non-transient answer into a caller-safe failure.
fn rejection(endpoint: &str, raw: &RawResponse) -> AuthFailure {
    let message = serde_json::from_str::<ProviderErrorBody>(&raw.body)
        .ok()
        .and_then(|b| b.error.message);
    match message {
        Some(message) => {
            let code = taxonomy::provider_code(&message);
            tracing::info!(endpoint, status = raw.status, provider_code = code, "provider rejected request");
            taxonomy::rejection(code)
        }
        None => {
            tracing::error!(endpoint, status = raw.status, body = %raw.body, "provider error without a recognizable body");
            taxonomy::unknown()
        }
    }
}

/// Reject a bundle whose ID token is already expired when issued.
fn usable(endpoint: &str, bundle: TokenBundle) -> AuthOutcome<TokenBundle> {
    if bundle.is_usable_at(bundle.issued_at) {
        Ok(bundle)
    } else {
        tracing::error!(endpoint, expires_in = bundle.expires_in_secs, "provider issued a token bundle with no lifetime");
        Err(taxonomy::malformed_response())
    }
}

fn required<T: Presence>(endpoint: &str, field: &str, value: Option<T>) -> AuthOutcome<T> {
    match value {
        Some(v) if v.is_present() => Ok(v),
        _ => {
            tracing::error!(endpoint, field, "provider response missing required field");
            Err(taxonomy::malformed_response())
        }
    }
}

/// Distinguishes real values from empty placeholders in provider responses.
trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Presence for u64 {
    fn is_present(&self) -> bool {
        true
    }
}
