//! Identity provider client configuration.
//!
//! Base URLs default to the production provider endpoints. Override via
//! environment variables or explicit construction for staging/testing.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::circuit::BreakerConfig;
use crate::retry::RetryPolicy;

const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com";
const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Configuration for talking to the identity provider.
///
/// Custom `Debug` implementation redacts the `api_key` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Base URL of the password-grant service (sign-in, sign-up).
    pub identity_toolkit_url: Url,
    /// Base URL of the token service (refresh grant).
    pub secure_token_url: Url,
    /// URL of the provider's public signing keys, as a JWK set.
    pub jwks_url: Url,
    /// Project API key, sent as the `key` query parameter.
    pub api_key: Zeroizing<String>,
    /// Provider project identifier. Tokens must carry it as audience.
    pub project_id: String,
    /// Optional service-account credential, validated at startup.
    pub service_account: Option<ServiceAccount>,
    /// Per-attempt HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Upper bound on how long fetched signing keys are trusted.
    pub key_cache_ttl_secs: u64,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// Circuit breaker thresholds.
    pub breaker: BreakerConfig,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("identity_toolkit_url", &self.identity_toolkit_url)
            .field("secure_token_url", &self.secure_token_url)
            .field("jwks_url", &self.jwks_url)
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("service_account", &self.service_account)
            .field("timeout_secs", &self.timeout_secs)
            .field("key_cache_ttl_secs", &self.key_cache_ttl_secs)
            .field("retry", &self.retry)
            .field("breaker", &self.breaker)
            .finish()
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `IDP_API_KEY` (required)
    /// - `IDP_PROJECT_ID` (required)
    /// - `IDP_SERVICE_ACCOUNT_PATH` (optional; must point at a readable
    ///   service-account JSON file for the same project)
    /// - `IDP_IDENTITY_TOOLKIT_URL` (default: `https://identitytoolkit.googleapis.com`)
    /// - `IDP_SECURE_TOKEN_URL` (default: `https://securetoken.googleapis.com`)
    /// - `IDP_JWKS_URL` (default: the provider's published JWK set)
    /// - `IDP_TIMEOUT_SECS` (default: 10)
    /// - `IDP_KEY_CACHE_TTL_SECS` (default: 3600)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// [`ProviderConfig::from_env`] delegates here; tests pass a map instead
    /// of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("IDP_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let project_id = lookup("IDP_PROJECT_ID")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingProjectId)?;

        let service_account = match lookup("IDP_SERVICE_ACCOUNT_PATH") {
            Some(path) if !path.trim().is_empty() => {
                let account = ServiceAccount::load(Path::new(path.trim()))?;
                if account.project_id != project_id {
                    return Err(ConfigError::ProjectMismatch {
                        configured: project_id,
                        service_account: account.project_id,
                    });
                }
                Some(account)
            }
            _ => None,
        };

        Ok(Self {
            identity_toolkit_url: env_url(
                &lookup,
                "IDP_IDENTITY_TOOLKIT_URL",
                DEFAULT_IDENTITY_TOOLKIT_URL,
            )?,
            secure_token_url: env_url(&lookup, "IDP_SECURE_TOKEN_URL", DEFAULT_SECURE_TOKEN_URL)?,
            jwks_url: env_url(&lookup, "IDP_JWKS_URL", DEFAULT_JWKS_URL)?,
            api_key: Zeroizing::new(api_key),
            project_id,
            service_account,
            timeout_secs: env_number(&lookup, "IDP_TIMEOUT_SECS", 10)?,
            key_cache_ttl_secs: env_number(&lookup, "IDP_KEY_CACHE_TTL_SECS", 3600)?,
            retry: RetryPolicy::default(),
            breaker: BreakerConfig::default(),
        })
    }

    /// Create a configuration pointing every endpoint at one local mock
    /// server (for testing). Retry delays are shrunk to milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base_url` cannot be parsed.
    pub fn local_mock(base_url: &str, project_id: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl("mock".to_string(), e.to_string()))?;
        let jwks_url = base
            .join("jwks")
            .map_err(|e| ConfigError::InvalidUrl("mock".to_string(), e.to_string()))?;
        Ok(Self {
            identity_toolkit_url: base.clone(),
            secure_token_url: base,
            jwks_url,
            api_key: Zeroizing::new("test-api-key".to_string()),
            project_id: project_id.to_string(),
            service_account: None,
            timeout_secs: 5,
            key_cache_ttl_secs: 3600,
            retry: RetryPolicy::with_base_delay(std::time::Duration::from_millis(10)),
            breaker: BreakerConfig::default(),
        })
    }

    /// Expected `iss` claim of tokens minted for this project.
    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }
}

fn env_url<F>(lookup: &F, var: &str, default: &str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(var).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number<F>(lookup: &F, var: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
    }
}

/// The identifying fields of a provider service-account credential file.
///
/// The private key in the file is never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    /// Where the file was read from.
    pub path: PathBuf,
    /// Project the account belongs to.
    pub project_id: String,
    /// Service-account principal.
    pub client_email: String,
}

#[derive(Deserialize)]
struct ServiceAccountFile {
    #[serde(rename = "type")]
    kind: String,
    project_id: String,
    client_email: String,
    #[serde(default)]
    private_key: Option<Zeroizing<String>>,
}

impl ServiceAccount {
    /// Read and validate a service-account JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::ServiceAccount {
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let file: ServiceAccountFile =
            serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

        if file.kind != "service_account" {
            return Err(invalid(format!(
                "expected type \"service_account\", found \"{}\"",
                file.kind
            )));
        }
        if file.private_key.as_ref().map_or(true, |k| k.trim().is_empty()) {
            return Err(invalid("private_key is missing".to_string()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            project_id: file.project_id,
            client_email: file.client_email,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IDP_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("IDP_PROJECT_ID environment variable is required")]
    MissingProjectId,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
    #[error("invalid service account file {path}: {reason}")]
    ServiceAccount { path: String, reason: String },
    #[error("service account belongs to project {service_account}, but IDP_PROJECT_ID is {configured}")]
    ProjectMismatch {
        configured: String,
        service_account: String,
    },
}
