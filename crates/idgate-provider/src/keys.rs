//! Signing-key cache for token verification.
//!
//! Keys are fetched from the provider's JWK set URL and trusted for the
//! response's `Cache-Control: max-age`, capped at the configured maximum.
//! Concurrent refreshes collapse into one in-flight fetch whose result every
//! waiter shares. A token naming an unknown `kid` forces a refresh, at most
//! once per [`FORCED_REFRESH_INTERVAL`].
//!
//! No lock is held across the network call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

/// Minimum spacing between refreshes triggered by an unknown `kid`.
pub const FORCED_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Failure to obtain signing keys. Cloneable so one fetch result can be
/// handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("signing key fetch failed: {0}")]
pub struct KeyFetchError(pub String);

struct KeySnapshot {
    keys: HashMap<String, DecodingKey>,
    expires_at: Instant,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<KeySnapshot>, KeyFetchError>>>;

/// Process-wide cache of the provider's public signing keys.
pub struct KeyCache {
    http: reqwest::Client,
    jwks_url: String,
    max_ttl: Duration,
    current: Arc<RwLock<Option<Arc<KeySnapshot>>>>,
    inflight: Mutex<Option<(u64, SharedFetch)>>,
    generation: Mutex<u64>,
    last_forced: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.current.read().as_ref().map(|s| s.keys.len());
        f.debug_struct("KeyCache")
            .field("jwks_url", &self.jwks_url)
            .field("max_ttl", &self.max_ttl)
            .field("cached_keys", &cached)
            .finish()
    }
}

impl KeyCache {
    pub fn new(http: reqwest::Client, jwks_url: &str, max_ttl: Duration) -> Self {
        Self {
            http,
            jwks_url: jwks_url.to_string(),
            max_ttl,
            current: Arc::new(RwLock::new(None)),
            inflight: Mutex::new(None),
            generation: Mutex::new(0),
            last_forced: Mutex::new(None),
        }
    }

    /// Look up the decoding key for `kid`.
    ///
    /// `Ok(None)` means the provider does not publish that key (even after
    /// a permitted forced refresh). `Err` means keys could not be fetched.
    pub async fn key_for(&self, kid: &str) -> Result<Option<DecodingKey>, KeyFetchError> {
        let cached = self.current.read().clone();
        let snapshot = match cached {
            Some(snapshot) if Instant::now() < snapshot.expires_at => {
                if let Some(key) = snapshot.keys.get(kid) {
                    return Ok(Some(key.clone()));
                }
                if !self.claim_forced_refresh() {
                    tracing::debug!(kid, "unknown signing key, forced refresh not yet permitted");
                    return Ok(None);
                }
                tracing::info!(kid, "unknown signing key, refreshing key set");
                self.refresh().await?
            }
            _ => self.refresh().await?,
        };
        Ok(snapshot.keys.get(kid).cloned())
    }

    fn claim_forced_refresh(&self) -> bool {
        let mut last = self.last_forced.lock();
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < FORCED_REFRESH_INTERVAL => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Fetch keys, joining an in-flight fetch if there is one.
    async fn refresh(&self) -> Result<Arc<KeySnapshot>, KeyFetchError> {
        let (id, fetch) = {
            let mut slot = self.inflight.lock();
            match slot.as_ref() {
                Some((id, fetch)) => (*id, fetch.clone()),
                None => {
                    let id = {
                        let mut generation = self.generation.lock();
                        *generation += 1;
                        *generation
                    };
                    let fetch = fetch_keys(
                        self.http.clone(),
                        self.jwks_url.clone(),
                        self.max_ttl,
                        Arc::clone(&self.current),
                    )
                    .boxed()
                    .shared();
                    *slot = Some((id, fetch.clone()));
                    (id, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut slot = self.inflight.lock();
        if matches!(slot.as_ref(), Some((current, _)) if *current == id) {
            *slot = None;
        }
        result
    }
}

async fn fetch_keys(
    http: reqwest::Client,
    url: String,
    max_ttl: Duration,
    current: Arc<RwLock<Option<Arc<KeySnapshot>>>>,
) -> Result<Arc<KeySnapshot>, KeyFetchError> {
    let resp = http
        .get(&url)
        .send()
        .await
        .map_err(|e| KeyFetchError(format!("request to {url} failed: {e}")))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(KeyFetchError(format!("{url} returned {status}")));
    }
    let ttl = cache_ttl(resp.headers(), max_ttl);
    let set: JwkSet = resp
        .json()
        .await
        .map_err(|e| KeyFetchError(format!("invalid JWK set: {e}")))?;

    let mut keys = HashMap::new();
    for jwk in &set.keys {
        let Some(kid) = jwk.common.key_id.clone() else {
            continue;
        };
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(kid, key);
            }
            Err(e) => tracing::warn!(kid = %kid, error = %e, "skipping unusable signing key"),
        }
    }
    if keys.is_empty() {
        return Err(KeyFetchError("JWK set contains no usable keys".to_string()));
    }

    tracing::info!(keys = keys.len(), ttl_secs = ttl.as_secs(), "signing keys refreshed");
    let snapshot = Arc::new(KeySnapshot {
        keys,
        expires_at: Instant::now() + ttl,
    });
    *current.write() = Some(Arc::clone(&snapshot));
    Ok(snapshot)
}

/// Cache lifetime from `Cache-Control: max-age`, capped at `max_ttl`.
fn cache_ttl(headers: &reqwest::header::HeaderMap, max_ttl: Duration) -> Duration {
    headers
        .get(reqwest::header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(max_age)
        .map_or(max_ttl, |age| age.min(max_ttl))
}

fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control.split(',').find_map(|directive| {
        let (name, value) = directive.trim().split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().trim_matches('"').parse().ok().map(Duration::from_secs)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};

    #[test]
    fn max_age_is_parsed_from_directive_list() {
        assert_eq!(
            max_age("public, max-age=19302, must-revalidate, no-transform"),
            Some(Duration::from_secs(19302))
        );
        assert_eq!(max_age("no-cache"), None);
        assert_eq!(max_age("max-age=soon"), None);
    }

    #[test]
    fn ttl_is_clamped_to_maximum() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=19302"));
        assert_eq!(
            cache_ttl(&headers, Duration::from_secs(3600)),
            Duration::from_secs(3600)
        );

        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        assert_eq!(
            cache_ttl(&headers, Duration::from_secs(3600)),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn missing_header_uses_maximum() {
        assert_eq!(
            cache_ttl(&HeaderMap::new(), Duration::from_secs(3600)),
            Duration::from_secs(3600)
        );
    }
}
