//! # Token Bundles
//!
//! The result of a successful sign-in, sign-up, or refresh. A bundle is
//! never mutated: a refresh produces a new bundle that supersedes the old.

use chrono::{DateTime, Duration, Utc};

/// Tokens issued by the identity provider for one authenticated session.
///
/// Invariant: `expires_at() == issued_at + expires_in_secs`. A bundle with
/// `expires_in_secs == 0` is never usable for authorization.
///
/// Custom `Debug` redacts both tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenBundle {
    /// Signed ID token presented as the bearer credential.
    pub id_token: String,
    /// Opaque refresh token.
    pub refresh_token: String,
    /// Lifetime of `id_token` in seconds, as reported by the provider.
    pub expires_in_secs: u64,
    /// When this gateway received the bundle.
    pub issued_at: DateTime<Utc>,
    /// The provider's stable user identifier.
    pub user_id: String,
    /// The account email. The refresh endpoint does not report it.
    pub email: Option<String>,
}

impl TokenBundle {
    /// Absolute expiry instant: `issued_at + expires_in_secs`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.expires_in_secs).unwrap_or(i64::MAX);
        self.issued_at
            .checked_add_signed(Duration::try_seconds(secs).unwrap_or(Duration::MAX))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the bundle may still back an authorization decision at `now`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_in_secs > 0 && now < self.expires_at()
    }
}

impl std::fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBundle")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in_secs", &self.expires_in_secs)
            .field("issued_at", &self.issued_at)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish()
    }
}
