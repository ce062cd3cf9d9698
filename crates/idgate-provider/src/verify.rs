//! Bearer token verification.
//!
//! A token is accepted when, in order:
//! 1. its header names `RS256` and a key id,
//! 2. the signature verifies against that provider key,
//! 3. `exp` is not in the past (no leeway),
//! 4. `iss` is `https://securetoken.google.com/<project>`, `aud` is the
//!    project, `sub` is non-empty and `iat` is not in the future.
//!
//! Issuer and audience are checked after expiry, so an expired token is
//! always reported as [`VerifyError::ExpiredToken`].

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::Value;

use crate::keys::KeyCache;

/// A token that passed verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    /// The `sub` claim: the provider's stable user id.
    pub subject: String,
    /// The full claim set, for callers that decode identity claims.
    pub claims: Value,
}

/// Why a token was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Malformed, wrongly signed, or issued for another project.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Validly signed but past its `exp`.
    #[error("token expired")]
    ExpiredToken,
    /// Signing keys could not be obtained.
    #[error("verification unavailable: {0}")]
    VerificationUnavailable(String),
}

impl VerifyError {
    /// Stable reason label for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::VerificationUnavailable(_) => "verification_unavailable",
        }
    }
}

/// Anything that can verify a bearer token.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError>;
}

/// Verifies provider-issued JWTs locally against cached public keys.
#[derive(Debug)]
pub struct JwtVerifier {
    keys: KeyCache,
    issuer: String,
    audience: String,
}

impl JwtVerifier {
    /// `issuer` and `audience` must match the token's `iss` and `aud`.
    pub fn new(keys: KeyCache, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    fn check_claims(&self, claims: &Value) -> Result<String, VerifyError> {
        let invalid = |reason: &str| VerifyError::InvalidToken(reason.to_string());

        if claims.get("iss").and_then(Value::as_str) != Some(self.issuer.as_str()) {
            return Err(invalid("issuer mismatch"));
        }
        let audience_ok = match claims.get("aud") {
            Some(Value::String(aud)) => *aud == self.audience,
            Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(&self.audience)),
            _ => false,
        };
        if !audience_ok {
            return Err(invalid("audience mismatch"));
        }
        let issued_at = claims
            .get("iat")
            .and_then(Value::as_i64)
            .ok_or_else(|| invalid("missing iat"))?;
        if issued_at > chrono::Utc::now().timestamp() {
            return Err(invalid("issued in the future"));
        }
        match claims.get("sub").and_then(Value::as_str) {
            Some(sub) if !sub.is_empty() => Ok(sub.to_string()),
            _ => Err(invalid("missing subject")),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError> {
        let header = decode_header(token)
            .map_err(|e| VerifyError::InvalidToken(format!("malformed header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::InvalidToken("missing key id".to_string()))?;

        let key = self
            .keys
            .key_for(&kid)
            .await
            .map_err(|e| VerifyError::VerificationUnavailable(e.to_string()))?
            .ok_or_else(|| VerifyError::InvalidToken(format!("unknown key id {kid}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Value>(token, &key, &validation).map_err(|e| match e.kind() {
            JwtErrorKind::ExpiredSignature => VerifyError::ExpiredToken,
            _ => VerifyError::InvalidToken(e.to_string()),
        })?;

        let subject = self.check_claims(&data.claims)?;
        Ok(VerifiedToken {
            subject,
            claims: data.claims,
        })
    }
}
