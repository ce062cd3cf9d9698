//! # Authentication Gateway
//!
//! Bearer-token middleware in front of every route.
//!
//! ## Request flow
//!
//! ```text
//! path ∈ PublicPathSet ──────────────────────────────────────────► handler
//! otherwise: Authorization: Bearer <token> → TokenVerifier.verify
//!            ├─ ok    → VerifiedIdentity in request extensions ──► handler
//!            └─ error → 401 {success:false, status, message}
//! ```
//!
//! Public paths are matched after normalization (see [`normalize_path`]),
//! case-insensitively, either exactly or as a prefix ending at a `/`
//! boundary: `/health` matches `/health` and `/health/live` but not
//! `/healthz`. A path containing a `.` or `..` segment is never public:
//! the router dispatches on the raw path, so `/orders/../health` must not
//! be admitted as `/health`.
//!
//! ## VerifiedIdentity
//!
//! Handlers extract the caller through the `FromRequestParts` impl. Claims
//! are decoded leniently: if `email`/`role`/`roles` cannot be decoded, the
//! request still proceeds with the subject alone and no roles, because the
//! token itself was already verified.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use idgate_provider::{TokenVerifier, VerifiedToken, VerifyError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, UNAUTHENTICATED_MESSAGE};

// ── PublicPathSet ───────────────────────────────────────────────────────────

/// Paths that are always public: credential endpoints, health, API docs.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/refresh",
    "/health",
    "/openapi.json",
];

/// Immutable set of path prefixes exempt from token verification.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPathSet {
    prefixes: Vec<String>,
}

impl PublicPathSet {
    /// Build a set from raw entries. Entries are normalized like request
    /// paths; blank entries are dropped.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = paths
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| normalize_path(p.as_ref().trim()))
            .collect();
        prefixes.sort();
        prefixes.dedup();
        Self { prefixes }
    }

    /// The built-in public paths plus `extra`.
    pub fn with_defaults<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra: Vec<String> = extra.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::new(
            DEFAULT_PUBLIC_PATHS
                .iter()
                .map(|s| s.to_string())
                .chain(extra),
        )
    }

    /// Whether `path` (raw, as received) is public.
    pub fn is_public(&self, path: &str) -> bool {
        if has_dot_segment(path) {
            return false;
        }
        let path = normalize_path(path);
        self.prefixes.iter().any(|prefix| {
            path == *prefix
                || (path.starts_with(prefix.as_str())
                    && path[prefix.len()..].starts_with('/'))
        })
    }

    /// The normalized entries.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }
}

/// Canonical form of a request path for public-path matching.
///
/// Collapses repeated `/`, resolves `.` and `..` (never above the root),
/// drops a trailing `/` and lowercases. The result always starts with `/`.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/")).to_lowercase()
}

fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "." || segment == "..")
}

// ── VerifiedIdentity ────────────────────────────────────────────────────────

/// Identity of the authenticated caller, valid for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VerifiedIdentity {
    /// Stable provider user id (`sub`).
    pub subject: String,
    /// Account email, when the token carries one.
    pub email: Option<String>,
    /// Roles from the `role` and `roles` custom claims.
    pub roles: BTreeSet<String>,
}

impl VerifiedIdentity {
    /// An identity with only the subject, for tokens whose claims could
    /// not be decoded.
    pub fn verification_only(subject: String) -> Self {
        Self {
            subject,
            email: None,
            roles: BTreeSet::new(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

#[derive(Deserialize)]
struct IdentityClaims {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

impl From<VerifiedToken> for VerifiedIdentity {
    fn from(token: VerifiedToken) -> Self {
        match serde_json::from_value::<IdentityClaims>(token.claims) {
            Ok(claims) => Self {
                subject: token.subject,
                email: claims.email,
                roles: claims.role.into_iter().chain(claims.roles).collect(),
            },
            Err(e) => {
                tracing::warn!(
                    subject = %token.subject,
                    error = %e,
                    "identity claims could not be decoded; continuing with verification-only identity"
                );
                Self::verification_only(token.subject)
            }
        }
    }
}

/// Extracts the identity the gateway attached to the request.
/// Returns 401 if none is present (route is public or middleware absent).
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for VerifiedIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()))
    }
}

/// Check that the caller holds `role`. Returns 403 Forbidden otherwise.
pub fn require_role(identity: &VerifiedIdentity, role: &str) -> Result<(), AppError> {
    if identity.has_role(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("role '{role}' required")))
    }
}

// ── AuthGateway ─────────────────────────────────────────────────────────────

/// Why a request to a protected path was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingHeader,
    WrongScheme,
    EmptyToken,
    Verification(VerifyError),
}

impl Rejection {
    /// Stable reason label for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::WrongScheme => "wrong_scheme",
            Self::EmptyToken => "empty_token",
            Self::Verification(err) => err.reason(),
        }
    }
}

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Public path; no token was inspected.
    Public,
    /// Protected path with a verified token.
    Authenticated(VerifiedIdentity),
}

/// Per-request gate: public-path check, bearer extraction, verification.
///
/// Cloned per request; injected into request extensions with
/// `axum::Extension` and read by [`auth_middleware`].
#[derive(Clone)]
pub struct AuthGateway {
    public_paths: Arc<PublicPathSet>,
    verifier: Arc<dyn TokenVerifier>,
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("public_paths", &self.public_paths)
            .finish_non_exhaustive()
    }
}

impl AuthGateway {
    pub fn new(public_paths: PublicPathSet, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            public_paths: Arc::new(public_paths),
            verifier,
        }
    }

    pub fn public_paths(&self) -> &PublicPathSet {
        &self.public_paths
    }

    /// Decide whether a request may proceed.
    pub async fn admit(&self, path: &str, headers: &HeaderMap) -> Result<Admission, Rejection> {
        if self.public_paths.is_public(path) {
            return Ok(Admission::Public);
        }
        let token = bearer_token(headers)?;
        let verified = self
            .verifier
            .verify(token)
            .await
            .map_err(Rejection::Verification)?;
        Ok(Admission::Authenticated(VerifiedIdentity::from(verified)))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is
/// matched case-insensitively and the token is trimmed.
fn bearer_token(headers: &HeaderMap) -> Result<&str, Rejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(Rejection::MissingHeader)?
        .to_str()
        .map_err(|_| Rejection::WrongScheme)?;
    match value.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => {}
        _ => return Err(Rejection::WrongScheme),
    }
    let token = value[7..].trim();
    if token.is_empty() {
        return Err(Rejection::EmptyToken);
    }
    Ok(token)
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Gate every request through the [`AuthGateway`] found in request
/// extensions.
///
/// On success the [`VerifiedIdentity`] is inserted into request extensions
/// for downstream handlers. Without a gateway in extensions the request is
/// refused.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(gateway) = request.extensions().get::<AuthGateway>().cloned() else {
        tracing::error!("authentication gateway missing from request extensions; refusing request");
        return unauthorized_response();
    };

    match gateway.admit(request.uri().path(), request.headers()).await {
        Ok(Admission::Public) => next.run(request).await,
        Ok(Admission::Authenticated(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(rejection) => {
            match &rejection {
                Rejection::Verification(err @ VerifyError::VerificationUnavailable(_)) => {
                    tracing::error!(reason = rejection.reason(), path = %request.uri().path(), error = %err, "authentication failed");
                }
                Rejection::Verification(err) => {
                    tracing::warn!(reason = rejection.reason(), path = %request.uri().path(), error = %err, "authentication failed");
                }
                _ => {
                    tracing::warn!(reason = rejection.reason(), path = %request.uri().path(), "authentication failed");
                }
            }
            unauthorized_response()
        }
    }
}

fn unauthorized_response() -> Response {
    AppError::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()).into_response()
}
