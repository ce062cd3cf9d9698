//! # Credential Routes
//!
//! | Method | Path | Auth | Success |
//! |--------|------|------|---------|
//! | POST | `/auth/login` | public | 200 token bundle |
//! | POST | `/auth/register` | public | 201 token bundle |
//! | POST | `/auth/refresh` | public | 200 token bundle |
//! | POST | `/auth/logout` | bearer | 200 `{message, revoked}` |
//! | GET  | `/auth/me` | bearer | 200 caller identity |
//!
//! Bodies are camelCase JSON.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use idgate_core::{validate_email, Credential, TokenBundle, ValidationError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::VerifiedIdentity;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// -- Request DTOs -------------------------------------------------------------

/// Sign-in request. No `Debug`: it holds a password.
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_email(self.email.trim())?;
        if self.password.is_empty() {
            return Err(ValidationError::Empty { field: "password" });
        }
        Ok(())
    }
}

/// Registration request. The password must be at least 8 characters with
/// an uppercase letter, a lowercase letter, a digit, and a special character.
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_email(self.email.trim())
    }
}

/// Refresh-token exchange request.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        non_empty_refresh_token(&self.refresh_token)
    }
}

/// Sign-out request.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

impl Validate for LogoutRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        non_empty_refresh_token(&self.refresh_token)
    }
}

fn non_empty_refresh_token(token: &str) -> Result<(), ValidationError> {
    if token.trim().is_empty() {
        Err(ValidationError::Empty {
            field: "refreshToken",
        })
    } else {
        Ok(())
    }
}

// -- Response DTOs ------------------------------------------------------------

/// Tokens returned by login, register and refresh.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds until `idToken` expires.
    pub expires_in: u64,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<TokenBundle> for TokenResponse {
    fn from(bundle: TokenBundle) -> Self {
        Self {
            success: true,
            id_token: bundle.id_token,
            refresh_token: bundle.refresh_token,
            expires_in: bundle.expires_in_secs,
            user_id: bundle.user_id,
            email: bundle.email,
        }
    }
}

/// Sign-out result. `revoked` is `false` while the provider offers no
/// refresh-token revocation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
    pub revoked: bool,
}

// -- Router -------------------------------------------------------------------

/// Build the credential router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/// POST /auth/login — Exchange email and password for tokens.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 400, description = "Invalid request or credentials", body = ErrorBody),
        (status = 503, description = "Identity provider unavailable", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let credential = Credential::new(&req.email, &req.password)?;
    let bundle = state.exchange.sign_in(&credential).await?;
    tracing::info!(user_id = %bundle.user_id, "sign-in succeeded");
    Ok(Json(bundle.into()))
}

/// POST /auth/register — Create an account and sign it in.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Invalid request, weak password, or email taken", body = ErrorBody),
        (status = 503, description = "Identity provider unavailable", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let req = extract_validated_json(body)?;
    state.password_policy.check(&req.password)?;
    let credential = Credential::new(&req.email, &req.password)?;
    let bundle = state.exchange.sign_up(&credential).await?;
    tracing::info!(user_id = %bundle.user_id, "account registered");
    Ok((StatusCode::CREATED, Json(bundle.into())))
}

/// POST /auth/refresh — Exchange a refresh token for a new token bundle.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenResponse),
        (status = 400, description = "Invalid or expired refresh token", body = ErrorBody),
        (status = 503, description = "Identity provider unavailable", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let bundle = state.exchange.refresh(&req.refresh_token).await?;
    Ok(Json(bundle.into()))
}

/// POST /auth/logout — Sign out.
///
/// Refresh tokens cannot be revoked through the provider, so the response
/// says `revoked: false` and the token stays usable until it expires.
#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Signed out", body = LogoutResponse),
        (status = 400, description = "Missing refresh token", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(
    identity: VerifiedIdentity,
    State(state): State<AppState>,
    body: Result<Json<LogoutRequest>, JsonRejection>,
) -> Result<Json<LogoutResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let revocation = state.exchange.revoke(&req.refresh_token).await?;
    tracing::info!(subject = %identity.subject, revoked = revocation.is_revoked(), "signed out");

    let message = if revocation.is_revoked() {
        "Signed out."
    } else {
        "Signed out. The refresh token was not revoked and remains valid until it expires."
    };
    Ok(Json(LogoutResponse {
        message: message.to_string(),
        revoked: revocation.is_revoked(),
    }))
}

/// GET /auth/me — The caller's verified identity.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Caller identity", body = VerifiedIdentity),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(identity: VerifiedIdentity) -> Json<VerifiedIdentity> {
    Json(identity)
}
