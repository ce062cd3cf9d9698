//! # Health
//!
//! `GET /health` answers from local state only. It reports the identity
//! provider circuit state but never calls the provider.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// Circuit breaker state: `closed`, `open` or `half_open`.
    pub provider: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health — Liveness plus provider circuit state.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        provider: state.exchange.breaker_state().as_str().to_string(),
    })
}
