//! # idgate-api — Authentication Gateway HTTP Surface
//!
//! Axum application that fronts a hosted identity provider. Credential
//! operations are forwarded to the provider through
//! [`idgate_provider::TokenExchangeClient`]; every request to a non-public
//! path must carry an ID token the gateway can verify.
//!
//! ## API Surface
//!
//! | Route | Module | Auth |
//! |-------|--------|------|
//! | `POST /auth/login` | [`routes::auth`] | public |
//! | `POST /auth/register` | [`routes::auth`] | public |
//! | `POST /auth/refresh` | [`routes::auth`] | public |
//! | `POST /auth/logout` | [`routes::auth`] | bearer |
//! | `GET /auth/me` | [`routes::auth`] | bearer |
//! | `GET /health` | [`routes::health`] | public |
//! | `GET /openapi.json` | [`openapi`] | public |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler / 404 fallback
//! ```
//!
//! Unknown paths go through the auth middleware like any other, so an
//! unauthenticated caller learns nothing about which routes exist.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::http::Uri;
use axum::middleware::from_fn;
use axum::Router;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::auth::router())
        .merge(routes::health::router())
        .merge(openapi::router())
        .fallback(not_found)
        .layer(from_fn(auth::auth_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(state.gateway.clone()))
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
