//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "ID token issued by the identity provider, sent as `Authorization: Bearer <token>`.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "idgate",
        description = "Authentication gateway in front of a hosted identity provider.\n\nPublic routes: `/auth/login`, `/auth/register`, `/auth/refresh`, `/health`, `/openapi.json`. Every other route requires `Authorization: Bearer <idToken>`. Errors use the body `{success: false, status, message}`."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Credentials ──────────────────────────────────────────────────
        crate::routes::auth::login,
        crate::routes::auth::register,
        crate::routes::auth::refresh,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        // ── Health ───────────────────────────────────────────────────────
        crate::routes::health::health,
    ),
    components(schemas(
        crate::routes::auth::LoginRequest,
        crate::routes::auth::RegisterRequest,
        crate::routes::auth::RefreshRequest,
        crate::routes::auth::LogoutRequest,
        crate::routes::auth::TokenResponse,
        crate::routes::auth::LogoutResponse,
        crate::routes::health::HealthResponse,
        crate::auth::VerifiedIdentity,
        crate::error::ErrorBody,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Sign-in, registration, token refresh, sign-out"),
        (name = "health", description = "Liveness and provider circuit state"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
