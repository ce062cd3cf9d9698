//! # End-to-End: Register, Sign In, Call Protected Routes
//!
//! Runs the full gateway (real `JwtVerifier`, real `TokenExchangeClient`)
//! against a wiremock identity provider. The provider hands out ID tokens
//! signed with the fixture RSA key and publishes the matching JWK set, so
//! the tokens returned by `/auth/register` are the same tokens the gateway
//! later verifies on protected routes.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use idgate_api::{app, AppConfig, AppState};
use idgate_provider::{IdentityProvider, ProviderConfig};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "demo-project";
const SIGNING_KEY: &str = include_str!("../../idgate-provider/tests/fixtures/signing_key.pem");
const FOREIGN_KEY: &str = include_str!("../../idgate-provider/tests/fixtures/foreign_key.pem");
const JWKS: &str = include_str!("../../idgate-provider/tests/fixtures/jwks.json");

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn id_token_signed_with(pem: &str, exp_offset: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "iss": format!("https://securetoken.google.com/{PROJECT}"),
        "aud": PROJECT,
        "sub": "uid-123",
        "user_id": "uid-123",
        "email": "a@b.com",
        "roles": ["member"],
        "iat": now - 60,
        "exp": now + exp_offset,
    });
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("test-key-1".to_string());
    encode(&header, &claims, &EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap()).unwrap()
}

fn id_token() -> String {
    id_token_signed_with(SIGNING_KEY, 3600)
}

/// Mock provider with the JWK set and the three credential endpoints.
async fn provider() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("cache-control", "public, max-age=3600")
                .set_body_raw(JWKS, "application/json"),
        )
        .mount(&server)
        .await;

    let bundle = json!({
        "localId": "uid-123",
        "email": "a@b.com",
        "idToken": id_token(),
        "refreshToken": "refresh-1",
        "expiresIn": "3600"
    });

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(query_param("key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle.clone()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(body_string_contains("\"password\":\"Aa1!aaaa\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "INVALID_PASSWORD" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_token": id_token(),
            "refresh_token": "refresh-2",
            "expires_in": "3600",
            "user_id": "uid-123"
        })))
        .mount(&server)
        .await;

    server
}

fn gateway(server: &MockServer) -> Router {
    let config = ProviderConfig::local_mock(&server.uri(), PROJECT).unwrap();
    let provider = IdentityProvider::new(&config).unwrap();
    app(AppState::new(&AppConfig::default(), &provider))
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_then_use_the_issued_token() {
    let server = provider().await;
    let app = gateway(&server);

    // Register.
    let (status, body) = call(
        &app,
        post("/auth/register", json!({ "email": "a@b.com", "password": "Aa1!aaaa" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let token = body["idToken"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert!(!body["refreshToken"].as_str().unwrap().is_empty());
    assert!(body["expiresIn"].as_u64().unwrap() > 0);

    // Unknown route: 401 without a token, 404 with one.
    let (status, body) = call(&app, get("/orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], 401);

    let (status, body) = call(&app, get("/orders", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    // Identity from the verified token.
    let (status, body) = call(&app, get("/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject"], "uid-123");
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["roles"], json!(["member"]));

    // Health reflects a healthy provider.
    let (status, body) = call(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy", "provider": "closed" }));
}

#[tokio::test]
async fn login_success_failure_and_refresh() {
    let server = provider().await;
    let app = gateway(&server);

    let (status, body) = call(
        &app,
        post("/auth/login", json!({ "email": "a@b.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email or password.");

    let (status, body) = call(
        &app,
        post("/auth/login", json!({ "email": "a@b.com", "password": "Aa1!aaaa" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["refreshToken"], "refresh-1");

    let (status, body) = call(&app, post("/auth/refresh", json!({ "refreshToken": "refresh-1" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["refreshToken"], "refresh-2");
    assert_eq!(body["userId"], "uid-123");
}

#[tokio::test]
async fn logout_with_verified_token_reports_not_revoked() {
    let server = provider().await;
    let app = gateway(&server);

    let request = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", id_token()))
        .body(Body::from(json!({ "refreshToken": "refresh-1" }).to_string()))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], false);
}

#[tokio::test]
async fn forged_and_expired_tokens_are_rejected_alike() {
    let server = provider().await;
    let app = gateway(&server);

    let forged = id_token_signed_with(FOREIGN_KEY, 3600);
    let expired = id_token_signed_with(SIGNING_KEY, -3600);

    let (s1, b1) = call(&app, get("/auth/me", Some(&forged))).await;
    let (s2, b2) = call(&app, get("/auth/me", Some(&expired))).await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1, b2);
}

#[tokio::test]
async fn provider_outage_opens_circuit_and_health_reports_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let app = gateway(&server);

    let (status, body) = call(
        &app,
        post("/auth/login", json!({ "email": "a@b.com", "password": "Aa1!aaaa" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);

    // Second call trips the breaker partway through its retries.
    let (status, _) = call(
        &app,
        post("/auth/login", json!({ "email": "a@b.com", "password": "Aa1!aaaa" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, body) = call(&app, get("/health", None)).await;
    assert_eq!(body["provider"], "open");
}
