//! Contract tests for TokenExchangeClient against the provider's REST API.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST   | `/v1/accounts:signInWithPassword` | `sign_in_*` |
//! | POST   | `/v1/accounts:signUp` | `sign_up_*` |
//! | POST   | `/v1/token` | `refresh_*` |

use idgate_core::{Credential, ErrorKind, RejectionKind};
use idgate_provider::{CircuitState, IdentityProvider, ProviderConfig, Revocation, TokenExchangeClient};
use std::sync::Arc;
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> Arc<TokenExchangeClient> {
    let config = ProviderConfig::local_mock(&mock_server.uri(), "demo-project").unwrap();
    IdentityProvider::new(&config).unwrap().exchange()
}

fn credential() -> Credential {
    Credential::new("a@b.com", "Aa1!aaaa").unwrap()
}

fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": { "code": 400, "message": message, "errors": [] } })
}

fn sign_in_success(expires_in: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "kind": "identitytoolkit#VerifyPasswordResponse",
        "localId": "uid-123",
        "email": "a@b.com",
        "idToken": "header.payload.signature",
        "refreshToken": "refresh-abc",
        "expiresIn": expires_in,
        "registered": true
    }))
}

// ── POST /v1/accounts:signInWithPassword ─────────────────────────────

#[tokio::test]
async fn sign_in_sends_credentials_and_returns_bundle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(query_param("key", "test-api-key"))
        .and(body_json(serde_json::json!({
            "email": "a@b.com",
            "password": "Aa1!aaaa",
            "returnSecureToken": true
        })))
        .respond_with(sign_in_success(serde_json::json!("3600")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let bundle = test_client(&mock_server).sign_in(&credential()).await.unwrap();
    assert_eq!(bundle.id_token, "header.payload.signature");
    assert_eq!(bundle.refresh_token, "refresh-abc");
    assert_eq!(bundle.expires_in_secs, 3600);
    assert_eq!(bundle.user_id, "uid-123");
    assert_eq!(bundle.email.as_deref(), Some("a@b.com"));
    assert!(bundle.is_usable_at(bundle.issued_at));
}

#[tokio::test]
async fn sign_in_accepts_numeric_expires_in() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(sign_in_success(serde_json::json!(3600)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let bundle = test_client(&mock_server).sign_in(&credential()).await.unwrap();
    assert_eq!(bundle.expires_in_secs, 3600);
}

#[tokio::test]
async fn sign_in_with_zero_lifetime_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(sign_in_success(serde_json::json!("0")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server).sign_in(&credential()).await.unwrap_err();
    assert_eq!(failure.kind, ErrorKind::MalformedProviderResponse);
}

#[tokio::test]
async fn sign_in_wrong_password_is_attempted_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("INVALID_PASSWORD")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server)
        .sign_in(&credential())
        .await
        .unwrap_err();
    assert_eq!(
        failure.kind,
        ErrorKind::ProviderRejected(RejectionKind::InvalidCredentials)
    );
    assert_eq!(failure.message, "Invalid email or password.");
}

#[tokio::test]
async fn sign_in_unknown_email_gets_same_message_as_wrong_password() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("EMAIL_NOT_FOUND")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server)
        .sign_in(&credential())
        .await
        .unwrap_err();
    assert_eq!(failure.message, "Invalid email or password.");
}

#[tokio::test]
async fn sign_in_retries_429_then_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(error_body("TOO_MANY_ATTEMPTS_TRY_LATER")),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(sign_in_success(serde_json::json!("3600")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let bundle = client.sign_in(&credential()).await.unwrap();
    assert_eq!(bundle.user_id, "uid-123");
    assert_eq!(client.breaker_state(), CircuitState::Closed);
}

#[tokio::test]
async fn sign_in_exhausts_retries_on_5xx() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend down"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server)
        .sign_in(&credential())
        .await
        .unwrap_err();
    assert_eq!(failure.kind, ErrorKind::TransientUpstreamFailure);
    assert!(!failure.message.contains("backend down"));
}

#[tokio::test]
async fn sign_in_missing_field_is_malformed_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "localId": "uid-123",
            "idToken": "header.payload.signature",
            "expiresIn": "3600"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server)
        .sign_in(&credential())
        .await
        .unwrap_err();
    assert_eq!(failure.kind, ErrorKind::MalformedProviderResponse);
}

#[tokio::test]
async fn sign_in_non_json_success_is_malformed_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server)
        .sign_in(&credential())
        .await
        .unwrap_err();
    assert_eq!(failure.kind, ErrorKind::MalformedProviderResponse);
}

#[tokio::test]
async fn sign_in_unreachable_provider_is_network_unavailable() {
    let config = ProviderConfig::local_mock("http://127.0.0.1:1", "demo-project").unwrap();
    let client = IdentityProvider::new(&config).unwrap().exchange();

    let failure = client.sign_in(&credential()).await.unwrap_err();
    assert_eq!(failure.kind, ErrorKind::NetworkUnavailable);
}

// ── POST /v1/accounts:signUp ─────────────────────────────────────────

#[tokio::test]
async fn sign_up_returns_bundle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(query_param("key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "identitytoolkit#SignupNewUserResponse",
            "idToken": "new.id.token",
            "email": "a@b.com",
            "refreshToken": "new-refresh",
            "expiresIn": "3600",
            "localId": "uid-new"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let bundle = test_client(&mock_server).sign_up(&credential()).await.unwrap();
    assert_eq!(bundle.user_id, "uid-new");
    assert_eq!(bundle.expires_in_secs, 3600);
}

#[tokio::test]
async fn sign_up_existing_email_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("EMAIL_EXISTS")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server)
        .sign_up(&credential())
        .await
        .unwrap_err();
    assert_eq!(
        failure.kind,
        ErrorKind::ProviderRejected(RejectionKind::EmailExists)
    );
}

#[tokio::test]
async fn sign_up_weak_password_detail_is_not_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body(
            "WEAK_PASSWORD : Password should be at least 6 characters",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server)
        .sign_up(&credential())
        .await
        .unwrap_err();
    assert_eq!(
        failure.kind,
        ErrorKind::ProviderRejected(RejectionKind::WeakPassword)
    );
    assert!(!failure.message.contains("6 characters"));
}

// ── POST /v1/token ───────────────────────────────────────────────────

#[tokio::test]
async fn refresh_posts_form_and_parses_snake_case() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(query_param("key", "test-api-key"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access",
            "expires_in": "3600",
            "token_type": "Bearer",
            "refresh_token": "refresh-next",
            "id_token": "next.id.token",
            "user_id": "uid-123",
            "project_id": "1234"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let bundle = test_client(&mock_server).refresh("refresh-abc").await.unwrap();
    assert_eq!(bundle.id_token, "next.id.token");
    assert_eq!(bundle.refresh_token, "refresh-next");
    assert_eq!(bundle.expires_in_secs, 3600);
    assert_eq!(bundle.user_id, "uid-123");
    assert!(bundle.email.is_none());
}

#[tokio::test]
async fn refresh_expired_token_maps_to_session_expired() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("TOKEN_EXPIRED")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server)
        .refresh("stale")
        .await
        .unwrap_err();
    assert_eq!(
        failure.kind,
        ErrorKind::ProviderRejected(RejectionKind::SessionExpired)
    );
}

#[tokio::test]
async fn refresh_blank_token_is_rejected_locally() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let failure = test_client(&mock_server).refresh("   ").await.unwrap_err();
    assert_eq!(failure.kind, ErrorKind::ValidationFailed);
    assert!(failure.message.starts_with("refreshToken"));
}

// ── revoke ───────────────────────────────────────────────────────────

#[tokio::test]
async fn revoke_is_an_advertised_no_op() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    assert!(!client.revocation_supported());
    let outcome = client.revoke("refresh-abc").await.unwrap();
    assert_eq!(outcome, Revocation::NotSupported);
    assert!(!outcome.is_revoked());
}
