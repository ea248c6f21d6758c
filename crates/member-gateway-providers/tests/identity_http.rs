// crates/member-gateway-providers/tests/identity_http.rs
// ============================================================================
// Module: HTTP Identity Provider Tests
// Description: Wire contract and error mapping for the identity adapter.
// Purpose: Ensure verification checks revocation and admin calls map errors.
// Dependencies: member-gateway-providers, member-gateway-core, tiny_http
// ============================================================================
//! ## Overview
//! Runs the identity adapter against a scripted local upstream.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::time::Duration;

use member_gateway_core::BearerToken;
use member_gateway_core::IdentityError;
use member_gateway_core::IdentityProvider;
use member_gateway_core::PrincipalId;
use member_gateway_core::TokenVerifier;
use member_gateway_providers::HttpIdentityConfig;
use member_gateway_providers::HttpIdentityProvider;
use serde_json::json;

use crate::common::FakeUpstream;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn provider(base_url: &str) -> HttpIdentityProvider {
    HttpIdentityProvider::new(HttpIdentityConfig {
        base_url: base_url.to_string(),
        credential: "admin-secret".to_string(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn verify_requests_revocation_check() {
    let upstream = FakeUpstream::start(vec![(200, json!({"uid": "u1"}).to_string())]);
    let principal = provider(&upstream.base_url).verify_token(&BearerToken::new("tok").unwrap()).await.unwrap();
    let observed = upstream.finish();

    assert_eq!(principal.id.as_str(), "u1");
    assert_eq!(observed[0].method, "POST");
    assert_eq!(observed[0].url, "/v1/tokens:verify");
    assert_eq!(observed[0].authorization.as_deref(), Some("Bearer admin-secret"));
    assert_eq!(observed[0].body, json!({"idToken": "tok", "checkRevoked": true}));
}

#[tokio::test]
async fn revoked_token_is_rejected_with_provider_message() {
    let upstream = FakeUpstream::start(vec![(401, json!({"error": {"message": "ID token has been revoked"}}).to_string())]);
    let err = provider(&upstream.base_url).verify_token(&BearerToken::new("tok").unwrap()).await.unwrap_err();
    upstream.finish();

    match err {
        IdentityError::Rejected(message) => assert_eq!(message, "ID token has been revoked"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn verify_server_error_is_unavailable() {
    let upstream = FakeUpstream::start(vec![(500, "boom".to_string())]);
    let err = provider(&upstream.base_url).verify_token(&BearerToken::new("tok").unwrap()).await.unwrap_err();
    upstream.finish();
    assert!(matches!(err, IdentityError::Unavailable(_)), "{err:?}");
}

#[tokio::test]
async fn admin_calls_use_user_paths() {
    let upstream = FakeUpstream::start(vec![
        (200, "{}".to_string()),
        (200, json!({"uid": "u 1", "tokensValidAfterMillis": 1_700_000_000_123_i64}).to_string()),
        (200, "{}".to_string()),
    ]);
    let provider = provider(&format!("{}/identity/", upstream.base_url));
    let id = PrincipalId::new("u 1");

    provider.revoke_refresh_tokens(&id).await.unwrap();
    let user = provider.get_user(&id).await.unwrap();
    provider.delete_user(&id).await.unwrap();
    let observed = upstream.finish();

    assert_eq!(user.tokens_valid_after_ms, 1_700_000_000_123);
    let calls: Vec<(String, String)> = observed.iter().map(|request| (request.method.clone(), request.url.clone())).collect();
    assert_eq!(calls, vec![
        ("POST".to_string(), "/identity/v1/users/u%201:revokeRefreshTokens".to_string()),
        ("GET".to_string(), "/identity/v1/users/u%201".to_string()),
        ("DELETE".to_string(), "/identity/v1/users/u%201".to_string()),
    ]);
}

#[tokio::test]
async fn missing_user_maps_to_not_found() {
    let upstream = FakeUpstream::start(vec![(404, json!({"error": {"message": "USER_NOT_FOUND"}}).to_string())]);
    let err = provider(&upstream.base_url).get_user(&PrincipalId::new("ghost")).await.unwrap_err();
    upstream.finish();
    assert!(matches!(err, IdentityError::NotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn invalid_base_url_is_rejected() {
    let result = HttpIdentityProvider::new(HttpIdentityConfig {
        base_url: "not a url".to_string(),
        credential: "admin-secret".to_string(),
        request_timeout: Duration::from_secs(1),
    });
    assert!(result.is_err());
}
