// crates/member-gateway-server/tests/server_lifecycle.rs
// ============================================================================
// Module: Server Lifecycle Tests
// Description: Configuration wiring, startup posture events, and shutdown.
// Purpose: Ensure the server builds from TOML and stops on cancellation.
// Dependencies: member-gateway-server, member-gateway-config, tempfile, tokio
// ============================================================================
//! ## Overview
//! Builds the server from the canonical example with local overrides.

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

use std::fs;
use std::time::Duration;

use member_gateway_config::GatewayConfig;
use member_gateway_config::config_toml_example;
use member_gateway_server::GatewayServer;
use member_gateway_server::GatewayServerError;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn local_config(audit_path: &str) -> GatewayConfig {
    let toml = config_toml_example()
        .replace("https://legacy.example.internal/api", "http://127.0.0.1:9/api")
        .replace("sink = \"stderr\"", &format!("sink = \"file\"\npath = {audit_path:?}"));
    GatewayConfig::from_toml(&toml).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn serves_until_cancelled() {
    let dir = TempDir::new().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let server = GatewayServer::from_config(local_config(audit_path.to_str().unwrap())).await.unwrap();

    let log = fs::read_to_string(&audit_path).unwrap();
    assert!(log.contains("\"kind\":\"legacy_plaintext\""), "{log}");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.serve_listener(listener, shutdown.clone()));

    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn invalid_configuration_is_rejected() {
    let mut config = local_config("/tmp/unused.jsonl");
    config.broker.workers = 0;
    let err = GatewayServer::from_config(config).await.err().unwrap();
    assert!(matches!(err, GatewayServerError::Config(_)), "{err:?}");
}

#[tokio::test]
async fn missing_identity_credential_file_fails_init() {
    let dir = TempDir::new().unwrap();
    let mut config = local_config(dir.path().join("audit.jsonl").to_str().unwrap());
    config.identity.credential_token = None;
    config.identity.credential_path = Some(dir.path().join("absent.json").to_string_lossy().into_owned());
    let err = GatewayServer::from_config(config).await.err().unwrap();
    assert!(matches!(err, GatewayServerError::Init(message) if message.contains("identity credential")));
}
