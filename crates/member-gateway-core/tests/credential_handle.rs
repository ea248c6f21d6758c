// crates/member-gateway-core/tests/credential_handle.rs
// ============================================================================
// Module: Gateway Credential Handle Tests
// Description: Single-flight fetch and retry-after-failure semantics.
// Purpose: Ensure the backend credential is fetched once and audited.
// ============================================================================
//! ## Overview
//! Drives [`GatewayCredentialHandle`] with a counting credential source.

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

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use member_gateway_core::BearerToken;
use member_gateway_core::CredentialError;
use member_gateway_core::CredentialSource;
use member_gateway_core::CredentialState;
use member_gateway_core::GatewayCredential;
use member_gateway_core::GatewayCredentialHandle;

use crate::common::RecordingAudit;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Source that fails the first `failures` fetches, then returns a token.
struct FlakySource {
    calls: AtomicUsize,
    failures: usize,
}

#[async_trait]
impl CredentialSource for FlakySource {
    async fn fetch(&self) -> Result<GatewayCredential, CredentialError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if call < self.failures {
            return Err(CredentialError::Io("credential file missing".to_string()));
        }
        Ok(GatewayCredential::new(BearerToken::new("service-token").unwrap(), None))
    }
}

fn handle(failures: usize) -> (Arc<FlakySource>, Arc<RecordingAudit>, Arc<GatewayCredentialHandle>) {
    let source = Arc::new(FlakySource {
        calls: AtomicUsize::new(0),
        failures,
    });
    let audit = Arc::new(RecordingAudit::default());
    let handle = Arc::new(GatewayCredentialHandle::new(source.clone(), audit.clone()));
    (source, audit, handle)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_fetch() {
    let (source, audit, handle) = handle(0);
    let mut tasks = Vec::new();
    for _ in 0 .. 8 {
        let handle = Arc::clone(&handle);
        tasks.push(tokio::spawn(async move { handle.get().await.map(|credential| credential.token().as_str().to_string()) }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), "service-token");
    }
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(audit.security_messages(), vec!["that's not even a token".to_string()]);
}

#[tokio::test]
async fn failed_fetch_is_retried_by_next_caller() {
    let (source, audit, handle) = handle(1);
    assert!(matches!(handle.get().await, Err(CredentialError::Io(_))));
    assert!(handle.state_at(0).is_none());

    handle.get().await.unwrap();
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert!(matches!(handle.state_at(0), Some(CredentialState::NotAToken)));
    assert_eq!(audit.security_messages().len(), 2);
}
