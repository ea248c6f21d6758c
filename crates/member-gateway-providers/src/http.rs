// crates/member-gateway-providers/src/http.rs
// ============================================================================
// Module: Shared HTTP Helpers
// Description: Client construction and error body handling for adapters.
// Purpose: Keep deadline and excerpt rules identical across adapters.
// Dependencies: reqwest, serde
// ============================================================================

//! Shared reqwest client builder and upstream error excerpts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum error body excerpt carried in adapter errors.
pub const MAX_ERROR_EXCERPT: usize = 256;

/// User agent sent by every adapter.
const USER_AGENT: &str = concat!("member-gateway/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Client
// ============================================================================

/// Builds a client whose connect and total deadlines equal `timeout`.
///
/// # Errors
///
/// Returns a display string when the TLS backend cannot be initialized.
pub fn build_client(timeout: Duration) -> Result<Client, String> {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .build()
        .map_err(|err| format!("http client build failed: {err}"))
}

// ============================================================================
// SECTION: Error Bodies
// ============================================================================

/// Google-style `{"error": {"message": ...}}` body.
#[derive(Deserialize)]
struct ErrorEnvelope {
    /// Error detail.
    error: ErrorDetail,
}

/// Error detail within [`ErrorEnvelope`].
#[derive(Deserialize)]
struct ErrorDetail {
    /// Human-readable message.
    message: String,
}

/// Extracts a bounded message from an upstream error body.
///
/// Structured `{"error":{"message":..}}` bodies yield their message; any
/// other body is truncated to [`MAX_ERROR_EXCERPT`] characters.
pub fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<ErrorEnvelope>(body).map_or_else(|_| body.trim().to_string(), |parsed| parsed.error.message);
    message.chars().take(MAX_ERROR_EXCERPT).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_error_bodies_yield_message() {
        assert_eq!(error_message(r#"{"error":{"message":"ID token has been revoked"}}"#), "ID token has been revoked");
    }

    #[test]
    fn plain_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_EXCERPT * 2);
        assert_eq!(error_message(&body).len(), MAX_ERROR_EXCERPT);
    }
}
