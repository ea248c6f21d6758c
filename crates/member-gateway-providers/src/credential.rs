// crates/member-gateway-providers/src/credential.rs
// ============================================================================
// Module: Gateway Credential Sources
// Description: Static and file-backed sources for the backend credential.
// Purpose: Supply GatewayCredentialHandle with the gateway's service token.
// Dependencies: member-gateway-core, serde, tokio
// ============================================================================

//! ## Overview
//! The file source reads a small JSON document written by the secret
//! manager sidecar:
//!
//! ```json
//! { "token": "<jwt>", "refreshToken": "<opaque>" }
//! ```
//!
//! The file is read on every fetch; the handle above it decides how often
//! that happens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use async_trait::async_trait;
use member_gateway_core::BearerToken;
use member_gateway_core::CredentialError;
use member_gateway_core::CredentialSource;
use member_gateway_core::GatewayCredential;
use serde::Deserialize;
use tokio::io::AsyncReadExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum credential file size in bytes.
pub const MAX_CREDENTIAL_FILE_BYTES: u64 = 64 * 1024;

// ============================================================================
// SECTION: Static Source
// ============================================================================

/// Credential fixed at construction.
pub struct StaticCredentialSource {
    /// Access token.
    token: String,
    /// Optional refresh token.
    refresh_token: Option<String>,
}

impl StaticCredentialSource {
    /// Creates a source that always returns `token`.
    #[must_use]
    pub fn new(token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            token: token.into(),
            refresh_token,
        }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn fetch(&self) -> Result<GatewayCredential, CredentialError> {
        let token = BearerToken::new(self.token.clone()).ok_or_else(|| CredentialError::Invalid("empty token".to_string()))?;
        Ok(GatewayCredential::new(token, self.refresh_token.clone()))
    }
}

// ============================================================================
// SECTION: File Source
// ============================================================================

/// Credential document on disk.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialDocument {
    /// Access token.
    token: String,
    /// Optional refresh token.
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Credential read from a JSON file.
pub struct FileCredentialSource {
    /// Credential file path.
    path: PathBuf,
}

impl FileCredentialSource {
    /// Creates a source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for FileCredentialSource {
    async fn fetch(&self) -> Result<GatewayCredential, CredentialError> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|err| CredentialError::Io(format!("{}: {err}", self.path.display())))?;
        let mut bytes = Vec::new();
        file.take(MAX_CREDENTIAL_FILE_BYTES + 1)
            .read_to_end(&mut bytes)
            .await
            .map_err(|err| CredentialError::Io(format!("{}: {err}", self.path.display())))?;
        if bytes.len() as u64 > MAX_CREDENTIAL_FILE_BYTES {
            return Err(CredentialError::Invalid("credential file exceeds size limit".to_string()));
        }
        let document: CredentialDocument =
            serde_json::from_slice(&bytes).map_err(|err| CredentialError::Invalid(format!("credential file is not valid json: {err}")))?;
        let token = BearerToken::new(document.token).ok_or_else(|| CredentialError::Invalid("empty token".to_string()))?;
        Ok(GatewayCredential::new(token, document.refresh_token))
    }
}
