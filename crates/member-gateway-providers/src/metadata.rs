// crates/member-gateway-providers/src/metadata.rs
// ============================================================================
// Module: HTTP Metadata Store
// Description: KeyValueStore backed by a JSON-over-REST tree database.
// Purpose: Persist member side metadata such as revocation timestamps.
// Dependencies: member-gateway-core, reqwest, url
// ============================================================================

//! ## Overview
//! Keys are slash-separated paths; `set("metadata/u1", v)` issues
//! `PUT {base}/metadata/u1.json` with `v` as the body, replacing the node.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use member_gateway_core::KeyValueStore;
use member_gateway_core::MetadataError;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::http::build_client;
use crate::http::error_message;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Metadata adapter configuration.
#[derive(Clone)]
pub struct HttpMetadataConfig {
    /// Database base URL.
    pub base_url: String,
    /// Optional bearer token.
    pub auth_token: Option<String>,
    /// Per-request deadline.
    pub request_timeout: Duration,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// REST key/value store adapter.
pub struct HttpKeyValueStore {
    /// HTTP client with deadlines applied.
    client: Client,
    /// Parsed base URL.
    base_url: Url,
    /// Optional bearer token.
    auth_token: Option<String>,
}

impl HttpKeyValueStore {
    /// Builds the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Unavailable`] when the base URL is invalid or
    /// the client cannot be built.
    pub fn new(config: HttpMetadataConfig) -> Result<Self, MetadataError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| MetadataError::Unavailable(format!("invalid base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(MetadataError::Unavailable("base url cannot carry a path".to_string()));
        }
        Ok(Self {
            client: build_client(config.request_timeout).map_err(MetadataError::Unavailable)?,
            base_url,
            auth_token: config.auth_token,
        })
    }

    /// Builds the node URL for `key`.
    fn node_url(&self, key: &str) -> Result<Url, MetadataError> {
        let segments: Vec<&str> = key.split('/').filter(|segment| !segment.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(MetadataError::Rejected("empty key".to_string()));
        };
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(parents);
            path.push(&format!("{last}.json"));
        }
        Ok(url)
    }
}

#[async_trait]
impl KeyValueStore for HttpKeyValueStore {
    async fn set(&self, key: &str, value: Value) -> Result<(), MetadataError> {
        let mut request = self.client.put(self.node_url(key)?).json(&value);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|err| MetadataError::Unavailable(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = format!("status {}: {}", status.as_u16(), error_message(&response.text().await.unwrap_or_default()));
        if status.is_server_error() { Err(MetadataError::Unavailable(message)) } else { Err(MetadataError::Rejected(message)) }
    }
}
