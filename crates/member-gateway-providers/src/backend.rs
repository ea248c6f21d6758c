// crates/member-gateway-providers/src/backend.rs
// ============================================================================
// Module: HTTP Member Backend Client
// Description: BackendGraphQl over HTTP POST with JSON bodies.
// Purpose: Run projected member documents with the caller's or the
//          gateway's credential.
// Dependencies: member-gateway-core, reqwest, serde
// ============================================================================

//! ## Overview
//! Requests are `POST {endpoint}` with `{"query": .., "variables": ..}`.
//! Responses follow the GraphQL-over-HTTP shape: a `data` object plus an
//! optional `errors` list. Any error whose message reports a missing record,
//! or whose `extensions.code` is `NOT_FOUND`, maps to
//! [`BackendError::NotFound`] so idempotent deletes can treat it as done.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use member_gateway_core::BackendAuth;
use member_gateway_core::BackendError;
use member_gateway_core::BackendGraphQl;
use member_gateway_core::GatewayCredentialHandle;
use member_gateway_core::GraphQlRequest;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::http::build_client;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Request body.
#[derive(Serialize)]
struct RequestBody<'a> {
    /// Document text.
    query: &'a str,
    /// Bound variables.
    variables: &'a Map<String, Value>,
}

/// Response body.
#[derive(Deserialize)]
struct ResponseBody {
    /// Result data.
    #[serde(default)]
    data: Option<Value>,
    /// Execution errors.
    #[serde(default)]
    errors: Vec<WireError>,
}

/// One GraphQL error.
#[derive(Deserialize)]
struct WireError {
    /// Error message.
    #[serde(default)]
    message: String,
    /// Optional extensions.
    #[serde(default)]
    extensions: Option<WireExtensions>,
}

/// Error extensions.
#[derive(Deserialize)]
struct WireExtensions {
    /// Machine-readable code.
    #[serde(default)]
    code: Option<String>,
}

impl WireError {
    /// Returns true when the error reports a missing record.
    fn is_not_found(&self) -> bool {
        self.extensions.as_ref().and_then(|extensions| extensions.code.as_deref()) == Some("NOT_FOUND")
            || self.message.to_ascii_lowercase().contains("not found")
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP member backend client.
pub struct HttpBackendGraphQl {
    /// HTTP client with deadlines applied.
    client: Client,
    /// GraphQL endpoint.
    endpoint: String,
    /// Gateway credential for trusted calls.
    credential: Arc<GatewayCredentialHandle>,
}

impl HttpBackendGraphQl {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] when the HTTP client cannot be
    /// built.
    pub fn new(
        endpoint: impl Into<String>,
        credential: Arc<GatewayCredentialHandle>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client(timeout).map_err(BackendError::Unavailable)?,
            endpoint: endpoint.into(),
            credential,
        })
    }
}

#[async_trait]
impl BackendGraphQl for HttpBackendGraphQl {
    async fn run(&self, request: &GraphQlRequest, auth: &BackendAuth) -> Result<Value, BackendError> {
        let token = match auth {
            BackendAuth::Gateway => self.credential.get().await?.token().as_str(),
            BackendAuth::Caller(token) => token.as_str(),
        };
        let body = RequestBody {
            query: &request.document,
            variables: &request.variables,
        };
        let response = self.client.post(&self.endpoint).bearer_auth(token).json(&body).send().await.map_err(|err| {
            if err.is_timeout() { BackendError::Timeout } else { BackendError::Unavailable(err.to_string()) }
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|err| BackendError::Unavailable(err.to_string()))?;
        let parsed = serde_json::from_str::<ResponseBody>(&text);
        if !status.is_success() {
            // GraphQL servers often pair 4xx with a well-formed errors list.
            return Err(match parsed {
                Ok(body) if !body.errors.is_empty() => classify_errors(body.errors),
                _ => BackendError::Status(status.as_u16()),
            });
        }
        let body = parsed.map_err(|err| BackendError::Decode(err.to_string()))?;
        if !body.errors.is_empty() {
            return Err(classify_errors(body.errors));
        }
        match body.data {
            Some(data @ Value::Object(_)) => Ok(data),
            _ => Err(BackendError::Decode("response carried no data object".to_string())),
        }
    }
}

/// Converts a non-empty error list to a backend error.
fn classify_errors(errors: Vec<WireError>) -> BackendError {
    if let Some(missing) = errors.iter().find(|error| error.is_not_found()) {
        return BackendError::NotFound(missing.message.clone());
    }
    BackendError::GraphQl(errors.into_iter().map(|error| error.message).collect())
}
