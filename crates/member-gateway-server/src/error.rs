// crates/member-gateway-server/src/error.rs
// ============================================================================
// Module: Server Errors
// Description: Error reply body, status mapping, and bootstrap errors.
// Purpose: Give every failed request the same structured body.
// Dependencies: axum, member-gateway-core, serde, thiserror
// ============================================================================

//! ## Overview
//! Failed requests answer with `{"errors":[{"message": ..}]}`. Status codes
//! follow the error taxonomy: authentication and identity failures are 403,
//! projection problems 400, upstream timeouts 504, and other upstream
//! failures 502.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use member_gateway_core::GatewayError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Error Reply
// ============================================================================

/// One error entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    /// Human-readable message.
    pub message: String,
    /// Response path of the failed field, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

/// Structured error body with the status it is sent with.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    /// HTTP status.
    #[serde(skip)]
    pub status: StatusCode,
    /// Error entries; never empty.
    pub errors: Vec<ErrorEntry>,
    /// Partial data, present on GraphQL field errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorReply {
    /// Builds a single-message reply.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            errors: vec![ErrorEntry {
                message: message.into(),
                path: None,
            }],
            data: None,
        }
    }

    /// Builds a reply from a gateway error using its mapped status.
    #[must_use]
    pub fn from_gateway(err: &GatewayError) -> Self {
        Self::new(status_for(err), err.to_string())
    }

    /// Attaches a field path and null data for that field.
    #[must_use]
    pub fn at_field(mut self, field: &str) -> Self {
        for entry in &mut self.errors {
            entry.path = Some(vec![field.to_string()]);
        }
        let mut data = serde_json::Map::new();
        data.insert(field.to_string(), Value::Null);
        self.data = Some(Value::Object(data));
        self
    }
}

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Maps a gateway error to its HTTP status.
#[must_use]
pub const fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::NoToken
        | GatewayError::MalformedHeader
        | GatewayError::TokenInvalid(_)
        | GatewayError::IdentityMismatch {
            ..
        } => StatusCode::FORBIDDEN,
        GatewayError::Projection(_) => StatusCode::BAD_REQUEST,
        GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::UpstreamUnavailable(_) | GatewayError::EnvelopeMarshal(_) => StatusCode::BAD_GATEWAY,
    }
}

// ============================================================================
// SECTION: Server Errors
// ============================================================================

/// Gateway server bootstrap and transport errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum GatewayServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use member_gateway_core::PrincipalId;

    use super::*;

    #[test]
    fn auth_failures_are_forbidden() {
        assert_eq!(status_for(&GatewayError::NoToken), StatusCode::FORBIDDEN);
        let mismatch = GatewayError::IdentityMismatch {
            caller: PrincipalId::new("a"),
            target: PrincipalId::new("b"),
        };
        assert_eq!(status_for(&mismatch), StatusCode::FORBIDDEN);
    }

    #[test]
    fn upstream_failures_map_to_gateway_statuses() {
        assert_eq!(status_for(&GatewayError::UpstreamTimeout("x".to_string())), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(&GatewayError::UpstreamUnavailable("x".to_string())), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn field_errors_carry_path_and_null_data() {
        let reply = ErrorReply::new(StatusCode::FORBIDDEN, "denied").at_field("member");
        let body = serde_json::to_value(&reply).unwrap_or(Value::Null);
        assert_eq!(body, serde_json::json!({"errors": [{"message": "denied", "path": ["member"]}], "data": {"member": null}}));
    }
}
