// crates/member-gateway-server/src/auth.rs
// ============================================================================
// Module: Token Middleware
// Description: Per-request token cache attachment and identity enforcement.
// Purpose: Give every handler lazy access to the caller's verified identity.
// Dependencies: axum, member-gateway-core
// ============================================================================

//! ## Overview
//! [`attach_token`] runs on every API route. It never rejects: it stores an
//! `Arc<TokenCache>` in the request extensions and records one request audit
//! event once the response is ready. [`require_identity`] guards protected
//! routes by resolving the cache and answering 403 with the token state text
//! when no valid principal is present.
//!
//! Security posture: the bearer token is treated as untrusted until the
//! verifier confirms it; audit records carry only its fingerprint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use member_gateway_core::AuthAuditEvent;
use member_gateway_core::GatewayError;
use member_gateway_core::Principal;
use member_gateway_core::RequestAuditEvent;
use member_gateway_core::RequestAuditEventParams;
use member_gateway_core::TokenCache;

use crate::error::ErrorReply;
use crate::state::GatewayState;

// ============================================================================
// SECTION: Route Kinds
// ============================================================================

/// Liveness check path.
pub const HEALTH_PATH: &str = "/health";
/// Token state report path.
pub const TOKEN_STATE_PATH: &str = "/api/v1/tokenState";
/// Member GraphQL endpoint path.
pub const MEMBER_GRAPHQL_PATH: &str = "/api/v1/graphql/user";
/// Legacy proxy route prefix.
pub const LEGACY_PREFIX: &str = "/api/v0";

/// Classifies a request path for audit records.
#[must_use]
pub fn route_kind(path: &str) -> &'static str {
    match path {
        HEALTH_PATH => "health",
        TOKEN_STATE_PATH => "token_state",
        MEMBER_GRAPHQL_PATH => "member_graphql",
        _ if path == LEGACY_PREFIX || path.starts_with("/api/v0/") => "legacy_proxy",
        _ => "unmatched",
    }
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Attaches a token cache to the request and audits the response.
pub async fn attach_token(State(state): State<Arc<GatewayState>>, mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let authorization = request.headers().get(header::AUTHORIZATION).map(|value| value.as_bytes().to_vec());
    let cache = Arc::new(TokenCache::new(
        authorization.as_deref(),
        Arc::clone(&state.verifier),
        state.verify_timeout,
    ));
    request.extensions_mut().insert(Arc::clone(&cache));

    let response = next.run(request).await;

    let event = RequestAuditEvent::new(RequestAuditEventParams {
        method,
        route: route_kind(&path),
        path,
        status: response.status().as_u16(),
        latency_ms: started.elapsed().as_millis(),
        token_fingerprint: cache.fingerprint(),
        token_state: cache.peek().label().to_string(),
    });
    state.audit.record_request(&event);
    response
}

/// Rejects requests without a verified principal.
///
/// On success the [`Principal`] is inserted into the request extensions.
pub async fn require_identity(State(state): State<Arc<GatewayState>>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let Some(cache) = request.extensions().get::<Arc<TokenCache>>().cloned() else {
        return ErrorReply::from_gateway(&GatewayError::NoToken).into_response();
    };
    match cache.principal().await {
        Ok(principal) => {
            state.audit.record_auth(&AuthAuditEvent::new(
                path,
                Some(principal.id.to_string()),
                cache.peek().label(),
                cache.fingerprint(),
            ));
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => {
            state.audit.record_auth(&AuthAuditEvent::new(path, None, cache.peek().label(), cache.fingerprint()));
            ErrorReply::new(StatusCode::FORBIDDEN, err.to_string()).into_response()
        }
    }
}

// ============================================================================
// SECTION: Extractors
// ============================================================================

/// Token cache attached by [`attach_token`].
pub struct CallerToken(pub Arc<TokenCache>);

impl<S: Send + Sync> FromRequestParts<S> for CallerToken {
    type Rejection = ErrorReply;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<TokenCache>>()
            .cloned()
            .map(Self)
            .ok_or_else(|| ErrorReply::new(StatusCode::INTERNAL_SERVER_ERROR, "token cache missing"))
    }
}

/// Principal verified by [`require_identity`].
pub struct AuthenticatedCaller(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedCaller {
    type Rejection = ErrorReply;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Self)
            .ok_or_else(|| ErrorReply::from_gateway(&GatewayError::NoToken))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_kinds_cover_the_surface() {
        assert_eq!(route_kind("/health"), "health");
        assert_eq!(route_kind("/api/v1/tokenState"), "token_state");
        assert_eq!(route_kind("/api/v1/graphql/user"), "member_graphql");
        assert_eq!(route_kind("/api/v0"), "legacy_proxy");
        assert_eq!(route_kind("/api/v0/members/1"), "legacy_proxy");
        assert_eq!(route_kind("/api/v0x"), "unmatched");
    }
}
