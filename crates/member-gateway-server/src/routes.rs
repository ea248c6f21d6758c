// crates/member-gateway-server/src/routes.rs
// ============================================================================
// Module: Gateway Routes
// Description: Router assembly and request handlers.
// Purpose: Bind the gateway's HTTP surface to its handlers and middleware.
// Dependencies: axum, bytes, member-gateway-core, serde_json
// ============================================================================

//! ## Overview
//! Every API route runs behind [`attach_token`]. The member GraphQL route is
//! additionally guarded by [`require_identity`]. `/health` is registered
//! after the layers so health checks never touch the token machinery.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::any;
use axum::routing::get;
use axum::routing::post;
use bytes::Bytes;
use serde_json::Value;
use serde_json::json;

use crate::auth::AuthenticatedCaller;
use crate::auth::CallerToken;
use crate::auth::HEALTH_PATH;
use crate::auth::LEGACY_PREFIX;
use crate::auth::MEMBER_GRAPHQL_PATH;
use crate::auth::TOKEN_STATE_PATH;
use crate::auth::attach_token;
use crate::auth::require_identity;
use crate::error::ErrorReply;
use crate::member_api::GraphQlBody;
use crate::member_api::execute;
use crate::state::GatewayState;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the gateway router.
pub fn build_router(state: Arc<GatewayState>, max_body_bytes: usize) -> Router {
    let protected = Router::new()
        .route(MEMBER_GRAPHQL_PATH, post(member_graphql))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), require_identity));

    Router::new()
        .route(TOKEN_STATE_PATH, get(token_state))
        .route(LEGACY_PREFIX, any(legacy_proxy))
        .route("/api/v0/", any(legacy_proxy))
        .route("/api/v0/{*path}", any(legacy_proxy))
        .merge(protected)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), attach_token))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Liveness check.
async fn health() -> StatusCode {
    StatusCode::OK
}

/// Reports the caller's token state.
async fn token_state(CallerToken(cache): CallerToken) -> Json<Value> {
    let state = cache.state().await;
    Json(json!({ "tokenState": state.label() }))
}

/// Serves the member GraphQL endpoint.
async fn member_graphql(
    State(state): State<Arc<GatewayState>>,
    CallerToken(cache): CallerToken,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    body: Bytes,
) -> Response {
    let body: GraphQlBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(err) => {
            return ErrorReply::new(StatusCode::BAD_REQUEST, format!("invalid request body: {err}")).into_response();
        }
    };
    match execute(&state, &caller, &cache, body).await {
        Ok(value) => Json(value).into_response(),
        Err(reply) => reply.into_response(),
    }
}

/// Forwards legacy REST traffic through the mediator.
async fn legacy_proxy(
    State(state): State<Arc<GatewayState>>,
    CallerToken(cache): CallerToken,
    request: Request,
) -> Response {
    match state.mediator.forward(request, Some(cache.as_ref())).await {
        Ok(response) => response,
        Err(err) => err.reply().into_response(),
    }
}
