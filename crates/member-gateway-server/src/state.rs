// crates/member-gateway-server/src/state.rs
// ============================================================================
// Module: Gateway State
// Description: Shared dependencies handed to every request handler.
// Purpose: Keep request handling free of globals.
// Dependencies: member-gateway-core
// ============================================================================

//! ## Overview
//! [`GatewayState`] bundles the verifier, backend client, deletion
//! coordinator, legacy mediator, and audit sink behind one `Arc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use member_gateway_core::BackendGraphQl;
use member_gateway_core::GatewayAuditSink;
use member_gateway_core::MemberDeletionCoordinator;
use member_gateway_core::TokenVerifier;

use crate::proxy::RequestMediator;

// ============================================================================
// SECTION: State
// ============================================================================

/// Dependencies shared by the router, middleware, and handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Verifier consulted by per-request token caches.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Member backend client.
    pub backend: Arc<dyn BackendGraphQl>,
    /// Member deletion workflow.
    pub coordinator: Arc<MemberDeletionCoordinator>,
    /// Legacy reverse proxy.
    pub mediator: Arc<RequestMediator>,
    /// Audit sink.
    pub audit: Arc<dyn GatewayAuditSink>,
    /// Token verification deadline.
    pub verify_timeout: Duration,
    /// Member GraphQL call deadline.
    pub graphql_timeout: Duration,
}
