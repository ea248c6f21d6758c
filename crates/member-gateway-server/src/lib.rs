// crates/member-gateway-server/src/lib.rs
// ============================================================================
// Module: Member Gateway Server Library
// Description: HTTP surface of the member gateway.
// Purpose: Expose the router, middleware, mediator, and server bootstrap.
// Dependencies: crate::{auth, error, graphql, member_api, proxy, routes, server, state}
// ============================================================================

//! ## Overview
//! The server crate turns the core building blocks into an axum application:
//! token middleware, the legacy reverse proxy with response envelopes, the
//! member GraphQL endpoint, and the process-level wiring that runs the
//! deletion subscriber next to the listener.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod error;
pub mod graphql;
pub mod member_api;
pub mod proxy;
pub mod routes;
pub mod server;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AuthenticatedCaller;
pub use auth::CallerToken;
pub use auth::attach_token;
pub use auth::require_identity;
pub use auth::route_kind;
pub use error::ErrorEntry;
pub use error::ErrorReply;
pub use error::GatewayServerError;
pub use error::status_for;
pub use graphql::ParseError;
pub use graphql::parse_operation;
pub use member_api::GraphQlBody;
pub use member_api::MEMBER_FIELDS;
pub use proxy::ProxyError;
pub use proxy::RequestMediator;
pub use proxy::envelope;
pub use proxy::rewrite_target;
pub use proxy::single_joining_slash;
pub use routes::build_router;
pub use server::GatewayServer;
pub use state::GatewayState;
