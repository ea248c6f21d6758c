// crates/member-gateway-providers/src/lib.rs
// ============================================================================
// Module: Member Gateway Providers
// Description: HTTP adapters for the gateway's capability traits.
// Purpose: Connect the core runtime to the identity provider, metadata
//          store, member backend, and gateway credential material.
// Dependencies: member-gateway-core, reqwest, serde, tokio, url
// ============================================================================

//! ## Overview
//! Each adapter implements one capability trait from `member-gateway-core`
//! over a bounded HTTP client. Adapters never retry; deadlines and retry
//! policy belong to the caller.
//! Invariants:
//! - Transport timeouts map to the seam's timeout or unavailable variant.
//! - Error bodies are excerpted, never forwarded whole.
//! - Credentials are sent as bearer headers and never appear in errors.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod credential;
mod http;
pub mod identity;
pub mod metadata;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::HttpBackendGraphQl;
pub use credential::FileCredentialSource;
pub use credential::MAX_CREDENTIAL_FILE_BYTES;
pub use credential::StaticCredentialSource;
pub use identity::HttpIdentityConfig;
pub use identity::HttpIdentityProvider;
pub use metadata::HttpKeyValueStore;
pub use metadata::HttpMetadataConfig;
