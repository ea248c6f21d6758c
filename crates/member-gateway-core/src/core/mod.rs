// crates/member-gateway-core/src/core/mod.rs
// ============================================================================
// Module: Member Gateway Core Types
// Description: Identifiers, token model, credentials, events, and errors.
// Purpose: Group the data model shared by runtime and adapters.
// Dependencies: crate::core::*
// ============================================================================

//! ## Overview
//! Core types carry no I/O. Everything here is safe to construct in tests and
//! adapters without a runtime.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credential;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credential::CredentialState;
pub use credential::GatewayCredential;
pub use credential::classify_jwt;
pub use errors::GatewayError;
pub use events::DeletionEvent;
pub use events::EventDecodeError;
pub use events::MemberAction;
pub use events::now_epoch_ms;
pub use identifiers::AckId;
pub use identifiers::MessageId;
pub use identifiers::PrincipalId;
pub use token::BearerToken;
pub use token::HeaderClass;
pub use token::Principal;
pub use token::TOKEN_STATE_MALFORMED;
pub use token::TOKEN_STATE_NO_TOKEN;
pub use token::TOKEN_STATE_OK;
pub use token::TOKEN_STATE_UNAVAILABLE;
pub use token::TOKEN_STATE_UNCHECKED;
pub use token::TokenState;
pub use token::classify_authorization;
pub use token::ensure_identity_match;
