// crates/member-gateway-core/src/core/errors.rs
// ============================================================================
// Module: Member Gateway Errors
// Description: Gateway-level error taxonomy shared by every surface.
// Purpose: Give callers a stable classification independent of adapters.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`GatewayError`] is the taxonomy surfaced to HTTP callers. Adapter-specific
//! failures live next to their interfaces and convert into this type at the
//! edge.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::PrincipalId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway error taxonomy.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No Authorization header was supplied.
    #[error("authorization header is not provided")]
    NoToken,
    /// Authorization header was not a bearer credential.
    #[error("Not a Bearer token")]
    MalformedHeader,
    /// Bearer token failed verification.
    #[error("{0}")]
    TokenInvalid(String),
    /// Principal attempted to act on another member.
    #[error("member id({caller}) is not allowed to perform action against member id({target})")]
    IdentityMismatch {
        /// Verified caller.
        caller: PrincipalId,
        /// Requested target.
        target: PrincipalId,
    },
    /// Upstream call exceeded its deadline.
    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),
    /// Upstream call failed.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// Query projection or inbound document was invalid.
    #[error("projection error: {0}")]
    Projection(String),
    /// Response envelope could not be encoded.
    #[error("envelope marshal error: {0}")]
    EnvelopeMarshal(String),
}

impl GatewayError {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoToken => "no_token",
            Self::MalformedHeader => "malformed_header",
            Self::TokenInvalid(_) => "token_invalid",
            Self::IdentityMismatch {
                ..
            } => "identity_mismatch",
            Self::UpstreamTimeout(_) => "upstream_timeout",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::Projection(_) => "projection",
            Self::EnvelopeMarshal(_) => "envelope_marshal",
        }
    }

    /// Returns true for authentication failures.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::NoToken | Self::MalformedHeader | Self::TokenInvalid(_))
    }
}
