// crates/member-gateway-core/src/core/token.rs
// ============================================================================
// Module: Member Gateway Token Model
// Description: Bearer token parsing, token state, and authenticated principals.
// Purpose: Classify inbound Authorization headers without network access.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! Header classification is total: every header value maps to one of
//! [`HeaderClass::Missing`], [`HeaderClass::Malformed`], or
//! [`HeaderClass::Bearer`]. Verification happens later and only for bearer
//! tokens.
//!
//! Security posture: header values are untrusted. Raw tokens never appear in
//! `Debug` output; audit records use [`BearerToken::fingerprint`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::core::errors::GatewayError;
use crate::core::identifiers::PrincipalId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Label reported for a verified token.
pub const TOKEN_STATE_OK: &str = "OK";
/// Label reported when the Authorization header is absent or empty.
pub const TOKEN_STATE_NO_TOKEN: &str = "authorization header is not provided";
/// Label reported when the Authorization header is not a bearer credential.
pub const TOKEN_STATE_MALFORMED: &str = "Not a Bearer token";
/// Label reported before verification has resolved.
pub const TOKEN_STATE_UNCHECKED: &str = "unchecked";
/// Label embedded in proxied envelopes when no token cache is attached.
pub const TOKEN_STATE_UNAVAILABLE: &str = "No Bearer token available";

/// Case-sensitive scheme prefix required on bearer credentials.
const BEARER_PREFIX: &str = "Bearer ";
/// Maximum Authorization header size accepted before classification.
const MAX_AUTHORIZATION_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Bearer Token
// ============================================================================

/// Opaque bearer credential taken from an Authorization header.
///
/// # Invariants
/// - Never empty.
/// - `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw token value, rejecting blank strings.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() { None } else { Some(Self(token)) }
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short SHA-256 fingerprint suitable for audit records.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut out = String::with_capacity(16);
        for byte in digest.iter().take(8) {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BearerToken").field(&"<redacted>").finish()
    }
}

// ============================================================================
// SECTION: Header Classification
// ============================================================================

/// Result of classifying an Authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderClass {
    /// Header absent or empty.
    Missing,
    /// Header present but not `Bearer <token>`.
    Malformed,
    /// Header carried a bearer token.
    Bearer(BearerToken),
}

/// Classifies raw Authorization header bytes.
///
/// The scheme match is case-sensitive on `Bearer ` followed by a non-blank
/// token. Non-UTF-8 and oversized values classify as malformed.
#[must_use]
pub fn classify_authorization(header: Option<&[u8]>) -> HeaderClass {
    let Some(raw) = header else {
        return HeaderClass::Missing;
    };
    if raw.is_empty() {
        return HeaderClass::Missing;
    }
    if raw.len() > MAX_AUTHORIZATION_BYTES {
        return HeaderClass::Malformed;
    }
    let Ok(value) = std::str::from_utf8(raw) else {
        return HeaderClass::Malformed;
    };
    value
        .strip_prefix(BEARER_PREFIX)
        .and_then(|token| BearerToken::new(token.trim()))
        .map_or(HeaderClass::Malformed, HeaderClass::Bearer)
}

// ============================================================================
// SECTION: Principal
// ============================================================================

/// Verified identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Identity-provider subject.
    pub id: PrincipalId,
}

impl Principal {
    /// Creates a principal for the given subject.
    #[must_use]
    pub fn new(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
        }
    }
}

/// Ensures a verified principal is acting on its own member record.
///
/// # Errors
///
/// Returns [`GatewayError::IdentityMismatch`] when `target` differs from the
/// principal's subject.
pub fn ensure_identity_match(principal: &Principal, target: &PrincipalId) -> Result<(), GatewayError> {
    if &principal.id == target {
        Ok(())
    } else {
        Err(GatewayError::IdentityMismatch {
            caller: principal.id.clone(),
            target: target.clone(),
        })
    }
}

// ============================================================================
// SECTION: Token State
// ============================================================================

/// Verification state of a request's bearer credential.
///
/// # Invariants
/// - `NoToken` and `MalformedHeader` are fixed at creation.
/// - `Valid` and `Invalid` are terminal once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// Verification has not completed yet.
    Unchecked,
    /// Token verified and not revoked.
    Valid(Principal),
    /// Verification failed with the given reason.
    Invalid(String),
    /// No Authorization header was supplied.
    NoToken,
    /// Authorization header was not a bearer credential.
    MalformedHeader,
}

impl TokenState {
    /// Returns the human-readable label reported to clients.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Unchecked => TOKEN_STATE_UNCHECKED,
            Self::Valid(_) => TOKEN_STATE_OK,
            Self::Invalid(reason) => reason,
            Self::NoToken => TOKEN_STATE_NO_TOKEN,
            Self::MalformedHeader => TOKEN_STATE_MALFORMED,
        }
    }

    /// Returns the principal for a valid state.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Valid(principal) => Some(principal),
            _ => None,
        }
    }

    /// Converts the state into a verified principal or an auth failure.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] for every non-valid state.
    pub fn into_principal(self) -> Result<Principal, GatewayError> {
        match self {
            Self::Valid(principal) => Ok(principal),
            Self::NoToken => Err(GatewayError::NoToken),
            Self::MalformedHeader => Err(GatewayError::MalformedHeader),
            Self::Invalid(reason) => Err(GatewayError::TokenInvalid(reason)),
            Self::Unchecked => Err(GatewayError::TokenInvalid(TOKEN_STATE_UNCHECKED.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    #[test]
    fn missing_and_empty_headers_are_no_token() {
        assert_eq!(classify_authorization(None), HeaderClass::Missing);
        assert_eq!(classify_authorization(Some(b"".as_slice())), HeaderClass::Missing);
    }

    #[test]
    fn scheme_match_is_case_sensitive() {
        assert_eq!(classify_authorization(Some(b"bearer abc".as_slice())), HeaderClass::Malformed);
        assert_eq!(classify_authorization(Some(b"Basic abc".as_slice())), HeaderClass::Malformed);
        assert_eq!(classify_authorization(Some(b"Bearer   ".as_slice())), HeaderClass::Malformed);
    }

    #[test]
    fn bearer_header_yields_token() {
        let HeaderClass::Bearer(token) = classify_authorization(Some(b"Bearer abc.def".as_slice())) else {
            panic!("expected bearer token");
        };
        assert_eq!(token.as_str(), "abc.def");
    }

    #[test]
    fn non_utf8_and_oversized_headers_are_malformed() {
        assert_eq!(classify_authorization(Some([0x42_u8, 0xff, 0xfe].as_slice())), HeaderClass::Malformed);
        let mut big = b"Bearer ".to_vec();
        big.extend(std::iter::repeat_n(b'a', MAX_AUTHORIZATION_BYTES));
        assert_eq!(classify_authorization(Some(big.as_slice())), HeaderClass::Malformed);
    }

    #[test]
    fn debug_output_redacts_token() {
        let token = BearerToken::new("secret-value").unwrap();
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("secret-value"));
        assert_eq!(token.fingerprint().len(), 16);
    }

    #[test]
    fn labels_follow_state() {
        assert_eq!(TokenState::NoToken.label(), TOKEN_STATE_NO_TOKEN);
        assert_eq!(TokenState::MalformedHeader.label(), TOKEN_STATE_MALFORMED);
        assert_eq!(TokenState::Valid(Principal::new("u1")).label(), TOKEN_STATE_OK);
        assert_eq!(TokenState::Invalid("token revoked".to_string()).label(), "token revoked");
    }

    #[test]
    fn identity_match_rejects_other_members() {
        let principal = Principal::new("u1");
        assert!(ensure_identity_match(&principal, &PrincipalId::new("u1")).is_ok());
        let err = ensure_identity_match(&principal, &PrincipalId::new("u2")).unwrap_err();
        assert!(matches!(err, GatewayError::IdentityMismatch { .. }));
    }
}
