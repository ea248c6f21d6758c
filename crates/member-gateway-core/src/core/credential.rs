// crates/member-gateway-core/src/core/credential.rs
// ============================================================================
// Module: Member Gateway Credential Model
// Description: Gateway service credential and JWT validity classification.
// Purpose: Describe the credential the gateway presents to the backend.
// Dependencies: base64, serde_json
// ============================================================================

//! ## Overview
//! The gateway credential is a JWT minted for the gateway's own identity. Its
//! claims are inspected without signature verification purely to report
//! whether it is usable; the backend remains the verifier.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use crate::core::token::BearerToken;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Credential the gateway presents to the member backend.
#[derive(Clone)]
pub struct GatewayCredential {
    /// Access token sent as `Authorization: Bearer`.
    token: BearerToken,
    /// Optional refresh token retained for operators.
    refresh_token: Option<String>,
}

impl GatewayCredential {
    /// Creates a credential from an access token and optional refresh token.
    #[must_use]
    pub const fn new(token: BearerToken, refresh_token: Option<String>) -> Self {
        Self {
            token,
            refresh_token,
        }
    }

    /// Returns the access token.
    #[must_use]
    pub const fn token(&self) -> &BearerToken {
        &self.token
    }

    /// Returns true when a refresh token is present.
    #[must_use]
    pub const fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Classifies the access token against `now_secs` (epoch seconds).
    #[must_use]
    pub fn state_at(&self, now_secs: u64) -> CredentialState {
        classify_jwt(self.token.as_str(), now_secs)
    }
}

impl fmt::Debug for GatewayCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredential")
            .field("token", &self.token)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Usability of a JWT credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    /// Well formed and inside its validity window.
    Ok,
    /// `exp` is in the past.
    Expired,
    /// `nbf` is in the future.
    NotYetValid,
    /// Not a JWT at all.
    NotAToken,
    /// Structurally a JWT but the claims could not be read.
    Unreadable(String),
}

impl CredentialState {
    /// Returns the human-readable label.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Ok => "OK".to_string(),
            Self::Expired => "token has expired".to_string(),
            Self::NotYetValid => "token is not valid yet".to_string(),
            Self::NotAToken => "that's not even a token".to_string(),
            Self::Unreadable(reason) => format!("couldn't handle this token: {reason}"),
        }
    }
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a JWT by its `exp` and `nbf` claims without verifying it.
#[must_use]
pub fn classify_jwt(token: &str, now_secs: u64) -> CredentialState {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return CredentialState::NotAToken;
    };
    let decoded = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(_) => return CredentialState::NotAToken,
    };
    let claims: Value = match serde_json::from_slice(&decoded) {
        Ok(value) => value,
        Err(err) => return CredentialState::Unreadable(err.to_string()),
    };
    let Some(claims) = claims.as_object() else {
        return CredentialState::Unreadable("claims are not an object".to_string());
    };
    if let Some(exp) = claims.get("exp").and_then(Value::as_u64)
        && now_secs >= exp
    {
        return CredentialState::Expired;
    }
    if let Some(nbf) = claims.get("nbf").and_then(Value::as_u64)
        && now_secs < nbf
    {
        return CredentialState::NotYetValid;
    }
    CredentialState::Ok
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    fn jwt(claims: &str) -> String {
        format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(claims))
    }

    #[test]
    fn classifies_validity_window() {
        assert_eq!(classify_jwt(&jwt(r#"{"exp":200,"nbf":100}"#), 150), CredentialState::Ok);
        assert_eq!(classify_jwt(&jwt(r#"{"exp":200}"#), 200), CredentialState::Expired);
        assert_eq!(classify_jwt(&jwt(r#"{"nbf":100}"#), 99), CredentialState::NotYetValid);
    }

    #[test]
    fn rejects_non_tokens() {
        assert_eq!(classify_jwt("plain", 0), CredentialState::NotAToken);
        assert_eq!(classify_jwt("a.b.c.d", 0), CredentialState::NotAToken);
        assert!(matches!(
            classify_jwt(&format!("e30.{}.sig", URL_SAFE_NO_PAD.encode("nope")), 0),
            CredentialState::Unreadable(_)
        ));
    }

    #[test]
    fn labels_match_reporting_strings() {
        assert_eq!(CredentialState::Expired.label(), "token has expired");
        assert_eq!(CredentialState::NotAToken.label(), "that's not even a token");
    }
}
