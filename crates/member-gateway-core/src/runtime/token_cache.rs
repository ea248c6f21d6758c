// crates/member-gateway-core/src/runtime/token_cache.rs
// ============================================================================
// Module: Member Gateway Token Cache
// Description: Per-request memoized bearer token verification.
// Purpose: Verify a request's token at most once, lazily, under a deadline.
// Dependencies: tokio, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! A [`TokenCache`] is created for every inbound request. Header
//! classification happens immediately and never fails; verification starts
//! only when a consumer first asks for the state. Concurrent consumers share a
//! single in-flight verification through a [`OnceCell`].
//!
//! Invalidation swaps in a fresh cell, so the next consumer triggers a new
//! verification while earlier readers keep the value they already observed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::sync::RwLock;

use crate::core::BearerToken;
use crate::core::GatewayError;
use crate::core::HeaderClass;
use crate::core::Principal;
use crate::core::TokenState;
use crate::core::classify_authorization;
use crate::interfaces::TokenVerifier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default verification deadline.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reason recorded when verification exceeds its deadline.
const VERIFY_TIMEOUT_REASON: &str = "token verification timed out";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-request bearer token cache.
///
/// # Invariants
/// - Requests without a bearer token never contact the verifier.
/// - At most one verification is in flight per cell generation.
pub struct TokenCache {
    /// Bearer token when the header carried one.
    token: Option<BearerToken>,
    /// Fixed state for requests without a usable token.
    fixed: Option<TokenState>,
    /// Verifier used to resolve bearer tokens.
    verifier: Arc<dyn TokenVerifier>,
    /// Verification deadline.
    verify_timeout: Duration,
    /// Current resolution cell; replaced on invalidation.
    resolved: RwLock<Arc<OnceCell<TokenState>>>,
}

impl TokenCache {
    /// Creates a cache from the raw Authorization header bytes.
    #[must_use]
    pub fn new(
        authorization: Option<&[u8]>,
        verifier: Arc<dyn TokenVerifier>,
        verify_timeout: Duration,
    ) -> Self {
        let (token, fixed) = match classify_authorization(authorization) {
            HeaderClass::Missing => (None, Some(TokenState::NoToken)),
            HeaderClass::Malformed => (None, Some(TokenState::MalformedHeader)),
            HeaderClass::Bearer(token) => (Some(token), None),
        };
        Self {
            token,
            fixed,
            verifier,
            verify_timeout,
            resolved: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Returns the token state, verifying on first use.
    pub async fn state(&self) -> TokenState {
        let Some(token) = &self.token else {
            return self.fixed.clone().unwrap_or(TokenState::NoToken);
        };
        let cell = Arc::clone(&*self.resolved.read().await);
        cell.get_or_init(|| verify(self.verifier.as_ref(), token, self.verify_timeout))
            .await
            .clone()
    }

    /// Returns the state without triggering verification.
    ///
    /// Bearer requests report [`TokenState::Unchecked`] until a consumer has
    /// awaited [`TokenCache::state`].
    #[must_use]
    pub fn peek(&self) -> TokenState {
        if let Some(fixed) = &self.fixed {
            return fixed.clone();
        }
        self.resolved
            .try_read()
            .ok()
            .and_then(|cell| cell.get().cloned())
            .unwrap_or(TokenState::Unchecked)
    }

    /// Returns the verified principal.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when no valid token is present.
    pub async fn principal(&self) -> Result<Principal, GatewayError> {
        self.state().await.into_principal()
    }

    /// Returns the raw bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NoToken`] when the request carried no bearer token.
    pub fn token(&self) -> Result<&BearerToken, GatewayError> {
        self.token.as_ref().ok_or(GatewayError::NoToken)
    }

    /// Returns the raw bearer token string.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NoToken`] when the request carried no bearer token.
    pub fn token_string(&self) -> Result<&str, GatewayError> {
        self.token().map(BearerToken::as_str)
    }

    /// Returns the token fingerprint for audit records.
    #[must_use]
    pub fn fingerprint(&self) -> Option<String> {
        self.token.as_ref().map(BearerToken::fingerprint)
    }

    /// Discards the memoized result so the next consumer re-verifies.
    pub async fn invalidate(&self) {
        if self.token.is_some() {
            *self.resolved.write().await = Arc::new(OnceCell::new());
        }
    }
}

/// Runs one verification under the deadline.
async fn verify(verifier: &dyn TokenVerifier, token: &BearerToken, deadline: Duration) -> TokenState {
    match tokio::time::timeout(deadline, verifier.verify_token(token)).await {
        Ok(Ok(principal)) => TokenState::Valid(principal),
        Ok(Err(err)) => TokenState::Invalid(err.to_string()),
        Err(_) => TokenState::Invalid(VERIFY_TIMEOUT_REASON.to_string()),
    }
}
