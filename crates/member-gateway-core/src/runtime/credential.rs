// crates/member-gateway-core/src/runtime/credential.rs
// ============================================================================
// Module: Member Gateway Credential Handle
// Description: Process-wide, lazily initialized gateway credential.
// Purpose: Fetch the backend credential exactly once across all callers.
// Dependencies: tokio, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`GatewayCredentialHandle`] wraps a [`CredentialSource`] with a
//! single-flight cell. The first caller fetches; concurrent callers wait on
//! the same fetch. A failed fetch is not cached, so the next caller retries.
//! Each successful fetch records the credential's validity as a security
//! event so an expired service token is visible before the backend rejects it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tokio::sync::OnceCell;

use crate::audit::GatewayAuditSink;
use crate::audit::SecurityAuditEvent;
use crate::core::CredentialState;
use crate::core::GatewayCredential;
use crate::interfaces::CredentialError;
use crate::interfaces::CredentialSource;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Shared handle to the gateway credential.
pub struct GatewayCredentialHandle {
    /// Source consulted on first use.
    source: Arc<dyn CredentialSource>,
    /// Audit sink for credential state events.
    audit: Arc<dyn GatewayAuditSink>,
    /// Memoized credential.
    cell: OnceCell<GatewayCredential>,
}

impl GatewayCredentialHandle {
    /// Creates a handle backed by `source`.
    #[must_use]
    pub fn new(source: Arc<dyn CredentialSource>, audit: Arc<dyn GatewayAuditSink>) -> Self {
        Self {
            source,
            audit,
            cell: OnceCell::new(),
        }
    }

    /// Returns the credential, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the source fails; the failure is not
    /// memoized.
    pub async fn get(&self) -> Result<&GatewayCredential, CredentialError> {
        self.cell
            .get_or_try_init(|| async {
                let credential = self.source.fetch().await.inspect_err(|err| {
                    self.audit.record_security(&SecurityAuditEvent::new("gateway_credential", Some(err.to_string())));
                })?;
                let state = credential.state_at(now_secs());
                self.audit.record_security(&SecurityAuditEvent::new("gateway_credential", Some(state.label())));
                Ok::<_, CredentialError>(credential)
            })
            .await
    }

    /// Reports the credential's validity without fetching it.
    #[must_use]
    pub fn state_at(&self, now_secs: u64) -> Option<CredentialState> {
        self.cell.get().map(|credential| credential.state_at(now_secs))
    }
}

/// Current wall-clock time in whole seconds.
fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or_default()
}
