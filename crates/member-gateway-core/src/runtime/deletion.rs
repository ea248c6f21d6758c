// crates/member-gateway-core/src/runtime/deletion.rs
// ============================================================================
// Module: Member Deletion Coordinator
// Description: Ordered multi-system member deletion with deferred retry.
// Purpose: Revoke, disable, and delete a member across identity and backend.
// Dependencies: tokio, tokio-util, crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! Deletion runs a fixed sequence with a deadline per step:
//!
//! 1. revoke refresh tokens,
//! 2. record the revocation time in metadata,
//! 3. delete the identity record,
//! 4. delete the backend member record.
//!
//! Steps 1-3 are fatal on failure. A backend failure is absorbed: a deletion
//! event is published to the broker from a detached task and the caller gets
//! [`DeletionOutcome::BackendDeleteDeferred`]. Every stage transition is
//! audited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio_util::task::TaskTracker;

use crate::audit::DeletionAuditEvent;
use crate::audit::GatewayAuditSink;
use crate::core::DeletionEvent;
use crate::core::GatewayError;
use crate::core::Principal;
use crate::core::PrincipalId;
use crate::core::ensure_identity_match;
use crate::interfaces::BackendAuth;
use crate::interfaces::BackendError;
use crate::interfaces::BackendGraphQl;
use crate::interfaces::GraphQlRequest;
use crate::interfaces::IdentityProvider;
use crate::interfaces::KeyValueStore;
use crate::interfaces::MessageBroker;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Backend document deleting one member record.
pub const DELETE_MEMBER_DOCUMENT: &str =
    "mutation($firebaseId: String!) {\ndeleteMember(firebaseId: $firebaseId) {\nsuccess\n}\n}";

/// Metadata key prefix for per-member records.
const METADATA_PREFIX: &str = "metadata/";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-step deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionTimeouts {
    /// Refresh token revocation.
    pub revoke: Duration,
    /// User lookup and revocation metadata write.
    pub record_revocation: Duration,
    /// Identity record deletion.
    pub disable: Duration,
    /// Backend member deletion.
    pub backend_delete: Duration,
    /// Deferred retry publish.
    pub publish: Duration,
}

impl Default for DeletionTimeouts {
    fn default() -> Self {
        Self {
            revoke: Duration::from_secs(10),
            record_revocation: Duration::from_secs(10),
            disable: Duration::from_secs(10),
            backend_delete: Duration::from_secs(5),
            publish: Duration::from_secs(10),
        }
    }
}

/// Audited deletion stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStage {
    /// Deletion accepted.
    Start,
    /// Refresh tokens revoked and revocation time recorded.
    TokenRevoked,
    /// Identity record deleted.
    UserDisabled,
    /// Backend record deleted.
    BackendDeleted,
    /// Backend delete failed; retry enqueued.
    BackendDeleteFailedEnqueued,
    /// Deletion finished.
    Terminal,
}

impl DeletionStage {
    /// Returns the audit label for the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::TokenRevoked => "token_revoked",
            Self::UserDisabled => "user_disabled",
            Self::BackendDeleted => "backend_deleted",
            Self::BackendDeleteFailedEnqueued => "backend_delete_failed_enqueued",
            Self::Terminal => "terminal",
        }
    }
}

/// Upstream steps that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStep {
    /// Refresh token revocation.
    RevokeTokens,
    /// User record lookup.
    LookupUser,
    /// Revocation metadata write.
    RecordRevocation,
    /// Identity record deletion.
    DisableUser,
    /// Deferred retry publish.
    Publish,
}

impl DeletionStep {
    /// Returns the audit label for the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RevokeTokens => "revoke_tokens",
            Self::LookupUser => "lookup_user",
            Self::RecordRevocation => "record_revocation",
            Self::DisableUser => "disable_user",
            Self::Publish => "publish_retry",
        }
    }
}

impl fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful deletion outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Backend record deleted synchronously.
    BackendDeleted,
    /// Backend delete failed and a retry event was handed to the broker.
    BackendDeleteDeferred,
}

/// Deletion errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum DeletionError {
    /// The caller may not delete the target.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// A fatal step exceeded its deadline.
    #[error("{step} timed out")]
    Timeout {
        /// Step that timed out.
        step: DeletionStep,
    },
    /// A fatal step failed.
    #[error("{step} failed: {message}")]
    Failed {
        /// Step that failed.
        step: DeletionStep,
        /// Upstream error text.
        message: String,
    },
}

impl From<DeletionError> for GatewayError {
    fn from(err: DeletionError) -> Self {
        match err {
            DeletionError::Gateway(inner) => inner,
            DeletionError::Timeout {
                step,
            } => Self::UpstreamTimeout(step.to_string()),
            failed @ DeletionError::Failed {
                ..
            } => Self::UpstreamUnavailable(failed.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Coordinates member deletion across identity, metadata, backend, and broker.
pub struct MemberDeletionCoordinator {
    /// Identity admin operations.
    identity: Arc<dyn IdentityProvider>,
    /// Metadata store receiving the revocation time.
    metadata: Arc<dyn KeyValueStore>,
    /// Member backend.
    backend: Arc<dyn BackendGraphQl>,
    /// Broker receiving deferred retries.
    broker: Arc<dyn MessageBroker>,
    /// Audit sink.
    audit: Arc<dyn GatewayAuditSink>,
    /// Step deadlines.
    timeouts: DeletionTimeouts,
    /// Tracker for detached retry publishes.
    detached: TaskTracker,
}

impl MemberDeletionCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        metadata: Arc<dyn KeyValueStore>,
        backend: Arc<dyn BackendGraphQl>,
        broker: Arc<dyn MessageBroker>,
        audit: Arc<dyn GatewayAuditSink>,
        timeouts: DeletionTimeouts,
    ) -> Self {
        Self {
            identity,
            metadata,
            backend,
            broker,
            audit,
            timeouts,
            detached: TaskTracker::new(),
        }
    }

    /// Deletes `target` on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`DeletionError::Gateway`] when the caller is not the target,
    /// and [`DeletionError::Timeout`] or [`DeletionError::Failed`] when a step
    /// before the backend delete fails.
    pub async fn delete_member(
        &self,
        caller: &Principal,
        target: &PrincipalId,
    ) -> Result<DeletionOutcome, DeletionError> {
        ensure_identity_match(caller, target)?;
        self.audit_stage(target, DeletionStage::Start, "ok", None);

        self.bounded(target, DeletionStep::RevokeTokens, self.timeouts.revoke, self.identity.revoke_refresh_tokens(target))
            .await?;
        let user = self
            .bounded(target, DeletionStep::LookupUser, self.timeouts.record_revocation, self.identity.get_user(target))
            .await?;
        let key = format!("{METADATA_PREFIX}{target}");
        let revoke_time = json!({ "revokeTime": user.tokens_valid_after_ms / 1000 });
        self.bounded(
            target,
            DeletionStep::RecordRevocation,
            self.timeouts.record_revocation,
            self.metadata.set(&key, revoke_time),
        )
        .await?;
        self.audit_stage(target, DeletionStage::TokenRevoked, "ok", None);

        self.bounded(target, DeletionStep::DisableUser, self.timeouts.disable, self.identity.delete_user(target))
            .await?;
        self.audit_stage(target, DeletionStage::UserDisabled, "ok", None);

        let outcome = match delete_member_record(self.backend.as_ref(), target, self.timeouts.backend_delete).await {
            Ok(()) => {
                self.audit_stage(target, DeletionStage::BackendDeleted, "ok", None);
                DeletionOutcome::BackendDeleted
            }
            Err(err) => {
                self.audit_stage(target, DeletionStage::BackendDeleteFailedEnqueued, "deferred", Some(err.to_string()));
                self.enqueue_retry(target);
                DeletionOutcome::BackendDeleteDeferred
            }
        };
        self.audit_stage(target, DeletionStage::Terminal, "ok", None);
        Ok(outcome)
    }

    /// Waits for every detached retry publish started so far.
    pub async fn drain_detached(&self) {
        self.detached.close();
        self.detached.wait().await;
        self.detached.reopen();
    }

    /// Publishes a retry event from a detached task.
    fn enqueue_retry(&self, target: &PrincipalId) {
        let broker = Arc::clone(&self.broker);
        let audit = Arc::clone(&self.audit);
        let deadline = self.timeouts.publish;
        let event = DeletionEvent::new(target.clone());
        self.detached.spawn(async move {
            let attributes = event.to_attributes();
            let (outcome, detail) = match tokio::time::timeout(deadline, broker.publish(&attributes)).await {
                Ok(Ok(message_id)) => ("ok", Some(format!("message_id={message_id}"))),
                Ok(Err(err)) => ("failed", Some(err.to_string())),
                Err(_) => ("failed", Some("publish timed out".to_string())),
            };
            audit.record_deletion(&DeletionAuditEvent::new(
                event.principal_id.as_str(),
                DeletionStep::Publish.as_str(),
                outcome,
                detail,
            ));
        });
    }

    /// Runs one fatal step under its deadline, auditing failures.
    async fn bounded<T, E: fmt::Display>(
        &self,
        target: &PrincipalId,
        step: DeletionStep,
        deadline: Duration,
        operation: impl Future<Output = Result<T, E>>,
    ) -> Result<T, DeletionError> {
        let err = match tokio::time::timeout(deadline, operation).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => DeletionError::Failed {
                step,
                message: err.to_string(),
            },
            Err(_) => DeletionError::Timeout {
                step,
            },
        };
        self.audit.record_deletion(&DeletionAuditEvent::new(target.as_str(), step.as_str(), "failed", Some(err.to_string())));
        Err(err)
    }

    /// Records one stage transition.
    fn audit_stage(&self, target: &PrincipalId, stage: DeletionStage, outcome: &'static str, detail: Option<String>) {
        self.audit.record_deletion(&DeletionAuditEvent::new(target.as_str(), stage.as_str(), outcome, detail));
    }
}

// ============================================================================
// SECTION: Backend Delete
// ============================================================================

/// Deletes one member record in the backend using the gateway credential.
///
/// A record that no longer exists counts as deleted.
///
/// # Errors
///
/// Returns [`BackendError`] on timeout, transport failure, or when the backend
/// does not report success.
pub async fn delete_member_record(
    backend: &dyn BackendGraphQl,
    id: &PrincipalId,
    deadline: Duration,
) -> Result<(), BackendError> {
    let mut variables = Map::new();
    variables.insert("firebaseId".to_string(), Value::String(id.to_string()));
    let request = GraphQlRequest::new(DELETE_MEMBER_DOCUMENT, variables);
    let data = match tokio::time::timeout(deadline, backend.run(&request, &BackendAuth::Gateway)).await {
        Err(_) => return Err(BackendError::Timeout),
        Ok(Err(BackendError::NotFound(_))) => return Ok(()),
        Ok(result) => result?,
    };
    match data.pointer("/deleteMember/success").and_then(Value::as_bool) {
        Some(true) => Ok(()),
        Some(false) => Err(BackendError::GraphQl(vec!["deleteMember reported success=false".to_string()])),
        None => Err(BackendError::Decode("missing deleteMember.success".to_string())),
    }
}
