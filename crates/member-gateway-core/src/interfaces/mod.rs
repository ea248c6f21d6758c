// crates/member-gateway-core/src/interfaces/mod.rs
// ============================================================================
// Module: Member Gateway Interfaces
// Description: Backend-agnostic seams for identity, metadata, backend, broker.
// Purpose: Define the contract surfaces used by the gateway runtime.
// Dependencies: async-trait, crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces describe how the gateway reaches external systems without
//! embedding vendor SDK details. Every method is async and may be wrapped in a
//! deadline by the caller; implementations must not retry internally.
//!
//! Security posture: implementations consume untrusted upstream responses and
//! must fail closed on anything they cannot parse.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::AckId;
use crate::core::BearerToken;
use crate::core::GatewayCredential;
use crate::core::MessageId;
use crate::core::Principal;
use crate::core::PrincipalId;

// ============================================================================
// SECTION: Identity Provider
// ============================================================================

/// Identity provider errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider rejected the token or request.
    #[error("{0}")]
    Rejected(String),
    /// The referenced user does not exist.
    #[error("user not found: {0}")]
    NotFound(String),
    /// The provider could not be reached or answered unexpectedly.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// User record fields the gateway consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// User subject.
    pub id: PrincipalId,
    /// Epoch milliseconds after which issued tokens are valid.
    pub tokens_valid_after_ms: i64,
}

/// Verifies bearer tokens, including a revocation check.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies the token signature, expiry, and revocation status.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the token is invalid, revoked, or the
    /// provider cannot be reached.
    async fn verify_token(&self, token: &BearerToken) -> Result<Principal, IdentityError>;
}

/// Administrative identity operations used by member deletion.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Revokes every refresh token issued to the user.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when revocation fails.
    async fn revoke_refresh_tokens(&self, id: &PrincipalId) -> Result<(), IdentityError>;

    /// Loads the user record.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the user cannot be loaded.
    async fn get_user(&self, id: &PrincipalId) -> Result<UserRecord, IdentityError>;

    /// Deletes the user so no new sessions can be opened.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when deletion fails.
    async fn delete_user(&self, id: &PrincipalId) -> Result<(), IdentityError>;
}

// ============================================================================
// SECTION: Metadata Store
// ============================================================================

/// Metadata store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The store could not be reached.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
    /// The store refused the write.
    #[error("metadata store rejected write: {0}")]
    Rejected(String),
}

/// Key/value store for per-member metadata.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Writes `value` at `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the write fails.
    async fn set(&self, key: &str, value: Value) -> Result<(), MetadataError>;
}

// ============================================================================
// SECTION: Member Backend
// ============================================================================

/// Credential used for a backend call.
#[derive(Debug, Clone)]
pub enum BackendAuth {
    /// Present the gateway's own credential.
    Gateway,
    /// Forward the caller's bearer token.
    Caller(BearerToken),
}

/// GraphQL request sent to the member backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQlRequest {
    /// GraphQL document text.
    pub document: String,
    /// Variables bound to the document.
    pub variables: Map<String, Value>,
}

impl GraphQlRequest {
    /// Creates a request from a document and variables.
    #[must_use]
    pub fn new(document: impl Into<String>, variables: Map<String, Value>) -> Self {
        Self {
            document: document.into(),
            variables,
        }
    }
}

/// Gateway credential errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone)]
pub enum CredentialError {
    /// Credential material could not be read.
    #[error("credential io error: {0}")]
    Io(String),
    /// Credential material was malformed.
    #[error("invalid credential: {0}")]
    Invalid(String),
}

/// Member backend errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend did not answer before the deadline.
    #[error("backend request timed out")]
    Timeout,
    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The backend answered with a non-success HTTP status.
    #[error("backend returned status {0}")]
    Status(u16),
    /// The backend returned GraphQL errors.
    #[error("backend errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),
    /// The referenced record does not exist.
    #[error("backend record not found: {0}")]
    NotFound(String),
    /// The backend response could not be decoded.
    #[error("backend response invalid: {0}")]
    Decode(String),
    /// The gateway credential could not be obtained.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// GraphQL client for the member backend.
#[async_trait]
pub trait BackendGraphQl: Send + Sync {
    /// Executes a document and returns its `data` object.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport, status, or GraphQL failures.
    async fn run(&self, request: &GraphQlRequest, auth: &BackendAuth) -> Result<Value, BackendError>;
}

/// Source of the gateway's backend credential.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetches a fresh credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the credential cannot be produced.
    async fn fetch(&self) -> Result<GatewayCredential, CredentialError>;
}

// ============================================================================
// SECTION: Message Broker
// ============================================================================

/// Message broker errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker did not answer before the deadline.
    #[error("broker request timed out")]
    Timeout,
    /// The broker was transiently unavailable.
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    /// The broker rejected the request (auth, missing topic, bad payload).
    #[error("broker rejected request: {0}")]
    Rejected(String),
    /// The broker client has been shut down.
    #[error("broker closed")]
    Closed,
}

impl BrokerError {
    /// Returns true when retrying the same request may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

/// One delivery of a broker message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Lease handle used to acknowledge this delivery.
    pub ack_id: AckId,
    /// Broker message identifier.
    pub message_id: MessageId,
    /// Message attributes.
    pub attributes: BTreeMap<String, String>,
    /// Delivery attempt counter (1 for the first delivery).
    pub delivery_attempt: u32,
}

/// At-least-once message broker.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publishes an attribute-only message to the configured topic.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the publish is not confirmed.
    async fn publish(&self, attributes: &BTreeMap<String, String>) -> Result<MessageId, BrokerError>;

    /// Pulls up to `max_messages` deliveries from the configured subscription.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the pull fails.
    async fn pull(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, BrokerError>;

    /// Acknowledges deliveries so they are not redelivered.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the acknowledgement fails.
    async fn acknowledge(&self, ack_ids: &[AckId]) -> Result<(), BrokerError>;
}
