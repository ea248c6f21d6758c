// crates/member-gateway-core/src/lib.rs
// ============================================================================
// Module: Member Gateway Core Library
// Description: Public API surface for the member gateway core.
// Purpose: Expose core types, interfaces, audit, and runtime components.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Member gateway core holds everything that does not speak HTTP: bearer token
//! classification and memoized verification, selection projection, the
//! member deletion coordinator, and the deferred-deletion subscriber. External
//! systems are reached only through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use audit::AuthAuditEvent;
pub use audit::DeletionAuditEvent;
pub use audit::FileAuditSink;
pub use audit::GatewayAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RequestAuditEvent;
pub use audit::RequestAuditEventParams;
pub use audit::SecurityAuditEvent;
pub use audit::StderrAuditSink;
pub use audit::SubscriberAuditEvent;
pub use interfaces::BackendAuth;
pub use interfaces::BackendError;
pub use interfaces::BackendGraphQl;
pub use interfaces::BrokerError;
pub use interfaces::CredentialError;
pub use interfaces::CredentialSource;
pub use interfaces::GraphQlRequest;
pub use interfaces::IdentityError;
pub use interfaces::IdentityProvider;
pub use interfaces::KeyValueStore;
pub use interfaces::MessageBroker;
pub use interfaces::MetadataError;
pub use interfaces::ReceivedMessage;
pub use interfaces::TokenVerifier;
pub use interfaces::UserRecord;
pub use runtime::GatewayCredentialHandle;
pub use runtime::DELETE_MEMBER_DOCUMENT;
pub use runtime::DeletionError;
pub use runtime::DeletionOutcome;
pub use runtime::DeletionStage;
pub use runtime::DeletionStep;
pub use runtime::DeletionTimeouts;
pub use runtime::MemberDeletionCoordinator;
pub use runtime::delete_member_record;
pub use runtime::InMemoryKeyValueStore;
pub use runtime::DocumentShape;
pub use runtime::FieldPaths;
pub use runtime::FieldProjection;
pub use runtime::OperationKind;
pub use runtime::ProjectionError;
pub use runtime::SelectionNode;
pub use runtime::build_document;
pub use runtime::project;
pub use runtime::validate_name;
pub use runtime::DeletionSubscriber;
pub use runtime::SubscriberConfig;
pub use runtime::SubscriberError;
pub use runtime::DEFAULT_VERIFY_TIMEOUT;
pub use runtime::TokenCache;
