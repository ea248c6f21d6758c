// crates/member-gateway-core/src/runtime/mod.rs
// ============================================================================
// Module: Member Gateway Runtime
// Description: Token cache, projection, credentials, deletion, subscriber.
// Purpose: Orchestrate gateway behavior over the interface seams.
// Dependencies: crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime components own the gateway's behavior. They depend only on the
//! traits in [`crate::interfaces`], so every component runs against in-memory
//! fakes in tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credential;
pub mod deletion;
pub mod memory;
pub mod projection;
pub mod subscriber;
pub mod token_cache;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credential::GatewayCredentialHandle;
pub use deletion::DELETE_MEMBER_DOCUMENT;
pub use deletion::DeletionError;
pub use deletion::DeletionOutcome;
pub use deletion::DeletionStage;
pub use deletion::DeletionStep;
pub use deletion::DeletionTimeouts;
pub use deletion::MemberDeletionCoordinator;
pub use deletion::delete_member_record;
pub use memory::InMemoryKeyValueStore;
pub use projection::DocumentShape;
pub use projection::FieldPaths;
pub use projection::FieldProjection;
pub use projection::OperationKind;
pub use projection::ProjectionError;
pub use projection::SelectionNode;
pub use projection::build_document;
pub use projection::project;
pub use projection::validate_name;
pub use subscriber::DeletionSubscriber;
pub use subscriber::SubscriberConfig;
pub use subscriber::SubscriberError;
pub use token_cache::DEFAULT_VERIFY_TIMEOUT;
pub use token_cache::TokenCache;
