// crates/member-gateway-broker/src/lib.rs
// ============================================================================
// Module: Member Gateway Broker Library
// Description: Message broker adapters for deferred member actions.
// Purpose: Provide Pub/Sub REST and in-memory implementations of MessageBroker.
// Dependencies: member-gateway-core, reqwest, serde, tokio
// ============================================================================

//! ## Overview
//! Both adapters implement [`member_gateway_core::MessageBroker`] with
//! at-least-once semantics: a delivery that is not acknowledged before its
//! lease expires is delivered again.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod memory;
pub mod pubsub;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use memory::InMemoryBroker;
pub use pubsub::PubSubBroker;
pub use pubsub::PubSubConfig;
