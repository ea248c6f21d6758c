// crates/member-gateway-broker/src/memory.rs
// ============================================================================
// Module: In-Memory Broker
// Description: Process-local MessageBroker with lease-based redelivery.
// Purpose: Back deferred deletion in tests and single-node deployments.
// Dependencies: member-gateway-core, tokio
// ============================================================================

//! ## Overview
//! Published messages wait in a FIFO queue. A pull leases messages for the
//! ack deadline; a lease that expires without acknowledgement returns its
//! message to the front of the queue with an incremented delivery attempt.
//! Unknown or stale ack ids are ignored, matching hosted broker behavior.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use member_gateway_core::AckId;
use member_gateway_core::BrokerError;
use member_gateway_core::MessageBroker;
use member_gateway_core::MessageId;
use member_gateway_core::ReceivedMessage;
use tokio::time::Instant;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Message held by the broker.
#[derive(Clone)]
struct StoredMessage {
    /// Publish order.
    sequence: u64,
    /// Message identifier.
    message_id: MessageId,
    /// Message attributes.
    attributes: BTreeMap<String, String>,
    /// Deliveries made so far.
    deliveries: u32,
}

/// Outstanding lease.
struct Lease {
    /// Leased message.
    message: StoredMessage,
    /// Instant after which the lease expires.
    expires_at: Instant,
}

/// Mutable broker state.
#[derive(Default)]
struct BrokerState {
    /// Next message sequence number.
    next_id: u64,
    /// Messages awaiting delivery.
    pending: VecDeque<StoredMessage>,
    /// Leased messages keyed by ack id.
    leased: HashMap<AckId, Lease>,
    /// Every attribute set ever published.
    published: Vec<BTreeMap<String, String>>,
    /// Whether the broker was closed.
    closed: bool,
}

/// In-memory at-least-once broker.
pub struct InMemoryBroker {
    /// Lease duration for pulled messages.
    ack_deadline: Duration,
    /// Broker state.
    state: Mutex<BrokerState>,
}

impl InMemoryBroker {
    /// Creates an empty broker with the given ack deadline.
    #[must_use]
    pub fn new(ack_deadline: Duration) -> Self {
        Self {
            ack_deadline,
            state: Mutex::new(BrokerState::default()),
        }
    }

    /// Returns every attribute set published so far.
    #[must_use]
    pub fn published(&self) -> Vec<BTreeMap<String, String>> {
        self.state.lock().map(|state| state.published.clone()).unwrap_or_default()
    }

    /// Returns the number of messages pending or leased.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.state.lock().map(|state| state.pending.len() + state.leased.len()).unwrap_or_default()
    }

    /// Rejects all further operations.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
        }
    }

    /// Locks the state, failing when the broker is closed.
    fn open_state(&self) -> Result<std::sync::MutexGuard<'_, BrokerState>, BrokerError> {
        let state = self.state.lock().map_err(|_| BrokerError::Unavailable("broker state poisoned".to_string()))?;
        if state.closed {
            return Err(BrokerError::Closed);
        }
        Ok(state)
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, attributes: &BTreeMap<String, String>) -> Result<MessageId, BrokerError> {
        let mut state = self.open_state()?;
        state.next_id += 1;
        let message_id = MessageId::new(state.next_id.to_string());
        let sequence = state.next_id;
        state.pending.push_back(StoredMessage {
            sequence,
            message_id: message_id.clone(),
            attributes: attributes.clone(),
            deliveries: 0,
        });
        state.published.push(attributes.clone());
        Ok(message_id)
    }

    async fn pull(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, BrokerError> {
        let mut state = self.open_state()?;
        let now = Instant::now();
        let expired: Vec<AckId> =
            state.leased.iter().filter(|(_, lease)| lease.expires_at <= now).map(|(ack_id, _)| ack_id.clone()).collect();
        let mut returned: Vec<StoredMessage> =
            expired.iter().filter_map(|ack_id| state.leased.remove(ack_id)).map(|lease| lease.message).collect();
        returned.sort_by_key(|message| std::cmp::Reverse(message.sequence));
        for message in returned {
            state.pending.push_front(message);
        }

        let mut deliveries = Vec::new();
        while deliveries.len() < max_messages {
            let Some(mut message) = state.pending.pop_front() else { break };
            message.deliveries += 1;
            let ack_id = AckId::new(format!("{}-{}", message.message_id, message.deliveries));
            deliveries.push(ReceivedMessage {
                ack_id: ack_id.clone(),
                message_id: message.message_id.clone(),
                attributes: message.attributes.clone(),
                delivery_attempt: message.deliveries,
            });
            state.leased.insert(ack_id, Lease {
                message,
                expires_at: now + self.ack_deadline,
            });
        }
        Ok(deliveries)
    }

    async fn acknowledge(&self, ack_ids: &[AckId]) -> Result<(), BrokerError> {
        let mut state = self.open_state()?;
        for ack_id in ack_ids {
            state.leased.remove(ack_id);
        }
        Ok(())
    }
}
