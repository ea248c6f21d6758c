// crates/member-gateway-core/src/runtime/subscriber.rs
// ============================================================================
// Module: Member Deletion Subscriber
// Description: Broker consumer that retries deferred backend deletions.
// Purpose: Drain deletion events with bounded concurrency and ack-on-success.
// Dependencies: tokio, tokio-util, crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The subscriber pulls deliveries into a bounded queue that a fixed pool of
//! workers drains. A delivery is acknowledged only after the backend delete
//! succeeds (including "already gone"); anything else is left for broker
//! redelivery. Unsupported actions are logged and left unacknowledged.
//!
//! Cancellation stops intake immediately. Workers finish the deliveries
//! already queued, then [`DeletionSubscriber::run`] returns. Recoverable
//! broker errors back off and retry; fatal ones end the run with an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::audit::GatewayAuditSink;
use crate::audit::SubscriberAuditEvent;
use crate::core::DeletionEvent;
use crate::core::MemberAction;
use crate::interfaces::BackendGraphQl;
use crate::interfaces::BrokerError;
use crate::interfaces::MessageBroker;
use crate::interfaces::ReceivedMessage;
use crate::runtime::deletion::delete_member_record;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Subscriber tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Maximum deliveries requested per pull.
    pub pull_batch: usize,
    /// Number of concurrent workers.
    pub workers: usize,
    /// Capacity of the delivery queue between intake and workers.
    pub queue_capacity: usize,
    /// Deadline for one pull.
    pub pull_timeout: Duration,
    /// Deadline for one acknowledgement.
    pub ack_timeout: Duration,
    /// Deadline for one backend delete.
    pub backend_timeout: Duration,
    /// Delay after an empty pull or a recoverable error.
    pub idle_backoff: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            pull_batch: 10,
            workers: 4,
            queue_capacity: 64,
            pull_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(10),
            backend_timeout: Duration::from_secs(5),
            idle_backoff: Duration::from_secs(1),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Subscriber errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SubscriberError {
    /// The broker failed in a way retrying cannot fix.
    #[error("broker failed: {0}")]
    Broker(#[from] BrokerError),
    /// Configuration was unusable.
    #[error("invalid subscriber config: {0}")]
    Config(String),
}

// ============================================================================
// SECTION: Subscriber
// ============================================================================

/// Consumer of deferred member deletions.
pub struct DeletionSubscriber {
    /// Broker supplying deliveries.
    broker: Arc<dyn MessageBroker>,
    /// Member backend.
    backend: Arc<dyn BackendGraphQl>,
    /// Audit sink.
    audit: Arc<dyn GatewayAuditSink>,
    /// Tuning.
    config: SubscriberConfig,
}

impl DeletionSubscriber {
    /// Creates a subscriber.
    #[must_use]
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        backend: Arc<dyn BackendGraphQl>,
        audit: Arc<dyn GatewayAuditSink>,
        config: SubscriberConfig,
    ) -> Self {
        Self {
            broker,
            backend,
            audit,
            config,
        }
    }

    /// Consumes deliveries until `cancel` fires or the broker fails fatally.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriberError::Broker`] on a non-recoverable broker error
    /// and [`SubscriberError::Config`] when sizing is zero.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SubscriberError> {
        if self.config.pull_batch == 0 || self.config.workers == 0 || self.config.queue_capacity == 0 {
            return Err(SubscriberError::Config("pull_batch, workers, and queue_capacity must be non-zero".to_string()));
        }
        let (sender, receiver) = mpsc::channel::<ReceivedMessage>(self.config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = JoinSet::new();
        for _ in 0 .. self.config.workers {
            let worker = Worker {
                broker: Arc::clone(&self.broker),
                backend: Arc::clone(&self.backend),
                audit: Arc::clone(&self.audit),
                config: self.config,
            };
            let receiver = Arc::clone(&receiver);
            workers.spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(message) = next else { break };
                    worker.handle(message).await;
                }
            });
        }
        self.record("started", None, None, None);

        let result = self.intake(&sender, &cancel).await;
        drop(sender);
        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                self.record("worker_failed", None, None, Some(err.to_string()));
            }
        }
        self.record("stopped", None, None, result.as_ref().err().map(ToString::to_string));
        result
    }

    /// Pulls deliveries into the queue until cancelled or fatally failed.
    async fn intake(
        &self,
        sender: &mpsc::Sender<ReceivedMessage>,
        cancel: &CancellationToken,
    ) -> Result<(), SubscriberError> {
        loop {
            let pulled = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                pulled = tokio::time::timeout(self.config.pull_timeout, self.broker.pull(self.config.pull_batch)) => pulled,
            };
            let messages = match pulled {
                Ok(Ok(messages)) => messages,
                Ok(Err(err)) if err.is_recoverable() => {
                    self.record("pull_failed", None, None, Some(err.to_string()));
                    Vec::new()
                }
                Ok(Err(err)) => return Err(SubscriberError::Broker(err)),
                Err(_) => {
                    self.record("pull_failed", None, None, Some(BrokerError::Timeout.to_string()));
                    Vec::new()
                }
            };
            if messages.is_empty() {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Ok(()),
                    () = tokio::time::sleep(self.config.idle_backoff) => {}
                }
                continue;
            }
            for message in messages {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Ok(()),
                    sent = sender.send(message) => {
                        if sent.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Records a subscriber-level event.
    fn record(&self, kind: &'static str, message_id: Option<String>, principal_id: Option<String>, detail: Option<String>) {
        self.audit.record_subscriber(&SubscriberAuditEvent::new(kind, message_id, principal_id, detail));
    }
}

/// Worker-side handles shared by each pool task.
struct Worker {
    /// Broker used for acknowledgements.
    broker: Arc<dyn MessageBroker>,
    /// Member backend.
    backend: Arc<dyn BackendGraphQl>,
    /// Audit sink.
    audit: Arc<dyn GatewayAuditSink>,
    /// Tuning.
    config: SubscriberConfig,
}

impl Worker {
    /// Handles one delivery, acknowledging only on success.
    async fn handle(&self, message: ReceivedMessage) {
        let message_id = Some(message.message_id.to_string());
        let event = match DeletionEvent::from_attributes(&message.attributes) {
            Ok(event) => event,
            Err(err) => {
                self.record("unsupported", message_id, None, Some(err.to_string()));
                return;
            }
        };
        let principal = Some(event.principal_id.to_string());
        match event.action {
            MemberAction::Delete => {
                if let Err(err) =
                    delete_member_record(self.backend.as_ref(), &event.principal_id, self.config.backend_timeout).await
                {
                    self.record("retry_failed", message_id, principal, Some(err.to_string()));
                    return;
                }
            }
        }
        let acked = tokio::time::timeout(self.config.ack_timeout, self.broker.acknowledge(std::slice::from_ref(&message.ack_id))).await;
        match acked {
            Ok(Ok(())) => self.record("acked", message_id, principal, None),
            Ok(Err(err)) => self.record("ack_failed", message_id, principal, Some(err.to_string())),
            Err(_) => self.record("ack_failed", message_id, principal, Some(BrokerError::Timeout.to_string())),
        }
    }

    /// Records a worker-level event.
    fn record(&self, kind: &'static str, message_id: Option<String>, principal_id: Option<String>, detail: Option<String>) {
        self.audit.record_subscriber(&SubscriberAuditEvent::new(kind, message_id, principal_id, detail));
    }
}
