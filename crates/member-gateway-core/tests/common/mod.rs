// crates/member-gateway-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: In-memory fakes for identity, backend, broker, and audit seams.
// Purpose: Drive runtime components without network access.
// ============================================================================

//! Shared fakes for member gateway core tests.

#![allow(dead_code, reason = "Each test binary uses a different subset of fixtures.")]

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use member_gateway_core::AckId;
use member_gateway_core::AuthAuditEvent;
use member_gateway_core::BackendAuth;
use member_gateway_core::BackendError;
use member_gateway_core::BackendGraphQl;
use member_gateway_core::BearerToken;
use member_gateway_core::BrokerError;
use member_gateway_core::DeletionAuditEvent;
use member_gateway_core::GatewayAuditSink;
use member_gateway_core::GraphQlRequest;
use member_gateway_core::IdentityError;
use member_gateway_core::IdentityProvider;
use member_gateway_core::MessageBroker;
use member_gateway_core::MessageId;
use member_gateway_core::Principal;
use member_gateway_core::PrincipalId;
use member_gateway_core::ReceivedMessage;
use member_gateway_core::RequestAuditEvent;
use member_gateway_core::SecurityAuditEvent;
use member_gateway_core::SubscriberAuditEvent;
use member_gateway_core::TokenVerifier;
use member_gateway_core::UserRecord;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifier that accepts `valid-<uid>` tokens and counts calls.
pub struct CountingVerifier {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl CountingVerifier {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenVerifier for CountingVerifier {
    async fn verify_token(&self, token: &BearerToken) -> Result<Principal, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        token
            .as_str()
            .strip_prefix("valid-")
            .map(Principal::new)
            .ok_or_else(|| IdentityError::Rejected("ID token has been revoked".to_string()))
    }
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Identity fake recording every call in order.
#[derive(Default)]
pub struct FakeIdentity {
    pub calls: Mutex<Vec<String>>,
    pub fail_revoke: bool,
    pub hang_disable: bool,
    pub tokens_valid_after_ms: i64,
}

impl FakeIdentity {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn revoke_refresh_tokens(&self, id: &PrincipalId) -> Result<(), IdentityError> {
        self.calls.lock().unwrap().push(format!("revoke:{id}"));
        if self.fail_revoke {
            return Err(IdentityError::Unavailable("revoke failed".to_string()));
        }
        Ok(())
    }

    async fn get_user(&self, id: &PrincipalId) -> Result<UserRecord, IdentityError> {
        self.calls.lock().unwrap().push(format!("get_user:{id}"));
        Ok(UserRecord {
            id: id.clone(),
            tokens_valid_after_ms: self.tokens_valid_after_ms,
        })
    }

    async fn delete_user(&self, id: &PrincipalId) -> Result<(), IdentityError> {
        self.calls.lock().unwrap().push(format!("delete_user:{id}"));
        if self.hang_disable {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Scripted backend reply.
pub enum BackendReply {
    Success,
    NotFound,
    Unavailable,
    /// Never answers.
    Hang,
    /// Succeeds after the delay.
    Slow(Duration),
}

/// Backend fake replaying scripted replies, then succeeding.
pub struct FakeBackend {
    pub replies: Mutex<VecDeque<BackendReply>>,
    pub requests: Mutex<Vec<(GraphQlRequest, bool)>>,
}

impl FakeBackend {
    pub fn new(replies: Vec<BackendReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl BackendGraphQl for FakeBackend {
    async fn run(&self, request: &GraphQlRequest, auth: &BackendAuth) -> Result<Value, BackendError> {
        self.requests.lock().unwrap().push((request.clone(), matches!(auth, BackendAuth::Gateway)));
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(BackendReply::Success);
        match reply {
            BackendReply::Success => Ok(json!({ "deleteMember": { "success": true } })),
            BackendReply::NotFound => Err(BackendError::NotFound("member".to_string())),
            BackendReply::Unavailable => Err(BackendError::Unavailable("connection refused".to_string())),
            BackendReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(BackendError::Timeout)
            }
            BackendReply::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(json!({ "deleteMember": { "success": true } }))
            }
        }
    }
}

// ============================================================================
// SECTION: Broker
// ============================================================================

/// Broker fake with scripted pulls and recorded publishes and acks.
#[derive(Default)]
pub struct FakeBroker {
    pub published: Mutex<Vec<BTreeMap<String, String>>>,
    pub pulls: Mutex<VecDeque<Result<Vec<ReceivedMessage>, BrokerError>>>,
    pub acked: Mutex<Vec<AckId>>,
}

impl FakeBroker {
    pub fn with_pulls(pulls: Vec<Result<Vec<ReceivedMessage>, BrokerError>>) -> Arc<Self> {
        Arc::new(Self {
            pulls: Mutex::new(pulls.into()),
            ..Self::default()
        })
    }

    pub fn published(&self) -> Vec<BTreeMap<String, String>> {
        self.published.lock().unwrap().clone()
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().iter().map(|id| id.as_str().to_string()).collect()
    }
}

#[async_trait]
impl MessageBroker for FakeBroker {
    async fn publish(&self, attributes: &BTreeMap<String, String>) -> Result<MessageId, BrokerError> {
        let mut published = self.published.lock().unwrap();
        published.push(attributes.clone());
        Ok(MessageId::new(format!("m{}", published.len())))
    }

    async fn pull(&self, _max_messages: usize) -> Result<Vec<ReceivedMessage>, BrokerError> {
        let next = self.pulls.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn acknowledge(&self, ack_ids: &[AckId]) -> Result<(), BrokerError> {
        self.acked.lock().unwrap().extend(ack_ids.iter().cloned());
        Ok(())
    }
}

/// Builds a delivery with the given attributes.
pub fn delivery(id: &str, attributes: &[(&str, &str)]) -> ReceivedMessage {
    ReceivedMessage {
        ack_id: AckId::new(format!("ack-{id}")),
        message_id: MessageId::new(id),
        attributes: attributes.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
        delivery_attempt: 1,
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink capturing deletion and subscriber events.
#[derive(Default)]
pub struct RecordingAudit {
    pub deletions: Mutex<Vec<DeletionAuditEvent>>,
    pub subscriber: Mutex<Vec<SubscriberAuditEvent>>,
    pub auth: Mutex<Vec<AuthAuditEvent>>,
    pub security: Mutex<Vec<SecurityAuditEvent>>,
}

impl RecordingAudit {
    pub fn stages(&self) -> Vec<String> {
        self.deletions
            .lock()
            .unwrap()
            .iter()
            .map(|event| format!("{}:{}", event.stage, event.outcome))
            .collect()
    }

    pub fn subscriber_kinds(&self) -> Vec<&'static str> {
        self.subscriber.lock().unwrap().iter().map(|event| event.kind).collect()
    }

    pub fn security_messages(&self) -> Vec<String> {
        self.security.lock().unwrap().iter().filter_map(|event| event.message.clone()).collect()
    }
}

impl GatewayAuditSink for RecordingAudit {
    fn record_request(&self, _event: &RequestAuditEvent) {}

    fn record_auth(&self, event: &AuthAuditEvent) {
        self.auth.lock().unwrap().push(event.clone());
    }

    fn record_deletion(&self, event: &DeletionAuditEvent) {
        self.deletions.lock().unwrap().push(event.clone());
    }

    fn record_subscriber(&self, event: &SubscriberAuditEvent) {
        self.subscriber.lock().unwrap().push(event.clone());
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.security.lock().unwrap().push(event.clone());
    }
}
