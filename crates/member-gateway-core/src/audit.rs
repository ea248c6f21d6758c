// crates/member-gateway-core/src/audit.rs
// ============================================================================
// Module: Member Gateway Audit Logging
// Description: Structured audit events for requests, auth, and deletions.
// Purpose: Emit redacted JSON-line audit records without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are the gateway's log stream. Each event is a flat JSON object
//! with an `event` discriminator and a millisecond timestamp. Sinks decide
//! where lines go: stderr, an append-only file, or nowhere.
//!
//! Security posture: raw bearer tokens are never recorded; use
//! [`crate::BearerToken::fingerprint`] instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// HTTP request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: String,
    /// Request path without query.
    pub path: String,
    /// Route kind that served the request.
    pub route: &'static str,
    /// Response status code.
    pub status: u16,
    /// Handling latency in milliseconds.
    pub latency_ms: u128,
    /// Bearer token fingerprint when one was presented.
    pub token_fingerprint: Option<String>,
    /// Token state label observed when the response was produced.
    pub token_state: String,
}

/// Authentication decision audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Route that required authentication.
    pub route: String,
    /// Whether the request was allowed.
    pub allowed: bool,
    /// Verified principal when allowed.
    pub principal_id: Option<String>,
    /// Token state label.
    pub token_state: String,
    /// Bearer token fingerprint when one was presented.
    pub token_fingerprint: Option<String>,
}

/// Member deletion stage audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct DeletionAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Member being deleted.
    pub principal_id: String,
    /// Stage reached.
    pub stage: &'static str,
    /// Stage outcome label.
    pub outcome: &'static str,
    /// Optional failure detail.
    pub detail: Option<String>,
}

/// Deletion subscriber audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Subscriber event kind.
    pub kind: &'static str,
    /// Broker message identifier when applicable.
    pub message_id: Option<String>,
    /// Member subject when decoded.
    pub principal_id: Option<String>,
    /// Optional detail.
    pub detail: Option<String>,
}

/// Security posture audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: String,
    /// Optional message.
    pub message: Option<String>,
}

/// Inputs required to construct a request audit event.
pub struct RequestAuditEventParams {
    /// HTTP method.
    pub method: String,
    /// Request path without query.
    pub path: String,
    /// Route kind that served the request.
    pub route: &'static str,
    /// Response status code.
    pub status: u16,
    /// Handling latency in milliseconds.
    pub latency_ms: u128,
    /// Bearer token fingerprint when one was presented.
    pub token_fingerprint: Option<String>,
    /// Token state label observed when the response was produced.
    pub token_state: String,
}

impl RequestAuditEvent {
    /// Builds a request audit event stamped with the current time.
    #[must_use]
    pub fn new(params: RequestAuditEventParams) -> Self {
        Self {
            event: "gateway_request",
            timestamp_ms: now_ms(),
            method: params.method,
            path: params.path,
            route: params.route,
            status: params.status,
            latency_ms: params.latency_ms,
            token_fingerprint: params.token_fingerprint,
            token_state: params.token_state,
        }
    }
}

impl AuthAuditEvent {
    /// Builds an authentication audit event stamped with the current time.
    #[must_use]
    pub fn new(
        route: impl Into<String>,
        principal_id: Option<String>,
        token_state: impl Into<String>,
        token_fingerprint: Option<String>,
    ) -> Self {
        Self {
            event: "gateway_auth",
            timestamp_ms: now_ms(),
            route: route.into(),
            allowed: principal_id.is_some(),
            principal_id,
            token_state: token_state.into(),
            token_fingerprint,
        }
    }
}

impl DeletionAuditEvent {
    /// Builds a deletion stage audit event stamped with the current time.
    #[must_use]
    pub fn new(
        principal_id: impl Into<String>,
        stage: &'static str,
        outcome: &'static str,
        detail: Option<String>,
    ) -> Self {
        Self {
            event: "member_deletion",
            timestamp_ms: now_ms(),
            principal_id: principal_id.into(),
            stage,
            outcome,
            detail,
        }
    }
}

impl SubscriberAuditEvent {
    /// Builds a subscriber audit event stamped with the current time.
    #[must_use]
    pub fn new(
        kind: &'static str,
        message_id: Option<String>,
        principal_id: Option<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            event: "deletion_subscriber",
            timestamp_ms: now_ms(),
            kind,
            message_id,
            principal_id,
            detail,
        }
    }
}

impl SecurityAuditEvent {
    /// Builds a security audit event stamped with the current time.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: Option<String>) -> Self {
        Self {
            event: "security",
            timestamp_ms: now_ms(),
            kind: kind.into(),
            message,
        }
    }
}

/// Returns the current time in epoch milliseconds.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_millis())
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for gateway events.
pub trait GatewayAuditSink: Send + Sync {
    /// Record an HTTP request event.
    fn record_request(&self, event: &RequestAuditEvent);

    /// Record an authentication decision.
    fn record_auth(&self, _event: &AuthAuditEvent) {}

    /// Record a member deletion stage transition.
    fn record_deletion(&self, _event: &DeletionAuditEvent) {}

    /// Record a deletion subscriber event.
    fn record_subscriber(&self, _event: &SubscriberAuditEvent) {}

    /// Record a security posture event.
    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

/// Serializes `event` as one JSON line into `writer`.
fn write_line<W: Write, T: Serialize>(writer: &mut W, event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(writer, "{payload}");
        let _ = writer.flush();
    }
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl GatewayAuditSink for StderrAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        write_line(&mut std::io::stderr(), event);
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        write_line(&mut std::io::stderr(), event);
    }

    fn record_deletion(&self, event: &DeletionAuditEvent) {
        write_line(&mut std::io::stderr(), event);
    }

    fn record_subscriber(&self, event: &SubscriberAuditEvent) {
        write_line(&mut std::io::stderr(), event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        write_line(&mut std::io::stderr(), event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Writes one event under the file lock.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(mut file) = self.file.lock() {
            write_line(&mut *file, event);
        }
    }
}

impl GatewayAuditSink for FileAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        self.append(event);
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        self.append(event);
    }

    fn record_deletion(&self, event: &DeletionAuditEvent) {
        self.append(event);
    }

    fn record_subscriber(&self, event: &SubscriberAuditEvent) {
        self.append(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl GatewayAuditSink for NoopAuditSink {
    fn record_request(&self, _event: &RequestAuditEvent) {}
}
