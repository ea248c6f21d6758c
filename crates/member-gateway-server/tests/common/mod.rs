// crates/member-gateway-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Fixtures
// Description: Fakes and a spawned gateway for HTTP-level tests.
// Purpose: Exercise the router end to end over loopback sockets.
// ============================================================================

//! Shared harness for member gateway server tests.

#![allow(dead_code, reason = "Each test binary uses a different subset of fixtures.")]

use std::collections::VecDeque;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use member_gateway_broker::InMemoryBroker;
use member_gateway_core::AuthAuditEvent;
use member_gateway_core::BackendAuth;
use member_gateway_core::BackendError;
use member_gateway_core::BackendGraphQl;
use member_gateway_core::BearerToken;
use member_gateway_core::DeletionAuditEvent;
use member_gateway_core::DeletionTimeouts;
use member_gateway_core::GatewayAuditSink;
use member_gateway_core::GraphQlRequest;
use member_gateway_core::IdentityError;
use member_gateway_core::IdentityProvider;
use member_gateway_core::InMemoryKeyValueStore;
use member_gateway_core::MemberDeletionCoordinator;
use member_gateway_core::Principal;
use member_gateway_core::PrincipalId;
use member_gateway_core::RequestAuditEvent;
use member_gateway_core::TokenVerifier;
use member_gateway_core::UserRecord;
use member_gateway_server::GatewayState;
use member_gateway_server::RequestMediator;
use member_gateway_server::build_router;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Verifier accepting `valid-<uid>` tokens.
pub struct PrefixVerifier;

#[async_trait]
impl TokenVerifier for PrefixVerifier {
    async fn verify_token(&self, token: &BearerToken) -> Result<Principal, IdentityError> {
        token
            .as_str()
            .strip_prefix("valid-")
            .map(Principal::new)
            .ok_or_else(|| IdentityError::Rejected("ID token has been revoked".to_string()))
    }
}

/// Identity admin fake recording calls.
#[derive(Default)]
pub struct FakeIdentity {
    pub calls: Mutex<Vec<String>>,
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
        Ok(())
    }

    async fn get_user(&self, id: &PrincipalId) -> Result<UserRecord, IdentityError> {
        self.calls.lock().unwrap().push(format!("get_user:{id}"));
        Ok(UserRecord {
            id: id.clone(),
            tokens_valid_after_ms: 1_700_000_000_000,
        })
    }

    async fn delete_user(&self, id: &PrincipalId) -> Result<(), IdentityError> {
        self.calls.lock().unwrap().push(format!("delete_user:{id}"));
        Ok(())
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Backend call as observed by the fake.
#[derive(Debug, Clone)]
pub struct BackendCall {
    pub request: GraphQlRequest,
    pub caller_token: Option<String>,
}

/// Backend fake replaying scripted results, then reporting deletion success.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<Value, BackendError>>>,
    calls: Mutex<Vec<BackendCall>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<Value, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendGraphQl for ScriptedBackend {
    async fn run(&self, request: &GraphQlRequest, auth: &BackendAuth) -> Result<Value, BackendError> {
        let caller_token = match auth {
            BackendAuth::Gateway => None,
            BackendAuth::Caller(token) => Some(token.as_str().to_string()),
        };
        self.calls.lock().unwrap().push(BackendCall {
            request: request.clone(),
            caller_token,
        });
        let reply = self.replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(json!({ "deleteMember": { "success": true } })))
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink keeping request, auth, and deletion events.
#[derive(Default)]
pub struct RecordingAudit {
    pub requests: Mutex<Vec<RequestAuditEvent>>,
    pub auth: Mutex<Vec<AuthAuditEvent>>,
    pub deletions: Mutex<Vec<DeletionAuditEvent>>,
}

impl RecordingAudit {
    pub fn requests(&self) -> Vec<RequestAuditEvent> {
        self.requests.lock().unwrap().clone()
    }

    pub fn auth_decisions(&self) -> Vec<bool> {
        self.auth.lock().unwrap().iter().map(|event| event.allowed).collect()
    }

    pub fn stages(&self) -> Vec<String> {
        self.deletions.lock().unwrap().iter().map(|event| event.stage.to_string()).collect()
    }
}

impl GatewayAuditSink for RecordingAudit {
    fn record_request(&self, event: &RequestAuditEvent) {
        self.requests.lock().unwrap().push(event.clone());
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        self.auth.lock().unwrap().push(event.clone());
    }

    fn record_deletion(&self, event: &DeletionAuditEvent) {
        self.deletions.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Legacy Upstream
// ============================================================================

/// Request observed by the legacy upstream.
#[derive(Debug, Clone)]
pub struct LegacyRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl LegacyRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(field, _)| field.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }
}

/// Scripted legacy REST upstream.
pub struct LegacyUpstream {
    pub base_url: String,
    observed: Arc<Mutex<Vec<LegacyRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl LegacyUpstream {
    /// Starts a server answering `(status, content_type, body)` replies in order.
    pub fn start(replies: Vec<(u16, &'static str, String)>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let handle = thread::spawn(move || {
            for (status, content_type, body) in replies {
                let Ok(mut request) = server.recv() else { return };
                let mut raw = String::new();
                let _ = request.as_reader().read_to_string(&mut raw);
                sink.lock().unwrap().push(LegacyRequest {
                    method: request.method().as_str().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|header| (header.field.as_str().as_str().to_string(), header.value.as_str().to_string()))
                        .collect(),
                    body: raw,
                });
                let content_type = Header::from_bytes("Content-Type", content_type).unwrap();
                let _ = request.respond(Response::from_string(body).with_status_code(status).with_header(content_type));
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            observed,
            handle: Some(handle),
        }
    }

    /// Waits for every scripted reply and returns the observed requests.
    pub fn finish(mut self) -> Vec<LegacyRequest> {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        self.observed.lock().unwrap().clone()
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Running gateway with handles on its fakes.
pub struct Gateway {
    pub base_url: String,
    pub client: reqwest::Client,
    pub audit: Arc<RecordingAudit>,
    pub identity: Arc<FakeIdentity>,
    pub backend: Arc<ScriptedBackend>,
    pub broker: Arc<InMemoryBroker>,
    pub metadata: Arc<InMemoryKeyValueStore>,
    pub state: Arc<GatewayState>,
}

impl Gateway {
    /// Spawns a gateway on a loopback port.
    pub async fn spawn(legacy_url: &str, backend: Arc<ScriptedBackend>) -> Self {
        let audit = Arc::new(RecordingAudit::default());
        let identity = Arc::new(FakeIdentity::default());
        let broker = Arc::new(InMemoryBroker::new(Duration::from_secs(30)));
        let metadata = Arc::new(InMemoryKeyValueStore::new());
        let coordinator = Arc::new(MemberDeletionCoordinator::new(
            identity.clone(),
            metadata.clone(),
            backend.clone(),
            broker.clone(),
            audit.clone(),
            DeletionTimeouts::default(),
        ));
        let mediator = RequestMediator::new(legacy_url, "/api/v0", Duration::from_secs(2), 64 * 1024).unwrap();
        let state = Arc::new(GatewayState {
            verifier: Arc::new(PrefixVerifier),
            backend: backend.clone(),
            coordinator,
            mediator: Arc::new(mediator),
            audit: audit.clone(),
            verify_timeout: Duration::from_secs(1),
            graphql_timeout: Duration::from_secs(1),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(Arc::clone(&state), 64 * 1024);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
        });
        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            audit,
            identity,
            backend,
            broker,
            metadata,
            state,
        }
    }

    /// Posts a GraphQL body to the member endpoint.
    pub async fn graphql(&self, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut request = self.client.post(format!("{}/api/v1/graphql/user", self.base_url)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }
}

/// Legacy target that nothing listens on.
pub const UNUSED_LEGACY: &str = "http://127.0.0.1:9";
