// crates/member-gateway-providers/tests/common/mod.rs
// ============================================================================
// Module: Provider Test Fixtures
// Description: Scripted tiny_http upstream recording adapter requests.
// Purpose: Drive HTTP adapters without external services.
// ============================================================================

//! Shared fake upstream for provider integration tests.

#![allow(dead_code, reason = "Each test binary uses a different subset of fixtures.")]

use std::io::Read;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use serde_json::Value;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Request observed by the fake upstream.
#[derive(Debug, Clone)]
pub struct Observed {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Scripted upstream answering one canned reply per request.
pub struct FakeUpstream {
    pub base_url: String,
    observed: Arc<Mutex<Vec<Observed>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeUpstream {
    /// Starts a server answering `replies` in order, then exiting.
    pub fn start(replies: Vec<(u16, String)>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let handle = thread::spawn(move || {
            for (status, body) in replies {
                let Ok(mut request) = server.recv() else { return };
                let mut raw = String::new();
                let _ = request.as_reader().read_to_string(&mut raw);
                let authorization = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Authorization"))
                    .map(|header| header.value.as_str().to_string());
                sink.lock().unwrap().push(Observed {
                    method: request.method().as_str().to_string(),
                    url: request.url().to_string(),
                    authorization,
                    body: serde_json::from_str(&raw).unwrap_or(Value::Null),
                });
                let content_type = Header::from_bytes("Content-Type", "application/json").unwrap();
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
    pub fn finish(mut self) -> Vec<Observed> {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        self.observed.lock().unwrap().clone()
    }
}
