// crates/member-gateway-server/src/proxy.rs
// ============================================================================
// Module: Legacy Request Mediator
// Description: Reverse proxy to the legacy REST backend with response
//              enveloping.
// Purpose: Forward `/api/v0/*` traffic and report the caller's token state
//          alongside every backend payload.
// Dependencies: axum, bytes, member-gateway-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! The mediator strips the route prefix, joins the remainder onto the target
//! path with exactly one slash, merges query strings, and forwards the
//! buffered request. The backend response is buffered in full and rewritten
//! as `{"tokenState": .., "data": ..}` with a recomputed `Content-Length`.
//! A failure anywhere produces an error reply; a partial envelope is never
//! written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::body::to_bytes;
use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::Response;
use bytes::Bytes;
use member_gateway_core::GatewayError;
use member_gateway_core::TOKEN_STATE_UNAVAILABLE;
use member_gateway_core::TokenCache;
use reqwest::Client;
use reqwest::redirect::Policy;
use serde::Serialize;
use serde_json::value::RawValue;
use thiserror::Error;
use url::Url;

use crate::error::ErrorReply;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Headers scoped to a single connection, never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forwarded-for header name.
const X_FORWARDED_FOR: &str = "x-forwarded-for";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Proxy failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Mediator configuration is invalid.
    #[error("invalid proxy target: {0}")]
    Config(String),
    /// Inbound body exceeded the limit or could not be read.
    #[error("request body rejected: {0}")]
    RequestBody(String),
    /// Backend did not answer before the deadline.
    #[error("legacy backend timed out")]
    Timeout,
    /// Backend could not be reached.
    #[error("legacy backend unavailable: {0}")]
    Upstream(String),
    /// Backend body could not be read.
    #[error("legacy response body unreadable: {0}")]
    ResponseBody(String),
    /// Envelope could not be encoded.
    #[error("envelope marshal error: {0}")]
    Envelope(String),
}

impl ProxyError {
    /// Converts the failure to an error reply.
    #[must_use]
    pub fn reply(&self) -> ErrorReply {
        match self {
            Self::RequestBody(_) => ErrorReply::new(StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            Self::Config(_) => ErrorReply::new(StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Self::Timeout => ErrorReply::from_gateway(&GatewayError::UpstreamTimeout("legacy backend".to_string())),
            Self::Upstream(_) | Self::ResponseBody(_) => {
                ErrorReply::from_gateway(&GatewayError::UpstreamUnavailable(self.to_string()))
            }
            Self::Envelope(message) => ErrorReply::from_gateway(&GatewayError::EnvelopeMarshal(message.clone())),
        }
    }
}

// ============================================================================
// SECTION: URL Rewriting
// ============================================================================

/// Joins two path fragments with exactly one slash between them.
#[must_use]
pub fn single_joining_slash(left: &str, right: &str) -> String {
    match (left.ends_with('/'), right.starts_with('/')) {
        (true, true) => format!("{left}{}", &right[1 ..]),
        (false, false) => format!("{left}/{right}"),
        _ => format!("{left}{right}"),
    }
}

/// Merges the target's query with the inbound query using `&`.
#[must_use]
pub fn merge_query(target: Option<&str>, inbound: Option<&str>) -> Option<String> {
    match (target.filter(|query| !query.is_empty()), inbound.filter(|query| !query.is_empty())) {
        (Some(target), Some(inbound)) => Some(format!("{target}&{inbound}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

/// Computes the backend URL for an inbound path and query.
#[must_use]
pub fn rewrite_target(target: &Url, prefix: &str, path: &str, query: Option<&str>) -> Url {
    let remainder = path.strip_prefix(prefix).unwrap_or(path);
    let mut url = target.clone();
    url.set_path(&single_joining_slash(target.path(), remainder));
    url.set_query(merge_query(target.query(), query).as_deref());
    url
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Envelope payload.
#[derive(Serialize)]
#[serde(untagged)]
enum EnvelopeData<'a> {
    /// Body was valid JSON and is embedded verbatim.
    Raw(&'a RawValue),
    /// Body was not JSON and is embedded as a string.
    Text(String),
}

/// Envelope wrapping a legacy response.
#[derive(Serialize)]
struct Envelope<'a> {
    /// Caller token state label.
    #[serde(rename = "tokenState")]
    token_state: &'a str,
    /// Backend payload; omitted for empty bodies.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<EnvelopeData<'a>>,
}

/// Wraps `body` in a token-state envelope.
///
/// # Errors
///
/// Returns [`ProxyError::Envelope`] when serialization fails.
pub fn envelope(token_state: &str, body: &[u8]) -> Result<Vec<u8>, ProxyError> {
    let data = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<&RawValue>(body) {
            Ok(raw) => Some(EnvelopeData::Raw(raw)),
            Err(_) => Some(EnvelopeData::Text(String::from_utf8_lossy(body).into_owned())),
        }
    };
    serde_json::to_vec(&Envelope {
        token_state,
        data,
    })
    .map_err(|err| ProxyError::Envelope(err.to_string()))
}

// ============================================================================
// SECTION: Mediator
// ============================================================================

/// Reverse proxy toward the legacy REST backend.
pub struct RequestMediator {
    /// HTTP client with the legacy deadline applied.
    client: Client,
    /// Target base URL.
    target: Url,
    /// Route prefix removed before joining.
    prefix: String,
    /// Maximum inbound body size.
    max_body_bytes: usize,
}

impl RequestMediator {
    /// Builds a mediator for `target`, stripping `prefix` from inbound paths.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Config`] when the target is not an absolute
    /// http(s) URL or the client cannot be built.
    pub fn new(target: &str, prefix: &str, timeout: Duration, max_body_bytes: usize) -> Result<Self, ProxyError> {
        let target = Url::parse(target).map_err(|err| ProxyError::Config(err.to_string()))?;
        if !matches!(target.scheme(), "http" | "https") || target.cannot_be_a_base() {
            return Err(ProxyError::Config("target must be an http(s) base url".to_string()));
        }
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| ProxyError::Config(err.to_string()))?;
        Ok(Self {
            client,
            target,
            prefix: prefix.to_string(),
            max_body_bytes,
        })
    }

    /// Returns the backend URL for an inbound path and query.
    #[must_use]
    pub fn target_for(&self, path: &str, query: Option<&str>) -> Url {
        rewrite_target(&self.target, &self.prefix, path, query)
    }

    /// Forwards `request` and returns the enveloped backend response.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError`] when the body cannot be read, the backend
    /// fails, or the envelope cannot be built.
    pub async fn forward(&self, request: Request, cache: Option<&TokenCache>) -> Result<Response, ProxyError> {
        let url = self.target_for(request.uri().path(), request.uri().query());
        let method = request.method().clone();
        let peer = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
        let headers = outbound_headers(request.headers(), peer);
        let body = to_bytes(request.into_body(), self.max_body_bytes)
            .await
            .map_err(|err| ProxyError::RequestBody(err.to_string()))?;

        let upstream = self.client.request(method, url).headers(headers).body(body).send().await.map_err(|err| {
            if err.is_timeout() { ProxyError::Timeout } else { ProxyError::Upstream(err.to_string()) }
        })?;
        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        let payload: Bytes = upstream.bytes().await.map_err(|err| {
            if err.is_timeout() { ProxyError::Timeout } else { ProxyError::ResponseBody(err.to_string()) }
        })?;

        let token_state = match cache {
            Some(cache) => cache.state().await.label().to_string(),
            None => TOKEN_STATE_UNAVAILABLE.to_string(),
        };
        let wrapped = envelope(&token_state, &payload)?;

        strip_hop_by_hop(&mut response_headers);
        response_headers.remove(header::CONTENT_ENCODING);
        response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(wrapped.len()));
        let mut response = Response::new(Body::from(wrapped));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Builds the forwarded header set.
fn outbound_headers(inbound: &HeaderMap, peer: Option<std::net::IpAddr>) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::ACCEPT_ENCODING);
    if !headers.contains_key(header::USER_AGENT) {
        headers.insert(header::USER_AGENT, HeaderValue::from_static(""));
    }
    if let Some(peer) = peer {
        let forwarded = match headers.get(X_FORWARDED_FOR).and_then(|value| value.to_str().ok()) {
            Some(prior) => format!("{prior}, {peer}"),
            None => peer.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
    headers
}

/// Removes hop-by-hop headers, including those named by `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in &named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
