// crates/member-gateway-broker/src/pubsub.rs
// ============================================================================
// Module: Pub/Sub REST Broker
// Description: MessageBroker backed by the Google Cloud Pub/Sub REST API.
// Purpose: Publish, pull, and acknowledge deletion retries over HTTPS.
// Dependencies: member-gateway-core, reqwest, serde
// ============================================================================

//! ## Overview
//! The adapter talks to the `v1` REST surface:
//!
//! - `topics/{topic}:publish` with attribute-only messages,
//! - `subscriptions/{subscription}:pull` for synchronous pull,
//! - `subscriptions/{subscription}:acknowledge` for explicit acks.
//!
//! Throttling and server errors map to recoverable [`BrokerError`] variants;
//! authorization and missing-resource errors are fatal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use member_gateway_core::AckId;
use member_gateway_core::BrokerError;
use member_gateway_core::MessageBroker;
use member_gateway_core::MessageId;
use member_gateway_core::ReceivedMessage;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum error body excerpt carried in rejections.
const MAX_ERROR_EXCERPT: usize = 256;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Pub/Sub adapter configuration.
#[derive(Clone)]
pub struct PubSubConfig {
    /// REST endpoint, e.g. `https://pubsub.googleapis.com`.
    pub endpoint: String,
    /// Cloud project identifier.
    pub project: String,
    /// Topic receiving published messages.
    pub topic: String,
    /// Subscription consumed by pulls.
    pub subscription: String,
    /// OAuth access token.
    pub access_token: String,
    /// Per-request deadline.
    pub request_timeout: Duration,
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Publish request body.
#[derive(Serialize)]
struct PublishRequest<'a> {
    /// Messages to publish.
    messages: [OutboundMessage<'a>; 1],
}

/// One outbound message.
#[derive(Serialize)]
struct OutboundMessage<'a> {
    /// Message attributes.
    attributes: &'a BTreeMap<String, String>,
}

/// Publish response body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    /// Assigned message identifiers.
    #[serde(default)]
    message_ids: Vec<String>,
}

/// Pull request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequest {
    /// Maximum deliveries to return.
    max_messages: usize,
}

/// Pull response body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    /// Deliveries; absent when nothing is available.
    #[serde(default)]
    received_messages: Vec<WireReceivedMessage>,
}

/// One delivery on the wire.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReceivedMessage {
    /// Lease handle.
    ack_id: String,
    /// Message payload.
    message: WireMessage,
    /// Delivery attempt (only set with dead-letter policies).
    #[serde(default)]
    delivery_attempt: Option<u32>,
}

/// Message payload on the wire.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    /// Message identifier.
    message_id: String,
    /// Message attributes.
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

/// Acknowledge request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeRequest<'a> {
    /// Lease handles to acknowledge.
    ack_ids: Vec<&'a str>,
}

/// Empty response body.
#[derive(Deserialize)]
struct Empty {}

// ============================================================================
// SECTION: Broker
// ============================================================================

/// Pub/Sub REST broker.
pub struct PubSubBroker {
    /// HTTP client with deadlines applied.
    client: Client,
    /// Bearer token.
    access_token: String,
    /// Fully qualified publish URL.
    publish_url: String,
    /// Fully qualified pull URL.
    pull_url: String,
    /// Fully qualified acknowledge URL.
    acknowledge_url: String,
}

impl PubSubBroker {
    /// Builds a broker from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Rejected`] when the HTTP client cannot be built.
    pub fn new(config: PubSubConfig) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| BrokerError::Rejected(err.to_string()))?;
        let endpoint = config.endpoint.trim_end_matches('/');
        let project = format!("{endpoint}/v1/projects/{}", config.project);
        let subscription = format!("{project}/subscriptions/{}", config.subscription);
        Ok(Self {
            client,
            access_token: config.access_token,
            publish_url: format!("{project}/topics/{}:publish", config.topic),
            pull_url: format!("{subscription}:pull"),
            acknowledge_url: format!("{subscription}:acknowledge"),
        })
    }

    /// Posts a JSON body and decodes the JSON response.
    async fn post<B: Serialize + Sync, R: DeserializeOwned>(&self, url: &str, body: &B) -> Result<R, BrokerError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let excerpt = response.text().await.unwrap_or_default();
            return Err(map_status(status, &excerpt));
        }
        response.json::<R>().await.map_err(|err| BrokerError::Rejected(format!("invalid response: {err}")))
    }
}

#[async_trait]
impl MessageBroker for PubSubBroker {
    async fn publish(&self, attributes: &BTreeMap<String, String>) -> Result<MessageId, BrokerError> {
        let request = PublishRequest {
            messages: [OutboundMessage {
                attributes,
            }],
        };
        let response: PublishResponse = self.post(&self.publish_url, &request).await?;
        response
            .message_ids
            .into_iter()
            .next()
            .map(MessageId::new)
            .ok_or_else(|| BrokerError::Rejected("publish returned no message id".to_string()))
    }

    async fn pull(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, BrokerError> {
        let response: PullResponse = self
            .post(&self.pull_url, &PullRequest {
                max_messages,
            })
            .await?;
        Ok(response
            .received_messages
            .into_iter()
            .map(|received| ReceivedMessage {
                ack_id: AckId::new(received.ack_id),
                message_id: MessageId::new(received.message.message_id),
                attributes: received.message.attributes,
                delivery_attempt: received.delivery_attempt.unwrap_or(1),
            })
            .collect())
    }

    async fn acknowledge(&self, ack_ids: &[AckId]) -> Result<(), BrokerError> {
        if ack_ids.is_empty() {
            return Ok(());
        }
        let request = AcknowledgeRequest {
            ack_ids: ack_ids.iter().map(AckId::as_str).collect(),
        };
        let _: Empty = self.post(&self.acknowledge_url, &request).await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// Maps a transport failure to a broker error.
fn map_transport_error(err: reqwest::Error) -> BrokerError {
    if err.is_timeout() { BrokerError::Timeout } else { BrokerError::Unavailable(err.to_string()) }
}

/// Maps a non-success status to a broker error.
fn map_status(status: StatusCode, body: &str) -> BrokerError {
    let excerpt: String = body.chars().take(MAX_ERROR_EXCERPT).collect();
    let message = format!("status {}: {excerpt}", status.as_u16());
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
        BrokerError::Unavailable(message)
    } else {
        BrokerError::Rejected(message)
    }
}
