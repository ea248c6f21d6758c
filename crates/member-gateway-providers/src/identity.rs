// crates/member-gateway-providers/src/identity.rs
// ============================================================================
// Module: HTTP Identity Provider
// Description: Token verification and user administration over REST.
// Purpose: Implement TokenVerifier and IdentityProvider for the gateway.
// Dependencies: member-gateway-core, reqwest, serde, url
// ============================================================================

//! ## Overview
//! The identity service exposes an admin REST surface authenticated with the
//! gateway's service credential:
//!
//! | Operation        | Request                                              |
//! |------------------|------------------------------------------------------|
//! | verify token     | `POST /v1/tokens:verify` `{idToken, checkRevoked}`   |
//! | revoke refresh   | `POST /v1/users/{uid}:revokeRefreshTokens`           |
//! | get user         | `GET /v1/users/{uid}`                                |
//! | delete user      | `DELETE /v1/users/{uid}`                             |
//!
//! Verification always asks for the revocation check. Client errors on
//! verification are rejections whose message becomes the caller's token state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use member_gateway_core::BearerToken;
use member_gateway_core::IdentityError;
use member_gateway_core::IdentityProvider;
use member_gateway_core::Principal;
use member_gateway_core::PrincipalId;
use member_gateway_core::TokenVerifier;
use member_gateway_core::UserRecord;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::http::build_client;
use crate::http::error_message;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Identity adapter configuration.
#[derive(Clone)]
pub struct HttpIdentityConfig {
    /// Service base URL.
    pub base_url: String,
    /// Service credential presented as a bearer token.
    pub credential: String,
    /// Per-request deadline applied by the client.
    pub request_timeout: Duration,
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Verify request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    /// Token under verification.
    id_token: &'a str,
    /// Always true; revoked tokens must fail.
    check_revoked: bool,
}

/// Verify response body.
#[derive(Deserialize)]
struct VerifyResponse {
    /// Verified subject.
    uid: String,
}

/// User record body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    /// User subject.
    uid: String,
    /// Epoch milliseconds after which tokens are valid.
    #[serde(default)]
    tokens_valid_after_millis: i64,
}

// ============================================================================
// SECTION: Provider
// ============================================================================

/// REST identity provider adapter.
pub struct HttpIdentityProvider {
    /// HTTP client with deadlines applied.
    client: Client,
    /// Parsed base URL.
    base_url: Url,
    /// Service credential.
    credential: String,
}

impl HttpIdentityProvider {
    /// Builds the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Unavailable`] when the base URL is invalid or
    /// the client cannot be built.
    pub fn new(config: HttpIdentityConfig) -> Result<Self, IdentityError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| IdentityError::Unavailable(format!("invalid base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(IdentityError::Unavailable("base url cannot carry a path".to_string()));
        }
        let client = build_client(config.request_timeout).map_err(IdentityError::Unavailable)?;
        Ok(Self {
            client,
            base_url,
            credential: config.credential,
        })
    }

    /// Builds `{base}/v1/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1");
            path.extend(segments);
        }
        url
    }

    /// Sends a request with the service credential attached.
    async fn send(&self, request: RequestBuilder) -> Result<Response, IdentityError> {
        request.bearer_auth(&self.credential).send().await.map_err(|err| {
            if err.is_timeout() {
                IdentityError::Unavailable("identity request timed out".to_string())
            } else {
                IdentityError::Unavailable(err.to_string())
            }
        })
    }

    /// Maps a non-success admin response to an error.
    async fn admin_failure(id: &PrincipalId, response: Response) -> IdentityError {
        let status = response.status();
        let message = error_message(&response.text().await.unwrap_or_default());
        if status == StatusCode::NOT_FOUND {
            IdentityError::NotFound(id.to_string())
        } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            IdentityError::Unavailable(format!("status {}: {message}", status.as_u16()))
        } else {
            IdentityError::Rejected(message)
        }
    }
}

#[async_trait]
impl TokenVerifier for HttpIdentityProvider {
    async fn verify_token(&self, token: &BearerToken) -> Result<Principal, IdentityError> {
        let url = self.endpoint(&["tokens:verify"]);
        let body = VerifyRequest {
            id_token: token.as_str(),
            check_revoked: true,
        };
        let response = self.send(self.client.post(url).json(&body)).await?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(&response.text().await.unwrap_or_default());
            return Err(if status.is_server_error() {
                IdentityError::Unavailable(format!("status {}: {message}", status.as_u16()))
            } else {
                IdentityError::Rejected(message)
            });
        }
        let verified: VerifyResponse =
            response.json().await.map_err(|err| IdentityError::Unavailable(format!("invalid verify response: {err}")))?;
        let id = PrincipalId::new(verified.uid);
        if id.is_empty() {
            return Err(IdentityError::Rejected("verified token carries no subject".to_string()));
        }
        Ok(Principal::new(id))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn revoke_refresh_tokens(&self, id: &PrincipalId) -> Result<(), IdentityError> {
        let url = self.endpoint(&["users", &format!("{id}:revokeRefreshTokens")]);
        let response = self.send(self.client.post(url).json(&serde_json::json!({}))).await?;
        if response.status().is_success() { Ok(()) } else { Err(Self::admin_failure(id, response).await) }
    }

    async fn get_user(&self, id: &PrincipalId) -> Result<UserRecord, IdentityError> {
        let url = self.endpoint(&["users", id.as_str()]);
        let response = self.send(self.client.get(url)).await?;
        if !response.status().is_success() {
            return Err(Self::admin_failure(id, response).await);
        }
        let user: UserResponse =
            response.json().await.map_err(|err| IdentityError::Unavailable(format!("invalid user response: {err}")))?;
        Ok(UserRecord {
            id: PrincipalId::new(user.uid),
            tokens_valid_after_ms: user.tokens_valid_after_millis,
        })
    }

    async fn delete_user(&self, id: &PrincipalId) -> Result<(), IdentityError> {
        let url = self.endpoint(&["users", id.as_str()]);
        let response = self.send(self.client.delete(url)).await?;
        if response.status().is_success() { Ok(()) } else { Err(Self::admin_failure(id, response).await) }
    }
}
