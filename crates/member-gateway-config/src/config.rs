// crates/member-gateway-config/src/config.rs
// ============================================================================
// Module: Member Gateway Configuration
// Description: Configuration loading and validation for the member gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Resolution order: explicit path, then `MEMBER_GATEWAY_CONFIG`, then
//! `member-gateway.toml` in the working directory.
//!
//! Every timeout is expressed in milliseconds and exposed as a
//! [`Duration`] accessor so callers never handle raw integers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "member-gateway.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "MEMBER_GATEWAY_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for any configured timeout.
const MAX_TIMEOUT_MS: u64 = 10 * 60 * 1000;
/// Upper bound for worker and queue sizing.
const MAX_POOL_SIZE: usize = 1024;
/// Default Pub/Sub REST endpoint.
const DEFAULT_PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";
/// Default legacy path prefix stripped before proxying.
const DEFAULT_LEGACY_PREFIX: &str = "/api/v0";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Secret
// ============================================================================

/// Secret string whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Member gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// HTTP listener configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity provider configuration.
    pub identity: IdentityConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Member backend and legacy backend configuration.
    pub backend: BackendConfig,
    /// Gateway credential source.
    pub gateway_credential: GatewayCredentialConfig,
    /// Message broker configuration.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.identity.validate()?;
        self.metadata.validate()?;
        self.backend.validate()?;
        self.gateway_credential.validate()?;
        self.broker.validate()?;
        self.audit.validate()
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum inbound request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.bind is not a socket address: {}", self.bind)))
    }

    /// Validates listener configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_body_bytes must be greater than zero".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Base URL of the identity admin API.
    pub base_url: String,
    /// Inline service credential presented to the identity API.
    #[serde(default)]
    pub credential_token: Option<Secret>,
    /// Path to a file holding the service credential.
    #[serde(default)]
    pub credential_path: Option<String>,
    /// Token verification deadline.
    #[serde(default = "default_verify_timeout_ms")]
    pub verify_timeout_ms: u64,
    /// Refresh token revocation deadline.
    #[serde(default = "default_admin_timeout_ms")]
    pub revoke_timeout_ms: u64,
    /// User deletion deadline.
    #[serde(default = "default_admin_timeout_ms")]
    pub disable_timeout_ms: u64,
}

impl IdentityConfig {
    /// Returns the verification deadline.
    #[must_use]
    pub const fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    /// Returns the revocation deadline.
    #[must_use]
    pub const fn revoke_timeout(&self) -> Duration {
        Duration::from_millis(self.revoke_timeout_ms)
    }

    /// Returns the user deletion deadline.
    #[must_use]
    pub const fn disable_timeout(&self) -> Duration {
        Duration::from_millis(self.disable_timeout_ms)
    }

    /// Validates identity configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_url("identity.base_url", &self.base_url)?;
        match (&self.credential_token, &self.credential_path) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "identity.credential_token and identity.credential_path are mutually exclusive".to_string(),
                ));
            }
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "identity requires credential_token or credential_path".to_string(),
                ));
            }
            (Some(token), None) if token.expose().trim().is_empty() => {
                return Err(ConfigError::Invalid("identity.credential_token must be non-empty".to_string()));
            }
            (None, Some(path)) => validate_path_string("identity.credential_path", path)?,
            (Some(_), None) => {}
        }
        validate_timeout("identity.verify_timeout_ms", self.verify_timeout_ms)?;
        validate_timeout("identity.revoke_timeout_ms", self.revoke_timeout_ms)?;
        validate_timeout("identity.disable_timeout_ms", self.disable_timeout_ms)
    }
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Metadata store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetadataStoreType {
    /// Process-local store.
    #[default]
    Memory,
    /// Realtime-database style REST store.
    Http,
}

/// Metadata store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataConfig {
    /// Store backend.
    #[serde(rename = "type", default)]
    pub store_type: MetadataStoreType,
    /// Base URL for the HTTP store.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bearer token for the HTTP store.
    #[serde(default)]
    pub auth_token: Option<Secret>,
    /// Request deadline.
    #[serde(default = "default_admin_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            store_type: MetadataStoreType::Memory,
            base_url: None,
            auth_token: None,
            timeout_ms: default_admin_timeout_ms(),
        }
    }
}

impl MetadataConfig {
    /// Returns the request deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates metadata configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("metadata.timeout_ms", self.timeout_ms)?;
        match self.store_type {
            MetadataStoreType::Memory => {
                if self.base_url.is_some() {
                    return Err(ConfigError::Invalid(
                        "metadata.base_url is only valid for type = \"http\"".to_string(),
                    ));
                }
                Ok(())
            }
            MetadataStoreType::Http => {
                let Some(base_url) = &self.base_url else {
                    return Err(ConfigError::Invalid("metadata.base_url is required for type = \"http\"".to_string()));
                };
                validate_url("metadata.base_url", base_url)
            }
        }
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Member and legacy backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// GraphQL endpoint of the member service.
    pub member_graphql_url: String,
    /// Base URL of the legacy REST service.
    pub legacy_url: String,
    /// Path prefix stripped before proxying to the legacy service.
    #[serde(default = "default_legacy_prefix")]
    pub legacy_prefix: String,
    /// Deadline for caller-initiated GraphQL calls.
    #[serde(default = "default_backend_timeout_ms")]
    pub graphql_timeout_ms: u64,
    /// Deadline for backend member deletion.
    #[serde(default = "default_backend_timeout_ms")]
    pub delete_timeout_ms: u64,
    /// Deadline for proxied legacy requests.
    #[serde(default = "default_legacy_timeout_ms")]
    pub legacy_timeout_ms: u64,
}

impl BackendConfig {
    /// Returns the caller-initiated GraphQL deadline.
    #[must_use]
    pub const fn graphql_timeout(&self) -> Duration {
        Duration::from_millis(self.graphql_timeout_ms)
    }

    /// Returns the backend delete deadline.
    #[must_use]
    pub const fn delete_timeout(&self) -> Duration {
        Duration::from_millis(self.delete_timeout_ms)
    }

    /// Returns the legacy proxy deadline.
    #[must_use]
    pub const fn legacy_timeout(&self) -> Duration {
        Duration::from_millis(self.legacy_timeout_ms)
    }

    /// Returns true when the legacy target uses plaintext HTTP.
    #[must_use]
    pub fn legacy_is_plaintext(&self) -> bool {
        Url::parse(&self.legacy_url).is_ok_and(|url| url.scheme() == "http")
    }

    /// Validates backend configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_url("backend.member_graphql_url", &self.member_graphql_url)?;
        validate_url("backend.legacy_url", &self.legacy_url)?;
        if !self.legacy_prefix.starts_with('/') || self.legacy_prefix.len() < 2 || self.legacy_prefix.ends_with('/') {
            return Err(ConfigError::Invalid(
                "backend.legacy_prefix must start with '/' and must not end with '/'".to_string(),
            ));
        }
        validate_timeout("backend.graphql_timeout_ms", self.graphql_timeout_ms)?;
        validate_timeout("backend.delete_timeout_ms", self.delete_timeout_ms)?;
        validate_timeout("backend.legacy_timeout_ms", self.legacy_timeout_ms)
    }
}

// ============================================================================
// SECTION: Gateway Credential
// ============================================================================

/// Gateway credential source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSourceType {
    /// Token supplied inline.
    Static,
    /// Token read from a JSON secret file.
    File,
}

/// Gateway credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayCredentialConfig {
    /// Credential source kind.
    pub source: CredentialSourceType,
    /// Inline token for the static source.
    #[serde(default)]
    pub token: Option<Secret>,
    /// Secret file path for the file source.
    #[serde(default)]
    pub path: Option<String>,
}

impl GatewayCredentialConfig {
    /// Validates credential configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            CredentialSourceType::Static => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "gateway_credential.path is only valid for source = \"file\"".to_string(),
                    ));
                }
                match &self.token {
                    Some(token) if !token.expose().trim().is_empty() => Ok(()),
                    _ => Err(ConfigError::Invalid(
                        "gateway_credential.token is required for source = \"static\"".to_string(),
                    )),
                }
            }
            CredentialSourceType::File => {
                if self.token.is_some() {
                    return Err(ConfigError::Invalid(
                        "gateway_credential.token is only valid for source = \"static\"".to_string(),
                    ));
                }
                let Some(path) = &self.path else {
                    return Err(ConfigError::Invalid(
                        "gateway_credential.path is required for source = \"file\"".to_string(),
                    ));
                };
                validate_path_string("gateway_credential.path", path)
            }
        }
    }
}

// ============================================================================
// SECTION: Broker
// ============================================================================

/// Message broker backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrokerType {
    /// Process-local broker.
    #[default]
    Memory,
    /// Google Cloud Pub/Sub REST API.
    Pubsub,
}

/// Message broker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Broker backend.
    #[serde(rename = "type", default)]
    pub broker_type: BrokerType,
    /// Cloud project identifier.
    #[serde(default)]
    pub project: Option<String>,
    /// Topic receiving deletion retries.
    #[serde(default)]
    pub topic: Option<String>,
    /// Subscription consumed by the deletion subscriber.
    #[serde(default)]
    pub subscription: Option<String>,
    /// REST endpoint.
    #[serde(default = "default_pubsub_endpoint")]
    pub endpoint: String,
    /// OAuth access token for the REST API.
    #[serde(default)]
    pub access_token: Option<Secret>,
    /// Per-request deadline.
    #[serde(default = "default_admin_timeout_ms")]
    pub request_timeout_ms: u64,
    /// In-memory ack deadline before redelivery.
    #[serde(default = "default_ack_deadline_ms")]
    pub ack_deadline_ms: u64,
    /// Whether the deletion subscriber runs in this process.
    #[serde(default = "default_true")]
    pub subscriber_enabled: bool,
    /// Maximum deliveries per pull.
    #[serde(default = "default_pull_batch")]
    pub pull_batch: usize,
    /// Subscriber worker count.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Subscriber queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Delay after an empty pull.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            broker_type: BrokerType::Memory,
            project: None,
            topic: None,
            subscription: None,
            endpoint: default_pubsub_endpoint(),
            access_token: None,
            request_timeout_ms: default_admin_timeout_ms(),
            ack_deadline_ms: default_ack_deadline_ms(),
            subscriber_enabled: true,
            pull_batch: default_pull_batch(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            idle_backoff_ms: default_idle_backoff_ms(),
        }
    }
}

impl BrokerConfig {
    /// Returns the per-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Returns the in-memory ack deadline.
    #[must_use]
    pub const fn ack_deadline(&self) -> Duration {
        Duration::from_millis(self.ack_deadline_ms)
    }

    /// Returns the idle backoff.
    #[must_use]
    pub const fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Validates broker configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("broker.request_timeout_ms", self.request_timeout_ms)?;
        validate_timeout("broker.ack_deadline_ms", self.ack_deadline_ms)?;
        validate_timeout("broker.idle_backoff_ms", self.idle_backoff_ms)?;
        validate_pool("broker.pull_batch", self.pull_batch)?;
        validate_pool("broker.workers", self.workers)?;
        validate_pool("broker.queue_capacity", self.queue_capacity)?;
        if self.broker_type == BrokerType::Pubsub {
            for (field, value) in [
                ("broker.project", &self.project),
                ("broker.topic", &self.topic),
                ("broker.subscription", &self.subscription),
            ] {
                match value {
                    Some(name) if is_resource_name(name) => {}
                    Some(_) => return Err(ConfigError::Invalid(format!("{field} contains invalid characters"))),
                    None => return Err(ConfigError::Invalid(format!("{field} is required for type = \"pubsub\""))),
                }
            }
            validate_url("broker.endpoint", &self.endpoint)?;
            if self.access_token.is_none() {
                return Err(ConfigError::Invalid("broker.access_token is required for type = \"pubsub\"".to_string()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkType {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// Append-only JSON lines file.
    File,
    /// Discard events.
    None,
}

/// Audit configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkType,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkType::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkType::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for sink = \"file\"".to_string()))
            }
            (_, Some(_)) => Err(ConfigError::Invalid("audit.path is only valid for sink = \"file\"".to_string())),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Default inbound body limit.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default token verification deadline.
const fn default_verify_timeout_ms() -> u64 {
    5_000
}

/// Default deadline for identity admin, metadata, and broker calls.
const fn default_admin_timeout_ms() -> u64 {
    10_000
}

/// Default backend GraphQL deadline.
const fn default_backend_timeout_ms() -> u64 {
    5_000
}

/// Default legacy proxy deadline.
const fn default_legacy_timeout_ms() -> u64 {
    30_000
}

/// Default in-memory ack deadline.
const fn default_ack_deadline_ms() -> u64 {
    30_000
}

/// Default legacy prefix.
fn default_legacy_prefix() -> String {
    DEFAULT_LEGACY_PREFIX.to_string()
}

/// Default Pub/Sub endpoint.
fn default_pubsub_endpoint() -> String {
    DEFAULT_PUBSUB_ENDPOINT.to_string()
}

/// Default for opt-out booleans.
const fn default_true() -> bool {
    true
}

/// Default pull batch size.
const fn default_pull_batch() -> usize {
    10
}

/// Default worker count.
const fn default_workers() -> usize {
    4
}

/// Default subscriber queue capacity.
const fn default_queue_capacity() -> usize {
    64
}

/// Default idle backoff.
const fn default_idle_backoff_ms() -> u64 {
    1_000
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from explicit input or environment.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Validates an absolute http(s) URL.
fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!("{field} must use http or https")));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    Ok(())
}

/// Validates a timeout in milliseconds.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {MAX_TIMEOUT_MS}")));
    }
    Ok(())
}

/// Validates a pool or batch size.
fn validate_pool(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_POOL_SIZE {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {MAX_POOL_SIZE}")));
    }
    Ok(())
}

/// Returns true for cloud resource names safe to embed in URL paths.
fn is_resource_name(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 255
        && value.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~' | '+' | '%'))
}
