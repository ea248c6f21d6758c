// crates/member-gateway-server/src/server.rs
// ============================================================================
// Module: Gateway Server
// Description: Dependency wiring and HTTP serving for the member gateway.
// Purpose: Build every adapter from configuration and run the router next to
//          the deferred-deletion subscriber.
// Dependencies: axum, member-gateway-{broker,config,core,providers}, tokio,
//               tokio-util
// ============================================================================

//! ## Overview
//! [`GatewayServer::from_config`] validates configuration and constructs each
//! adapter explicitly; nothing is global. [`GatewayServer::serve`] binds the
//! listener, starts the subscriber under a child cancellation token, and
//! shuts both down when the caller's token fires. Retry publishes started by
//! the deletion coordinator are drained before `serve` returns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use member_gateway_broker::InMemoryBroker;
use member_gateway_broker::PubSubBroker;
use member_gateway_broker::PubSubConfig;
use member_gateway_config::AuditConfig;
use member_gateway_config::AuditSinkType;
use member_gateway_config::BrokerConfig;
use member_gateway_config::BrokerType;
use member_gateway_config::CredentialSourceType;
use member_gateway_config::GatewayConfig;
use member_gateway_config::MetadataConfig;
use member_gateway_config::MetadataStoreType;
use member_gateway_core::CredentialSource;
use member_gateway_core::DeletionSubscriber;
use member_gateway_core::DeletionTimeouts;
use member_gateway_core::FileAuditSink;
use member_gateway_core::GatewayAuditSink;
use member_gateway_core::GatewayCredentialHandle;
use member_gateway_core::InMemoryKeyValueStore;
use member_gateway_core::KeyValueStore;
use member_gateway_core::MemberDeletionCoordinator;
use member_gateway_core::MessageBroker;
use member_gateway_core::NoopAuditSink;
use member_gateway_core::SecurityAuditEvent;
use member_gateway_core::StderrAuditSink;
use member_gateway_core::SubscriberConfig;
use member_gateway_providers::FileCredentialSource;
use member_gateway_providers::HttpBackendGraphQl;
use member_gateway_providers::HttpIdentityConfig;
use member_gateway_providers::HttpIdentityProvider;
use member_gateway_providers::HttpKeyValueStore;
use member_gateway_providers::HttpMetadataConfig;
use member_gateway_providers::StaticCredentialSource;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::GatewayServerError;
use crate::proxy::RequestMediator;
use crate::routes::build_router;
use crate::state::GatewayState;

// ============================================================================
// SECTION: Gateway Server
// ============================================================================

/// Member gateway server instance.
pub struct GatewayServer {
    /// Listener address.
    bind: SocketAddr,
    /// Maximum inbound body size.
    max_body_bytes: usize,
    /// Shared handler state.
    state: Arc<GatewayState>,
    /// Deferred-deletion subscriber when enabled.
    subscriber: Option<DeletionSubscriber>,
}

impl GatewayServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError::Config`] when configuration is invalid
    /// and [`GatewayServerError::Init`] when an adapter cannot be built.
    pub async fn from_config(config: GatewayConfig) -> Result<Self, GatewayServerError> {
        config.validate().map_err(|err| GatewayServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| GatewayServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config.audit)?;

        let identity_credential = match (&config.identity.credential_token, &config.identity.credential_path) {
            (Some(token), _) => token.expose().to_string(),
            (None, Some(path)) => FileCredentialSource::new(path)
                .fetch()
                .await
                .map_err(|err| GatewayServerError::Init(format!("identity credential: {err}")))?
                .token()
                .as_str()
                .to_string(),
            (None, None) => return Err(GatewayServerError::Config("identity credential missing".to_string())),
        };
        let identity_timeout = config
            .identity
            .verify_timeout()
            .max(config.identity.revoke_timeout())
            .max(config.identity.disable_timeout())
            .max(config.metadata.timeout());
        let identity = Arc::new(
            HttpIdentityProvider::new(HttpIdentityConfig {
                base_url: config.identity.base_url.clone(),
                credential: identity_credential,
                request_timeout: identity_timeout,
            })
            .map_err(|err| GatewayServerError::Init(err.to_string()))?,
        );

        let metadata = build_metadata_store(&config.metadata)?;

        let credential_source: Arc<dyn CredentialSource> = match config.gateway_credential.source {
            CredentialSourceType::Static => {
                let token = config
                    .gateway_credential
                    .token
                    .as_ref()
                    .ok_or_else(|| GatewayServerError::Config("gateway_credential.token missing".to_string()))?;
                Arc::new(StaticCredentialSource::new(token.expose(), None))
            }
            CredentialSourceType::File => {
                let path = config
                    .gateway_credential
                    .path
                    .as_ref()
                    .ok_or_else(|| GatewayServerError::Config("gateway_credential.path missing".to_string()))?;
                Arc::new(FileCredentialSource::new(path))
            }
        };
        let credential = Arc::new(GatewayCredentialHandle::new(credential_source, Arc::clone(&audit)));
        let backend = Arc::new(
            HttpBackendGraphQl::new(
                config.backend.member_graphql_url.clone(),
                credential,
                config.backend.graphql_timeout().max(config.backend.delete_timeout()),
            )
            .map_err(|err| GatewayServerError::Init(err.to_string()))?,
        );

        let broker = build_broker(&config.broker)?;
        let coordinator = Arc::new(MemberDeletionCoordinator::new(
            identity.clone(),
            metadata,
            backend.clone(),
            Arc::clone(&broker),
            Arc::clone(&audit),
            DeletionTimeouts {
                revoke: config.identity.revoke_timeout(),
                record_revocation: config.metadata.timeout(),
                disable: config.identity.disable_timeout(),
                backend_delete: config.backend.delete_timeout(),
                publish: config.broker.request_timeout(),
            },
        ));

        let mediator = RequestMediator::new(
            &config.backend.legacy_url,
            &config.backend.legacy_prefix,
            config.backend.legacy_timeout(),
            config.server.max_body_bytes,
        )
        .map_err(|err| GatewayServerError::Init(err.to_string()))?;
        if config.backend.legacy_is_plaintext() {
            audit.record_security(&SecurityAuditEvent::new(
                "legacy_plaintext",
                Some(format!("legacy backend {} is reached over plain http", config.backend.legacy_url)),
            ));
        }

        let subscriber = config.broker.subscriber_enabled.then(|| {
            DeletionSubscriber::new(Arc::clone(&broker), backend.clone(), Arc::clone(&audit), SubscriberConfig {
                pull_batch: config.broker.pull_batch,
                workers: config.broker.workers,
                queue_capacity: config.broker.queue_capacity,
                pull_timeout: config.broker.request_timeout(),
                ack_timeout: config.broker.request_timeout(),
                backend_timeout: config.backend.delete_timeout(),
                idle_backoff: config.broker.idle_backoff(),
            })
        });

        let state = Arc::new(GatewayState {
            verifier: identity,
            backend,
            coordinator,
            mediator: Arc::new(mediator),
            audit,
            verify_timeout: config.identity.verify_timeout(),
            graphql_timeout: config.backend.graphql_timeout(),
        });
        Ok(Self {
            bind,
            max_body_bytes: config.server.max_body_bytes,
            state,
            subscriber,
        })
    }

    /// Returns the shared handler state.
    #[must_use]
    pub fn state(&self) -> Arc<GatewayState> {
        Arc::clone(&self.state)
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError::Transport`] when binding or serving fails.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), GatewayServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| GatewayServerError::Transport(format!("bind {} failed: {err}", self.bind)))?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError::Transport`] when serving fails.
    pub async fn serve_listener(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), GatewayServerError> {
        let subscriber_cancel = shutdown.child_token();
        let subscriber = self.subscriber.map(|subscriber| {
            let cancel = subscriber_cancel.clone();
            let audit = Arc::clone(&self.state.audit);
            tokio::spawn(async move {
                if let Err(err) = subscriber.run(cancel).await {
                    audit.record_security(&SecurityAuditEvent::new("subscriber_stopped", Some(err.to_string())));
                }
            })
        });

        let app = build_router(Arc::clone(&self.state), self.max_body_bytes);
        let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .await
            .map_err(|err| GatewayServerError::Transport(format!("http server failed: {err}")));

        subscriber_cancel.cancel();
        if let Some(handle) = subscriber
            && let Err(err) = handle.await
        {
            self.state.audit.record_security(&SecurityAuditEvent::new("subscriber_stopped", Some(err.to_string())));
        }
        self.state.coordinator.drain_detached().await;
        served
    }
}

// ============================================================================
// SECTION: Adapter Construction
// ============================================================================

/// Builds the configured audit sink.
fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn GatewayAuditSink>, GatewayServerError> {
    match config.sink {
        AuditSinkType::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkType::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkType::File => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| GatewayServerError::Config("audit.path missing".to_string()))?;
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| GatewayServerError::Init(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
    }
}

/// Builds the configured metadata store.
fn build_metadata_store(config: &MetadataConfig) -> Result<Arc<dyn KeyValueStore>, GatewayServerError> {
    match config.store_type {
        MetadataStoreType::Memory => Ok(Arc::new(InMemoryKeyValueStore::new())),
        MetadataStoreType::Http => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| GatewayServerError::Config("metadata.base_url missing".to_string()))?;
            let store = HttpKeyValueStore::new(HttpMetadataConfig {
                base_url,
                auth_token: config.auth_token.as_ref().map(|token| token.expose().to_string()),
                request_timeout: config.timeout(),
            })
            .map_err(|err| GatewayServerError::Init(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}

/// Builds the configured message broker.
fn build_broker(config: &BrokerConfig) -> Result<Arc<dyn MessageBroker>, GatewayServerError> {
    match config.broker_type {
        BrokerType::Memory => Ok(Arc::new(InMemoryBroker::new(config.ack_deadline()))),
        BrokerType::Pubsub => {
            let required = |field: &str, value: &Option<String>| {
                value.clone().ok_or_else(|| GatewayServerError::Config(format!("broker.{field} missing")))
            };
            let broker = PubSubBroker::new(PubSubConfig {
                endpoint: config.endpoint.clone(),
                project: required("project", &config.project)?,
                topic: required("topic", &config.topic)?,
                subscription: required("subscription", &config.subscription)?,
                access_token: config
                    .access_token
                    .as_ref()
                    .map(|token| token.expose().to_string())
                    .ok_or_else(|| GatewayServerError::Config("broker.access_token missing".to_string()))?,
                request_timeout: config.request_timeout(),
            })
            .map_err(|err| GatewayServerError::Init(err.to_string()))?;
            Ok(Arc::new(broker))
        }
    }
}
