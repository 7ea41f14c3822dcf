//! Broker assembly.
//!
//! Wires configuration, membership, and the KV store into the registries,
//! the config sync loop, and the HTTP API.

use crate::http::{self, AppState};
use crate::registry::{Queues, Topics};
use crate::sync::{self, SyncHandle};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use veloq_cluster::Membership;
use veloq_core::store::KvStore;
use veloq_core::{BrokerConfig, CoreConfig, Error, QueueConfig, Result};

/// A broker node.
pub struct Broker {
    core: CoreConfig,
    store: Arc<dyn KvStore>,
    membership: Arc<dyn Membership>,
    queues: Arc<Queues>,
    topics: Arc<Topics>,
}

impl Broker {
    /// Assemble a broker from its collaborators.
    ///
    /// New queues default to the visibility timeout configured in
    /// `[Core]`.
    pub fn new(
        config: &BrokerConfig,
        store: Arc<dyn KvStore>,
        membership: Arc<dyn Membership>,
    ) -> Self {
        let defaults =
            QueueConfig { visibility_timeout: config.core.visibility, ..QueueConfig::default() };
        let queues = Arc::new(Queues::new(store.clone(), defaults));
        let topics = Arc::new(Topics::new(store.clone()));
        Self { core: config.core.clone(), store, membership, queues, topics }
    }

    /// The queue registry.
    pub fn queues(&self) -> &Arc<Queues> {
        &self.queues
    }

    /// The topic registry.
    pub fn topics(&self) -> &Arc<Topics> {
        &self.topics
    }

    /// Load existing queues and topics from the store before serving.
    ///
    /// # Errors
    /// Returns `Backend` when the authoritative name sets cannot be read.
    pub async fn bootstrap(&self) -> Result<()> {
        sync::sync_once(self.store.as_ref(), &self.queues, &self.topics).await
    }

    /// Start the background config sync loop.
    pub fn start_sync(&self) -> SyncHandle {
        sync::spawn(
            self.store.clone(),
            self.queues.clone(),
            self.topics.clone(),
            Duration::from_millis(self.core.sync_config_interval),
        )
    }

    /// The API router for this broker.
    pub fn router(&self) -> Router {
        http::router(Arc::new(AppState {
            membership: self.membership.clone(),
            store: self.store.clone(),
            queues: self.queues.clone(),
            topics: self.topics.clone(),
        }))
    }

    /// Serve the HTTP API until interrupted.
    ///
    /// # Errors
    /// `Configuration` when the port cannot be bound, `Backend` when the
    /// server fails while running.
    pub async fn serve(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.core.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Configuration(format!("cannot bind {addr}: {e}")))?;
        info!(%addr, node = %self.core.name, "http api listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Backend(format!("http server: {e}")))
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
