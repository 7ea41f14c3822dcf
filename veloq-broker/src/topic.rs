//! Topics and broadcast fan-out.
//!
//! A topic is a named set of subscriber queues. The subscriber set is
//! authoritative in the KV store; each node keeps an eventually-consistent
//! local copy, refreshed by the config sync loop. Broadcast reads the
//! cached copy rather than the store, trading cross-node consistency for
//! per-publish latency.

use crate::registry::Queues;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use veloq_core::store::KvStore;
use veloq_core::{MessageId, Result};

/// A named topic with its cached subscriber set.
pub struct Topic {
    name: String,
    subscribers: RwLock<BTreeSet<String>>,
}

impl Topic {
    /// Create a topic with no subscribers.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_subscribers(name, BTreeSet::new())
    }

    /// Create a topic with a known subscriber set.
    pub fn with_subscribers(name: impl Into<String>, subscribers: BTreeSet<String>) -> Self {
        Self { name: name.into(), subscribers: RwLock::new(subscribers) }
    }

    /// The topic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the cached subscriber set.
    pub fn subscribers(&self) -> BTreeSet<String> {
        self.subscribers.read().clone()
    }

    /// Swap in a freshly fetched subscriber set.
    pub fn replace_subscribers(&self, subscribers: BTreeSet<String>) {
        *self.subscribers.write() = subscribers;
    }

    /// Write `body` to every subscriber queue present in the local
    /// registry, returning the id written per queue.
    ///
    /// Subscribers the registry does not know yet are skipped silently;
    /// they receive later publishes once the sync loop catches up. The
    /// returned map tells the caller exactly which queues were written.
    ///
    /// # Errors
    /// Returns `Backend` when a subscriber write fails at the store.
    pub async fn broadcast(
        &self,
        queues: &Queues,
        store: &dyn KvStore,
        body: Bytes,
    ) -> Result<BTreeMap<String, MessageId>> {
        let subscribers = self.subscribers();
        let mut written = BTreeMap::new();
        for name in subscribers {
            let Some(queue) = queues.get(&name) else {
                debug!(topic = %self.name, queue = %name, "subscriber not local yet, skipping");
                continue;
            };
            let id = queue.put(store, body.clone()).await?;
            written.insert(name, id);
        }
        Ok(written)
    }
}
