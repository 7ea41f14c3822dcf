//! Config sync loop.
//!
//! A single periodic task per process reconciles the in-memory registries
//! with the authoritative KV-store state: names that appeared elsewhere in
//! the cluster are initialized, names that vanished are dropped, surviving
//! queues get their configuration refreshed and their pool reconciled, and
//! surviving topics get their subscriber cache refreshed.
//!
//! The loop never tears down local state over a single failed tick; a
//! failed root-set fetch just skips the tick.

use crate::registry::{Queues, Topics, CONFIG_BUCKET, QUEUES_RECORD, QUEUES_SET, TOPICS_RECORD, TOPICS_SET};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use veloq_core::store::KvStore;
use veloq_core::Result;

/// Handle for stopping the sync loop.
///
/// Dropping the handle leaves the loop running for the life of the
/// process; call [`shutdown`](SyncHandle::shutdown) for an orderly stop.
pub struct SyncHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop the loop. Any in-flight iteration completes first.
    pub async fn shutdown(self) {
        // A closed channel means the task already exited.
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

/// Spawn the sync loop, ticking every `interval`.
pub fn spawn(
    store: Arc<dyn KvStore>,
    queues: Arc<Queues>,
    topics: Arc<Topics>,
    interval: Duration,
) -> SyncHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = sync_once(store.as_ref(), &queues, &topics).await {
                        warn!(error = %e, "config sync tick skipped");
                    }
                }
                _ = &mut shutdown_rx => {
                    debug!("config sync loop stopped");
                    break;
                }
            }
        }
    });
    SyncHandle { shutdown_tx, task }
}

/// Run one reconciliation pass.
///
/// # Errors
/// Returns `Backend` when a root name-set cannot be fetched; per-name
/// failures are logged and do not fail the pass.
pub async fn sync_once(store: &dyn KvStore, queues: &Queues, topics: &Topics) -> Result<()> {
    let queue_names = store.fetch_set(CONFIG_BUCKET, QUEUES_RECORD, QUEUES_SET).await?;
    let topic_names = store.fetch_set(CONFIG_BUCKET, TOPICS_RECORD, TOPICS_SET).await?;
    debug!(queues = queue_names.len(), topics = topic_names.len(), "syncing registries");

    let local = queues.local_names();
    for name in queue_names.difference(&local) {
        if let Err(e) = queues.load(name).await {
            warn!(queue = %name, error = %e, "failed to load queue");
        }
    }
    for name in local.difference(&queue_names) {
        queues.remove_local(name);
        debug!(queue = %name, "dropped queue no longer in the store");
    }
    for queue in queues.snapshot() {
        if let Err(e) = queues.refresh(&queue).await {
            warn!(queue = %queue.name(), error = %e, "failed to refresh queue config");
        }
        queue.reconcile_pool();
    }

    // Legacy installations may still list the old default_topic
    // placeholder; it loads like any other name and is never recreated.
    let local = topics.local_names();
    for name in topic_names.difference(&local) {
        if let Err(e) = topics.load(name).await {
            warn!(topic = %name, error = %e, "failed to load topic");
        }
    }
    for name in local.difference(&topic_names) {
        topics.remove_local(name);
        debug!(topic = %name, "dropped topic no longer in the store");
    }
    for topic in topics.snapshot() {
        if let Err(e) = topics.refresh(&topic).await {
            warn!(topic = %topic.name(), error = %e, "failed to refresh topic subscribers");
        }
    }
    Ok(())
}
