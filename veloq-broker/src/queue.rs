//! Queues and the partitioned-dequeue engine.
//!
//! A queue owns its partition pool and translates `put`/`get`/`delete`
//! calls into KV-store operations. Reads lease one partition, scan the
//! matching sub-range of this node's key-space slice, and hand the
//! partition back: released as *drained* when the scan came up empty
//! (nothing of interest remains, so it is immediately re-leasable), or
//! stamped used so the visibility window hides the scanned range from
//! other consumers.
//!
//! Locks are only held for in-memory work; every KV call happens after
//! the relevant guard is dropped.

use crate::partitions::PartitionPool;
use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::{Mutex, RwLock};
use std::io::{Read, Write};
use tracing::debug;
use veloq_core::store::KvStore;
use veloq_core::{Error, Message, MessageId, QueueConfig, Result};
use veloq_cluster::RingView;

/// Name of the bucket a queue's messages live in.
///
/// The prefix keeps message buckets out of the way of the `config`
/// bucket even for a queue literally named "config".
pub(crate) fn messages_bucket(queue: &str) -> String {
    format!("messages_{queue}")
}

fn key_string(key: u64) -> String {
    format!("{key:019}")
}

/// A named queue with its configuration and partition pool.
pub struct Queue {
    name: String,
    config: RwLock<QueueConfig>,
    pool: Mutex<PartitionPool>,
}

impl Queue {
    /// Create a queue with its pool initialized to `min_partitions`.
    pub fn new(name: impl Into<String>, config: QueueConfig) -> Self {
        let pool = PartitionPool::new(&config);
        Self { name: name.into(), config: RwLock::new(config), pool: Mutex::new(pool) }
    }

    /// The queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> QueueConfig {
        self.config.read().clone()
    }

    /// Swap in a new configuration; the pool adapts on the next reconcile.
    pub fn set_config(&self, config: QueueConfig) {
        *self.config.write() = config;
    }

    /// Number of live partitions in the pool.
    pub fn partition_count(&self) -> usize {
        self.pool.lock().partition_count()
    }

    /// Run the pool's reconcile pass against the current configuration.
    pub fn reconcile_pool(&self) {
        let config = self.config();
        self.pool.lock().reconcile(&config);
    }

    /// Store a message and return its identifier.
    ///
    /// The key is minted fresh, so writes spread uniformly over the whole
    /// cluster key space; the pool is not involved.
    ///
    /// # Errors
    /// Returns `Backend` when the store rejects the write.
    pub async fn put(&self, store: &dyn KvStore, body: Bytes) -> Result<MessageId> {
        let config = self.config();
        let id = MessageId::random();
        let body = if config.compressed_messages { compress(&body)? } else { body };
        store.put_object(&messages_bucket(&self.name), &id.to_string(), body).await?;
        debug!(queue = %self.name, id = %id, "stored message");
        Ok(id)
    }

    /// Lease a partition and read up to `batch_size` messages from its
    /// sub-range of this node's slice.
    ///
    /// The pool size used for the sub-range arithmetic is read directly
    /// after the lease; a concurrent resize can shift ranges by at most
    /// one partition's width, which the delivery model tolerates.
    ///
    /// # Errors
    /// `NoPartitionsAvailable` when the pool is exhausted (an empty read,
    /// not a failure, to callers); `Backend` on scan errors.
    pub async fn get(
        &self,
        store: &dyn KvStore,
        ring: &RingView,
        batch_size: usize,
    ) -> Result<Vec<Message>> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be at least 1".to_string()));
        }
        let config = self.config();
        let (partition, pool_size) = {
            let mut pool = self.pool.lock();
            let partition = pool.lease(&config)?;
            (partition, pool.partition_count())
        };

        let slice = ring.slice();
        let step = slice.span() / pool_size as u64;
        let lo = slice.lo + step * u64::from(partition.id());
        let hi = slice.lo + step * (u64::from(partition.id()) + 1);
        debug!(
            queue = %self.name,
            partition = partition.id(),
            lo,
            hi,
            "scanning partition range"
        );

        let scanned = match store
            .range_scan(&messages_bucket(&self.name), &key_string(lo), &key_string(hi), batch_size)
            .await
        {
            Ok(scanned) => scanned,
            Err(e) => {
                self.pool.lock().release(partition, &config, false);
                return Err(e.into());
            }
        };
        self.pool.lock().release(partition, &config, scanned.is_empty());

        let mut messages = Vec::with_capacity(scanned.len());
        for (key, body) in scanned {
            let body = if config.compressed_messages { decompress(&body)? } else { body };
            messages.push(Message::new(MessageId::parse(&key)?, body));
        }
        Ok(messages)
    }

    /// Point-lookups by id; absent ids are skipped. No pool interaction.
    ///
    /// # Errors
    /// Returns `Backend` when the store is unavailable.
    pub async fn retrieve(&self, store: &dyn KvStore, ids: &[MessageId]) -> Result<Vec<Message>> {
        let config = self.config();
        let bucket = messages_bucket(&self.name);
        let mut messages = Vec::new();
        for id in ids {
            if let Some(body) = store.get_object(&bucket, &id.to_string()).await? {
                let body = if config.compressed_messages { decompress(&body)? } else { body };
                messages.push(Message::new(*id, body));
            }
        }
        Ok(messages)
    }

    /// Delete one message. Returns whether it existed.
    ///
    /// # Errors
    /// Returns `Backend` when the store is unavailable.
    pub async fn delete(&self, store: &dyn KvStore, id: MessageId) -> Result<bool> {
        Ok(store.delete_object(&messages_bucket(&self.name), &id.to_string()).await?)
    }

    /// Best-effort batch delete.
    ///
    /// Returns `(deleted, errors)`: ids that existed and were removed,
    /// and ids whose delete failed at the backend. Absent ids count as
    /// neither.
    pub async fn batch_delete(&self, store: &dyn KvStore, ids: &[MessageId]) -> (usize, usize) {
        let bucket = messages_bucket(&self.name);
        let mut deleted = 0;
        let mut errors = 0;
        for id in ids {
            match store.delete_object(&bucket, &id.to_string()).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    debug!(queue = %self.name, id = %id, error = %e, "batch delete failed");
                    errors += 1;
                }
            }
        }
        (deleted, errors)
    }
}

fn compress(body: &Bytes) -> Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).map_err(|e| Error::Backend(format!("compress: {e}")))?;
    let out = encoder.finish().map_err(|e| Error::Backend(format!("compress: {e}")))?;
    Ok(Bytes::from(out))
}

fn decompress(body: &Bytes) -> Result<Bytes> {
    let mut decoder = GzDecoder::new(body.as_ref());
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| Error::Backend(format!("decompress: {e}")))?;
    Ok(Bytes::from(out))
}
