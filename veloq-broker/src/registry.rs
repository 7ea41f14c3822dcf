//! Queue and topic registries.
//!
//! Name → object tables guarded by readers-writer locks. The KV store
//! holds the authoritative name sets (`queuesConfig` / `topicsConfig`
//! records in the `config` bucket); the local maps may lag and are
//! reconciled by the config sync loop. Write locks are held only for the
//! map mutation itself, never across a store call.

use crate::queue::Queue;
use crate::topic::Topic;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::info;
use veloq_core::store::KvStore;
use veloq_core::types::validate_name;
use veloq_core::{QueueConfig, Result};

/// Bucket holding all configuration records.
pub const CONFIG_BUCKET: &str = "config";
/// Root record listing queue names.
pub const QUEUES_RECORD: &str = "queuesConfig";
/// Root record listing topic names.
pub const TOPICS_RECORD: &str = "topicsConfig";
/// Set of queue names within [`QUEUES_RECORD`].
pub const QUEUES_SET: &str = "queues";
/// Set of topic names within [`TOPICS_RECORD`].
pub const TOPICS_SET: &str = "topics";
/// Set of subscriber queue names within a topic's record.
pub const SUBSCRIBERS_SET: &str = "queues";

/// Name of a queue's configuration record.
pub fn queue_config_record(queue: &str) -> String {
    format!("queue_{queue}_config")
}

/// Name of a topic's configuration record.
pub fn topic_config_record(topic: &str) -> String {
    format!("topic_{topic}_config")
}

/// The queue registry.
pub struct Queues {
    store: Arc<dyn KvStore>,
    defaults: QueueConfig,
    map: RwLock<HashMap<String, Arc<Queue>>>,
}

impl Queues {
    /// Create an empty registry. `defaults` seeds the config of every
    /// newly created queue.
    pub fn new(store: Arc<dyn KvStore>, defaults: QueueConfig) -> Self {
        Self { store, defaults, map: RwLock::new(HashMap::new()) }
    }

    /// Look up a queue.
    pub fn get(&self, name: &str) -> Option<Arc<Queue>> {
        self.map.read().get(name).cloned()
    }

    /// Whether the queue exists locally.
    pub fn exists(&self, name: &str) -> bool {
        self.map.read().contains_key(name)
    }

    /// Sorted list of locally known queue names.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.map.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn local_names(&self) -> BTreeSet<String> {
        self.map.read().keys().cloned().collect()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Queue>> {
        self.map.read().values().cloned().collect()
    }

    pub(crate) fn remove_local(&self, name: &str) -> bool {
        self.map.write().remove(name).is_some()
    }

    /// Create a queue with the default configuration.
    ///
    /// Returns `true` when the queue was created, `false` when the name
    /// already existed (the HTTP layer turns that into a conflict).
    ///
    /// # Errors
    /// `InvalidArgument` for a bad name, `Backend` when persisting fails.
    pub async fn create(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        if self.exists(name) {
            return Ok(false);
        }
        let config = self.defaults.clone();
        self.store.add_to_set(CONFIG_BUCKET, QUEUES_RECORD, QUEUES_SET, name).await?;
        self.store
            .update_map(CONFIG_BUCKET, &queue_config_record(name), config.as_registers())
            .await?;

        let created = {
            let mut map = self.map.write();
            match map.entry(name.to_string()) {
                std::collections::hash_map::Entry::Occupied(_) => false,
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Queue::new(name, config)));
                    true
                }
            }
        };
        if created {
            info!(queue = name, "created queue");
        }
        Ok(created)
    }

    /// Delete a queue everywhere. Returns whether it existed locally.
    ///
    /// Consumers holding a leased partition keep their `Arc<Queue>`; the
    /// orphaned pool is dropped with the last clone.
    ///
    /// # Errors
    /// Returns `Backend` when the store update fails.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        self.store.remove_from_set(CONFIG_BUCKET, QUEUES_RECORD, QUEUES_SET, name).await?;
        self.store.destroy_record(CONFIG_BUCKET, &queue_config_record(name)).await?;
        let existed = self.remove_local(name);
        if existed {
            info!(queue = name, "deleted queue");
        }
        Ok(existed)
    }

    /// Instantiate a queue from its persisted record (sync loop path).
    pub(crate) async fn load(&self, name: &str) -> Result<()> {
        let registers = self.store.fetch_map(CONFIG_BUCKET, &queue_config_record(name)).await?;
        let config = self.defaults.merged_with_registers(&registers)?;
        let mut map = self.map.write();
        map.entry(name.to_string()).or_insert_with(|| Arc::new(Queue::new(name, config)));
        Ok(())
    }

    /// Re-read a queue's config record and swap the result in.
    pub(crate) async fn refresh(&self, queue: &Arc<Queue>) -> Result<()> {
        let registers =
            self.store.fetch_map(CONFIG_BUCKET, &queue_config_record(queue.name())).await?;
        let config = self.defaults.merged_with_registers(&registers)?;
        queue.set_config(config);
        Ok(())
    }

    /// Persist a single configuration register for a queue.
    pub(crate) async fn persist_register(
        &self,
        name: &str,
        key: &str,
        value: String,
    ) -> Result<()> {
        let entries = std::collections::BTreeMap::from([(key.to_string(), value)]);
        self.store.update_map(CONFIG_BUCKET, &queue_config_record(name), entries).await?;
        Ok(())
    }
}

/// The topic registry.
pub struct Topics {
    store: Arc<dyn KvStore>,
    map: RwLock<HashMap<String, Arc<Topic>>>,
}

impl Topics {
    /// Create an empty registry.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store, map: RwLock::new(HashMap::new()) }
    }

    /// Look up a topic.
    pub fn get(&self, name: &str) -> Option<Arc<Topic>> {
        self.map.read().get(name).cloned()
    }

    /// Whether the topic exists locally.
    pub fn exists(&self, name: &str) -> bool {
        self.map.read().contains_key(name)
    }

    /// Sorted list of locally known topic names.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.map.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn local_names(&self) -> BTreeSet<String> {
        self.map.read().keys().cloned().collect()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Topic>> {
        self.map.read().values().cloned().collect()
    }

    pub(crate) fn remove_local(&self, name: &str) -> bool {
        self.map.write().remove(name).is_some()
    }

    /// Create a topic. Returns `true` when created, `false` when the name
    /// already existed.
    ///
    /// # Errors
    /// `InvalidArgument` for a bad name, `Backend` when persisting fails.
    pub async fn create(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        if self.exists(name) {
            return Ok(false);
        }
        self.store.add_to_set(CONFIG_BUCKET, TOPICS_RECORD, TOPICS_SET, name).await?;
        self.store
            .update_map(CONFIG_BUCKET, &topic_config_record(name), Default::default())
            .await?;

        let created = {
            let mut map = self.map.write();
            match map.entry(name.to_string()) {
                std::collections::hash_map::Entry::Occupied(_) => false,
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Topic::new(name)));
                    true
                }
            }
        };
        if created {
            info!(topic = name, "created topic");
        }
        Ok(created)
    }

    /// Delete a topic everywhere, dropping its subscription list.
    /// Returns whether it existed locally.
    ///
    /// # Errors
    /// Returns `Backend` when the store update fails.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        self.store.remove_from_set(CONFIG_BUCKET, TOPICS_RECORD, TOPICS_SET, name).await?;
        self.store.destroy_record(CONFIG_BUCKET, &topic_config_record(name)).await?;
        let existed = self.remove_local(name);
        if existed {
            info!(topic = name, "deleted topic");
        }
        Ok(existed)
    }

    /// Subscribe a queue to a topic. Both must exist locally.
    ///
    /// # Errors
    /// `NotFound` when the topic or queue is missing, `Backend` when the
    /// store update fails.
    pub async fn subscribe(&self, queues: &Queues, topic: &str, queue: &str) -> Result<()> {
        let Some(entry) = self.get(topic) else {
            return Err(veloq_core::Error::NotFound(format!("topic {topic}")));
        };
        if !queues.exists(queue) {
            return Err(veloq_core::Error::NotFound(format!("queue {queue}")));
        }
        let record = topic_config_record(topic);
        self.store.add_to_set(CONFIG_BUCKET, &record, SUBSCRIBERS_SET, queue).await?;
        let subscribers = self.store.fetch_set(CONFIG_BUCKET, &record, SUBSCRIBERS_SET).await?;
        entry.replace_subscribers(subscribers);
        info!(topic, queue, "subscribed queue to topic");
        Ok(())
    }

    /// Remove a queue from a topic's subscriber set.
    ///
    /// The queue itself does not need to exist any more; unsubscribing a
    /// deleted queue must always be possible.
    ///
    /// # Errors
    /// `NotFound` when the topic is missing, `Backend` on store failure.
    pub async fn unsubscribe(&self, topic: &str, queue: &str) -> Result<()> {
        let Some(entry) = self.get(topic) else {
            return Err(veloq_core::Error::NotFound(format!("topic {topic}")));
        };
        let record = topic_config_record(topic);
        self.store.remove_from_set(CONFIG_BUCKET, &record, SUBSCRIBERS_SET, queue).await?;
        let subscribers = self.store.fetch_set(CONFIG_BUCKET, &record, SUBSCRIBERS_SET).await?;
        entry.replace_subscribers(subscribers);
        info!(topic, queue, "unsubscribed queue from topic");
        Ok(())
    }

    /// Instantiate a topic from its persisted record (sync loop path).
    pub(crate) async fn load(&self, name: &str) -> Result<()> {
        let subscribers = self
            .store
            .fetch_set(CONFIG_BUCKET, &topic_config_record(name), SUBSCRIBERS_SET)
            .await?;
        let mut map = self.map.write();
        map.entry(name.to_string())
            .or_insert_with(|| Arc::new(Topic::with_subscribers(name, subscribers)));
        Ok(())
    }

    /// Re-read a topic's subscriber set and swap the result in.
    pub(crate) async fn refresh(&self, topic: &Arc<Topic>) -> Result<()> {
        let subscribers = self
            .store
            .fetch_set(CONFIG_BUCKET, &topic_config_record(topic.name()), SUBSCRIBERS_SET)
            .await?;
        topic.replace_subscribers(subscribers);
        Ok(())
    }
}
