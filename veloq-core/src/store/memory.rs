//! In-memory store implementation.

use super::{KvStore, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct Record {
    registers: BTreeMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
}

#[derive(Default)]
struct Bucket {
    objects: BTreeMap<String, Bytes>,
    records: HashMap<String, Record>,
}

/// An in-process [`KvStore`] backed by ordered maps.
///
/// Used by the test suite and by a standalone (single-node) broker. Clones
/// share the same underlying state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> StoreResult<()> {
        let mut buckets = self.buckets.write();
        buckets.entry(bucket.to_string()).or_default().objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Option<Bytes>> {
        let buckets = self.buckets.read();
        Ok(buckets.get(bucket).and_then(|b| b.objects.get(key).cloned()))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let mut buckets = self.buckets.write();
        Ok(buckets.get_mut(bucket).is_some_and(|b| b.objects.remove(key).is_some()))
    }

    async fn range_scan(
        &self,
        bucket: &str,
        lo: &str,
        hi: &str,
        limit: usize,
    ) -> StoreResult<Vec<(String, Bytes)>> {
        let buckets = self.buckets.read();
        let Some(bucket) = buckets.get(bucket) else {
            return Ok(Vec::new());
        };
        Ok(bucket
            .objects
            .range(lo.to_string()..hi.to_string())
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn fetch_set(
        &self,
        bucket: &str,
        record: &str,
        set: &str,
    ) -> StoreResult<BTreeSet<String>> {
        let buckets = self.buckets.read();
        Ok(buckets
            .get(bucket)
            .and_then(|b| b.records.get(record))
            .and_then(|r| r.sets.get(set).cloned())
            .unwrap_or_default())
    }

    async fn add_to_set(
        &self,
        bucket: &str,
        record: &str,
        set: &str,
        member: &str,
    ) -> StoreResult<()> {
        let mut buckets = self.buckets.write();
        buckets
            .entry(bucket.to_string())
            .or_default()
            .records
            .entry(record.to_string())
            .or_default()
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn remove_from_set(
        &self,
        bucket: &str,
        record: &str,
        set: &str,
        member: &str,
    ) -> StoreResult<()> {
        let mut buckets = self.buckets.write();
        if let Some(sets) = buckets
            .get_mut(bucket)
            .and_then(|b| b.records.get_mut(record))
            .and_then(|r| r.sets.get_mut(set))
        {
            sets.remove(member);
        }
        Ok(())
    }

    async fn fetch_map(&self, bucket: &str, record: &str) -> StoreResult<BTreeMap<String, String>> {
        let buckets = self.buckets.read();
        Ok(buckets
            .get(bucket)
            .and_then(|b| b.records.get(record))
            .map(|r| r.registers.clone())
            .unwrap_or_default())
    }

    async fn update_map(
        &self,
        bucket: &str,
        record: &str,
        entries: BTreeMap<String, String>,
    ) -> StoreResult<()> {
        let mut buckets = self.buckets.write();
        buckets
            .entry(bucket.to_string())
            .or_default()
            .records
            .entry(record.to_string())
            .or_default()
            .registers
            .extend(entries);
        Ok(())
    }

    async fn destroy_record(&self, bucket: &str, record: &str) -> StoreResult<()> {
        let mut buckets = self.buckets.write();
        if let Some(bucket) = buckets.get_mut(bucket) {
            bucket.records.remove(record);
        }
        Ok(())
    }
}
