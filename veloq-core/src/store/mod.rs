//! Key/value-store interface.
//!
//! The broker persists message bodies and queue/topic metadata in an
//! external content-addressed store. This module defines the interface the
//! core consumes; the store client itself (connection pooling, CRDT
//! convergence) is an external collaborator. Two planes:
//!
//! - the **data plane**: opaque objects under lexicographically ordered
//!   keys, with range scans (message storage);
//! - the **control plane**: named records holding a register map and named
//!   string sets (queue/topic configuration).
//!
//! [`MemoryStore`] is the in-process implementation used by tests and by a
//! standalone broker.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors surfaced by a store implementation.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The store cannot be reached or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store returned data the broker cannot interpret
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The key/value-store operations the broker consumes.
///
/// Implementations must preserve lexicographic key ordering for
/// [`range_scan`](KvStore::range_scan) and treat set/map updates as
/// last-writer-wins at the granularity of a single call.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Store an object under `bucket`/`key`, replacing any previous value.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> StoreResult<()>;

    /// Fetch an object, or `None` if absent.
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Option<Bytes>>;

    /// Delete an object. Returns whether it existed.
    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<bool>;

    /// Scan `bucket` for keys in `[lo, hi)`, ascending, up to `limit`
    /// entries.
    async fn range_scan(
        &self,
        bucket: &str,
        lo: &str,
        hi: &str,
        limit: usize,
    ) -> StoreResult<Vec<(String, Bytes)>>;

    /// Fetch a named set from a record. Absent record or set yields an
    /// empty set.
    async fn fetch_set(&self, bucket: &str, record: &str, set: &str)
        -> StoreResult<BTreeSet<String>>;

    /// Add a member to a named set, creating record and set as needed.
    async fn add_to_set(
        &self,
        bucket: &str,
        record: &str,
        set: &str,
        member: &str,
    ) -> StoreResult<()>;

    /// Remove a member from a named set. Absent members are ignored.
    async fn remove_from_set(
        &self,
        bucket: &str,
        record: &str,
        set: &str,
        member: &str,
    ) -> StoreResult<()>;

    /// Fetch a record's register map. Absent record yields an empty map.
    async fn fetch_map(&self, bucket: &str, record: &str) -> StoreResult<BTreeMap<String, String>>;

    /// Merge register values into a record, creating it as needed.
    async fn update_map(
        &self,
        bucket: &str,
        record: &str,
        entries: BTreeMap<String, String>,
    ) -> StoreResult<()>;

    /// Destroy a record along with its registers and sets.
    async fn destroy_record(&self, bucket: &str, record: &str) -> StoreResult<()>;
}
