//! Per-queue partition pool.
//!
//! A queue's share of the key space is sub-divided into integer-labelled
//! partitions, leased exclusively to one consumer at a time. The pool is a
//! min-heap ordered by each partition's `last_used` instant: the head is
//! the partition that has been invisible longest, so "visible again" is a
//! passive property of the clock rather than a timer per partition.
//!
//! Growth is demand-driven: when the head is still inside its visibility
//! window and the pool is below `max_partitions`, a fresh partition is
//! minted instead of failing the lease. The reconcile pass (run by the
//! config sync loop) enforces the configured bounds and retires partitions
//! that have sat idle longer than `max_partition_age`.
//!
//! All operations are in-memory and are serialized by the owning queue's
//! mutex; nothing here suspends or performs I/O.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};
use std::time::{Duration, Instant};
use veloq_core::{Error, QueueConfig, Result};

/// An integer partition label with its visibility clock.
///
/// `last_used` is `None` for a partition that has never been leased; such
/// partitions are immediately leasable and sort ahead of every used one,
/// with a random tiebreak so no fresh partition dominates.
#[derive(Debug, Clone)]
pub struct Partition {
    id: u32,
    last_used: Option<Instant>,
    tiebreak: u64,
}

impl Partition {
    /// The partition's id, unique among live partitions of its pool.
    pub const fn id(&self) -> u32 {
        self.id
    }

    fn leasable(&self, now: Instant, visibility_timeout: f64) -> bool {
        match self.last_used {
            None => true,
            Some(used) => now.duration_since(used) >= Duration::from_secs_f64(visibility_timeout),
        }
    }

    fn older_than(&self, now: Instant, max_age: f64) -> bool {
        // Never-used partitions have no age; only the idle-since-use ones
        // are candidates for retirement.
        match self.last_used {
            None => false,
            Some(used) => now.duration_since(used) > Duration::from_secs_f64(max_age),
        }
    }
}

/// Heap ordering: oldest `last_used` first, fresh partitions before all
/// used ones, random tiebreak among equals.
#[derive(Debug)]
struct HeapEntry(Partition);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.0.last_used, self.0.tiebreak).cmp(&(other.0.last_used, other.0.tiebreak))
    }
}

/// Lease-based pool of partitions for one queue.
#[derive(Debug)]
pub struct PartitionPool {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    /// Ids of every live partition, in-heap or leased out.
    live: BTreeSet<u32>,
}

impl PartitionPool {
    /// Create a pool holding `min_partitions` fresh partitions.
    pub fn new(config: &QueueConfig) -> Self {
        let mut pool = Self { heap: BinaryHeap::new(), live: BTreeSet::new() };
        for _ in 0..config.min_partitions {
            let partition = pool.mint();
            pool.heap.push(Reverse(HeapEntry(partition)));
        }
        pool
    }

    /// Number of live partitions, leased ones included.
    pub fn partition_count(&self) -> usize {
        self.live.len()
    }

    /// Lease the oldest visible partition, growing the pool on contention.
    ///
    /// # Errors
    /// Returns `NoPartitionsAvailable` when every partition is inside its
    /// visibility window and the pool is at `max_partitions`.
    pub fn lease(&mut self, config: &QueueConfig) -> Result<Partition> {
        self.lease_at(config, Instant::now())
    }

    fn lease_at(&mut self, config: &QueueConfig, now: Instant) -> Result<Partition> {
        let head_leasable = self
            .heap
            .peek()
            .is_some_and(|Reverse(HeapEntry(p))| p.leasable(now, config.visibility_timeout));
        if head_leasable {
            if let Some(Reverse(HeapEntry(partition))) = self.heap.pop() {
                return Ok(partition);
            }
        }
        // Head still invisible (or everything is leased out): expand on
        // demand up to the configured cap.
        if self.live.len() < config.max_partitions as usize {
            return Ok(self.mint());
        }
        Err(Error::NoPartitionsAvailable)
    }

    /// Return a leased partition to the pool.
    ///
    /// A drained partition (its sub-range scanned empty) is backdated one
    /// full visibility window so it is immediately re-leasable; otherwise
    /// `last_used` is stamped now and the partition stays hidden for one
    /// window.
    pub fn release(&mut self, partition: Partition, config: &QueueConfig, drained: bool) {
        self.release_at(partition, config, drained, Instant::now());
    }

    fn release_at(
        &mut self,
        mut partition: Partition,
        config: &QueueConfig,
        drained: bool,
        now: Instant,
    ) {
        partition.last_used = if drained {
            // checked_sub fails only before one window has elapsed since
            // process start; "never used" has the same meaning then.
            now.checked_sub(Duration::from_secs_f64(config.visibility_timeout))
        } else {
            Some(now)
        };
        self.heap.push(Reverse(HeapEntry(partition)));
    }

    /// Enforce the configured size bounds and retire idle partitions.
    ///
    /// Shedding over `max_partitions` discards in-memory pool state only;
    /// durability lives in the KV store.
    pub fn reconcile(&mut self, config: &QueueConfig) {
        self.reconcile_at(config, Instant::now());
    }

    fn reconcile_at(&mut self, config: &QueueConfig, now: Instant) {
        let min = config.min_partitions as usize;
        let max = config.max_partitions as usize;

        while self.live.len() > max {
            match self.heap.pop() {
                Some(Reverse(HeapEntry(p))) => {
                    self.live.remove(&p.id);
                }
                // Everything over the cap is leased out; trimmed on a
                // later pass once released.
                None => break,
            }
        }

        while self.live.len() < min {
            let partition = self.mint();
            self.heap.push(Reverse(HeapEntry(partition)));
        }

        // Retire partitions idle past max_partition_age, oldest first.
        loop {
            let head_aged = self
                .heap
                .peek()
                .is_some_and(|Reverse(HeapEntry(p))| p.older_than(now, config.max_partition_age));
            if !head_aged || self.live.len() < min {
                break;
            }
            if let Some(Reverse(HeapEntry(p))) = self.heap.pop() {
                self.live.remove(&p.id);
            }
        }

        // The age-out pass may consume the floor itself.
        while self.live.len() < min {
            let partition = self.mint();
            self.heap.push(Reverse(HeapEntry(partition)));
        }
    }

    /// Mint a fresh partition under the lowest free id, keeping the live
    /// id set dense in `[0, max_partitions)` even after age-out churn.
    fn mint(&mut self) -> Partition {
        let mut id = 0u32;
        while self.live.contains(&id) {
            id += 1;
        }
        self.live.insert(id);
        Partition { id, last_used: None, tiebreak: rand::random() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min: u32, max: u32, visibility: f64, age: f64) -> QueueConfig {
        QueueConfig {
            visibility_timeout: visibility,
            min_partitions: min,
            max_partitions: max,
            max_partition_age: age,
            compressed_messages: false,
        }
    }

    fn used(pool: &mut PartitionPool, id: u32, at: Instant) {
        pool.live.insert(id);
        pool.heap.push(Reverse(HeapEntry(Partition {
            id,
            last_used: Some(at),
            tiebreak: rand::random(),
        })));
    }

    #[test]
    fn test_lease_grows_on_contention() {
        let cfg = config(1, 3, 10.0, 432_000.0);
        let mut pool = PartitionPool::new(&cfg);
        let base = Instant::now();

        let ids: Vec<u32> =
            (0..3).map(|_| pool.lease_at(&cfg, base).unwrap().id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(matches!(pool.lease_at(&cfg, base), Err(Error::NoPartitionsAvailable)));
        assert_eq!(pool.partition_count(), 3);
    }

    #[test]
    fn test_drained_release_is_immediately_reusable() {
        let cfg = config(1, 1, 0.0, 432_000.0);
        let mut pool = PartitionPool::new(&cfg);
        let base = Instant::now();

        let p = pool.lease_at(&cfg, base).unwrap();
        let leased_id = p.id();
        pool.release_at(p, &cfg, true, base);
        let q = pool.lease_at(&cfg, base).unwrap();
        assert_eq!(q.id(), leased_id);
    }

    #[test]
    fn test_visibility_window_hides_partition() {
        let cfg = config(1, 1, 5.0, 432_000.0);
        let mut pool = PartitionPool::new(&cfg);
        let base = Instant::now();

        let p = pool.lease_at(&cfg, base).unwrap();
        pool.release_at(p, &cfg, false, base);

        assert!(matches!(
            pool.lease_at(&cfg, base + Duration::from_secs(4)),
            Err(Error::NoPartitionsAvailable)
        ));
        let p = pool.lease_at(&cfg, base + Duration::from_secs(5)).unwrap();
        assert_eq!(p.id(), 0);
    }

    #[test]
    fn test_reconcile_ages_out_idle_partitions() {
        let cfg = config(1, 4, 10.0, 30.0);
        let mut pool = PartitionPool { heap: BinaryHeap::new(), live: BTreeSet::new() };
        let base = Instant::now();
        let now = base + Duration::from_secs(100);
        used(&mut pool, 0, base); // 100s ago
        used(&mut pool, 1, base + Duration::from_secs(50)); // 50s ago
        used(&mut pool, 2, base + Duration::from_secs(99)); // 1s ago

        pool.reconcile_at(&cfg, now);

        assert_eq!(pool.partition_count(), 1);
        assert_eq!(pool.live.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_reconcile_never_ages_out_fresh_partitions() {
        let cfg = config(2, 4, 10.0, 30.0);
        let mut pool = PartitionPool::new(&cfg);
        pool.reconcile_at(&cfg, Instant::now() + Duration::from_secs(10_000));
        assert_eq!(pool.partition_count(), 2);
    }

    #[test]
    fn test_reconcile_restores_floor_when_everything_is_stale() {
        let cfg = config(2, 4, 10.0, 30.0);
        let mut pool = PartitionPool { heap: BinaryHeap::new(), live: BTreeSet::new() };
        let base = Instant::now();
        used(&mut pool, 0, base);
        used(&mut pool, 1, base);

        pool.reconcile_at(&cfg, base + Duration::from_secs(500));

        assert_eq!(pool.partition_count(), 2);
        // Survivor plus replacements are all leasable.
        assert!(pool.lease_at(&cfg, base + Duration::from_secs(500)).is_ok());
    }

    #[test]
    fn test_reconcile_sheds_down_to_new_max() {
        let mut cfg = config(1, 4, 60.0, 432_000.0);
        let mut pool = PartitionPool::new(&cfg);
        let base = Instant::now();
        let leased: Vec<Partition> =
            (0..3).map(|_| pool.lease_at(&cfg, base).unwrap()).collect();
        for p in leased {
            pool.release_at(p, &cfg, false, base);
        }
        assert_eq!(pool.partition_count(), 3);

        cfg.max_partitions = 2;
        pool.reconcile_at(&cfg, base);
        assert_eq!(pool.partition_count(), 2);
    }

    #[test]
    fn test_leased_partitions_survive_shrink() {
        let mut cfg = config(1, 3, 10.0, 432_000.0);
        let mut pool = PartitionPool::new(&cfg);
        let base = Instant::now();
        let a = pool.lease_at(&cfg, base).unwrap();
        let b = pool.lease_at(&cfg, base).unwrap();

        cfg.max_partitions = 1;
        cfg.min_partitions = 1;
        pool.reconcile_at(&cfg, base);

        // Both leases are still accounted live; the trim happens once
        // they come back.
        assert_eq!(pool.partition_count(), 2);
        pool.release_at(a, &cfg, false, base);
        pool.release_at(b, &cfg, false, base);
        pool.reconcile_at(&cfg, base);
        assert_eq!(pool.partition_count(), 1);
    }

    #[test]
    fn test_lease_ids_are_unique_while_out() {
        let cfg = config(4, 8, 60.0, 432_000.0);
        let mut pool = PartitionPool::new(&cfg);
        let base = Instant::now();

        let mut out = Vec::new();
        while let Ok(p) = pool.lease_at(&cfg, base) {
            out.push(p.id());
        }
        let mut deduped = out.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), out.len());
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|&id| id < 8));
    }

    #[test]
    fn test_mint_reuses_lowest_free_id() {
        let cfg = config(1, 4, 3600.0, 30.0);
        let mut pool = PartitionPool { heap: BinaryHeap::new(), live: BTreeSet::new() };
        let base = Instant::now();
        used(&mut pool, 0, base);
        used(&mut pool, 1, base + Duration::from_secs(10));
        used(&mut pool, 2, base + Duration::from_secs(400));

        // Ages out 0 and 1, leaving a sparse live set {2}.
        pool.reconcile_at(&cfg, base + Duration::from_secs(420));
        assert_eq!(pool.live.iter().copied().collect::<Vec<_>>(), vec![2]);

        // Head (2) is inside its visibility window, so leases mint the
        // gaps rather than colliding with the survivor.
        assert_eq!(pool.lease_at(&cfg, base + Duration::from_secs(421)).unwrap().id(), 0);
        assert_eq!(pool.lease_at(&cfg, base + Duration::from_secs(421)).unwrap().id(), 1);
    }
}
