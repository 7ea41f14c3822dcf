//! # Veloq Broker
//!
//! The broker proper: the partitioned-dequeue engine, topic fan-out, the
//! queue/topic registries, the config sync loop, and the HTTP API.
//!
//! A cluster of brokers shares nothing directly; peers coordinate only
//! through the KV store (durable state) and the membership view (key-space
//! placement). Within one node, each queue's partition pool is the only
//! delivery-exclusion mechanism; there is no cross-node lease
//! coordination, so overlapping reads during membership churn are
//! possible and accepted.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod http;
pub mod partitions;
pub mod queue;
pub mod registry;
pub mod server;
pub mod sync;
pub mod topic;

pub use partitions::{Partition, PartitionPool};
pub use queue::Queue;
pub use registry::{Queues, Topics};
pub use server::Broker;
pub use topic::Topic;
