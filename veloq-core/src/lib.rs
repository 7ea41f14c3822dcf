//! # Veloq Core
//!
//! Core library for the Veloq distributed message-queue broker.
//!
//! This crate provides the building blocks shared by the cluster and
//! broker crates:
//! - Message identity and key-space types
//! - Broker and per-queue configuration (schema + file loading)
//! - The key/value-store interface the broker persists through, plus an
//!   in-memory implementation
//! - The common error type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod message;
pub mod store;
pub mod types;

pub use config::{BrokerConfig, CoreConfig, QueueConfig};
pub use error::{Error, Result};
pub use message::{Message, MessageId};
pub use types::{KeyRange, KEY_SPACE};

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::config::{BrokerConfig, QueueConfig};
    pub use crate::store::{KvStore, MemoryStore};
    pub use crate::{Error, KeyRange, Message, MessageId, Result};
    pub use bytes::Bytes;
}
