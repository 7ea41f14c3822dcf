//! Broker configuration: schema structs and file loading.

pub mod loader;
pub mod schema;

pub use loader::load_file;
pub use schema::{BrokerConfig, CoreConfig, QueueConfig};
