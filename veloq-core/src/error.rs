//! Error types shared across the Veloq crates.

use thiserror::Error;

/// Main error type for broker operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A named topic, queue, or message is absent locally
    #[error("not found: {0}")]
    NotFound(String),

    /// Create was called for a name that already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Caller-supplied input was rejected
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The partition pool is exhausted
    #[error("no partitions available")]
    NoPartitionsAvailable,

    /// Transient key/value-store or membership failure
    #[error("backend unavailable: {0}")]
    Backend(String),

    /// Configuration errors (startup-only, fatal)
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for Veloq operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<crate::store::StoreError> for Error {
    fn from(err: crate::store::StoreError) -> Self {
        Error::Backend(err.to_string())
    }
}
