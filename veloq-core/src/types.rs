//! Common types used throughout the Veloq system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of the message key space. Keys fall in `[0, KEY_SPACE)`.
pub const KEY_SPACE: u64 = i64::MAX as u64;

/// A contiguous, half-open sub-range `[lo, hi)` of the message key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    /// Inclusive lower bound
    pub lo: u64,
    /// Exclusive upper bound
    pub hi: u64,
}

impl KeyRange {
    /// Create a new key range.
    pub const fn new(lo: u64, hi: u64) -> Self {
        Self { lo, hi }
    }

    /// Width of the range.
    pub const fn span(&self) -> u64 {
        self.hi.saturating_sub(self.lo)
    }

    /// Check whether a key falls inside the range.
    pub const fn contains(&self, key: u64) -> bool {
        key >= self.lo && key < self.hi
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lo, self.hi)
    }
}

/// Validate a queue or topic name.
///
/// # Errors
/// Returns `InvalidArgument` if the name is empty, longer than 255
/// characters, or contains anything other than alphanumerics, `-`, `_`, `.`.
pub fn validate_name(name: &str) -> crate::Result<()> {
    if name.is_empty() {
        return Err(crate::Error::InvalidArgument("name cannot be empty".to_string()));
    }
    if name.len() > 255 {
        return Err(crate::Error::InvalidArgument(
            "name cannot exceed 255 characters".to_string(),
        ));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.') {
        return Err(crate::Error::InvalidArgument(format!(
            "name {name:?} contains invalid characters"
        )));
    }
    Ok(())
}
