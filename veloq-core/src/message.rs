//! Message types and key derivation.
//!
//! Message identity doubles as the storage key: a `MessageId` wraps the
//! 63-bit numeric key a message is stored under, and its string form is
//! fixed-width decimal so that lexicographic key order equals numeric
//! order. Range scans over a partition's sub-range rely on this.

use crate::types::KEY_SPACE;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of decimal digits needed for any key below `2^63`.
const KEY_DIGITS: usize = 19;

/// Unique identifier for a message; also its key in the per-queue bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    /// Mint a fresh identifier.
    ///
    /// The key is drawn from the leading 64 bits of a new UUIDv4, reduced
    /// into `[0, 2^63)` so every key lands inside the cluster key space.
    pub fn random() -> Self {
        let uuid = Uuid::new_v4();
        let bytes = uuid.as_bytes();
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        Self(u64::from_be_bytes(raw) % KEY_SPACE)
    }

    /// Create a message ID from a raw key.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the key is outside `[0, 2^63)`.
    pub fn from_key(key: u64) -> crate::Result<Self> {
        if key >= KEY_SPACE {
            return Err(crate::Error::InvalidArgument(format!(
                "message key {key} outside the key space"
            )));
        }
        Ok(Self(key))
    }

    /// Parse an identifier from its string form.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the string is not a valid key.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let key: u64 = s
            .parse()
            .map_err(|_| crate::Error::InvalidArgument(format!("invalid message id {s:?}")))?;
        Self::from_key(key)
    }

    /// The raw numeric key.
    pub const fn key(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = KEY_DIGITS)
    }
}

/// A message as returned to consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identifier, equal to the storage key
    pub id: MessageId,

    /// Message payload
    pub body: Bytes,
}

impl Message {
    /// Create a new message.
    pub const fn new(id: MessageId, body: Bytes) -> Self {
        Self { id, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_key_in_range() {
        for _ in 0..1000 {
            let id = MessageId::random();
            assert!(id.key() < KEY_SPACE);
        }
    }

    #[test]
    fn test_string_order_matches_numeric_order() {
        let a = MessageId::from_key(7).unwrap();
        let b = MessageId::from_key(1_000).unwrap();
        let c = MessageId::from_key(KEY_SPACE - 1).unwrap();
        assert!(a.to_string() < b.to_string());
        assert!(b.to_string() < c.to_string());
        assert_eq!(a.to_string().len(), c.to_string().len());
    }

    #[test]
    fn test_parse_round_trip() {
        let id = MessageId::random();
        let parsed = MessageId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(MessageId::parse("not-a-key").is_err());
        assert!(MessageId::parse(&u64::MAX.to_string()).is_err());
    }
}
