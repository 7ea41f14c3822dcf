//! # Veloq Cluster
//!
//! Cluster membership interface and key-space placement for the Veloq
//! broker.
//!
//! Gossip itself is an external collaborator; this crate defines the
//! [`Membership`] seam the broker reads peers through, and the
//! deterministic [`RingView`] that turns a member snapshot into this
//! node's slice of the message key space.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod membership;
pub mod ring;

pub use membership::{Member, Membership, StaticMembership};
pub use ring::RingView;
