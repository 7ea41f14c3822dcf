//! Cluster membership.
//!
//! Membership itself is maintained by an external gossip protocol; this
//! module defines the interface the broker consumes and a static
//! implementation for single-node and fixed-roster deployments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// A cluster peer as reported by the membership layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    /// Unique member name
    pub name: String,
    /// Gossip address
    pub addr: SocketAddr,
}

impl Member {
    /// Create a new member.
    pub fn new(name: impl Into<String>, addr: SocketAddr) -> Self {
        Self { name: name.into(), addr }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.addr)
    }
}

/// The membership view the broker consumes.
///
/// Implementations adapt a gossip library; the returned list is a
/// point-in-time snapshot and may lag the true cluster state.
pub trait Membership: Send + Sync + 'static {
    /// This node's member name.
    fn local_name(&self) -> &str;

    /// Snapshot of the currently known members, local node included.
    fn members(&self) -> Vec<Member>;
}

/// A fixed member roster.
#[derive(Debug, Clone)]
pub struct StaticMembership {
    local: Member,
    peers: Vec<Member>,
}

impl StaticMembership {
    /// Create a roster from the local member and its known peers.
    pub fn new(local: Member, peers: Vec<Member>) -> Self {
        Self { local, peers }
    }

    /// Create a single-node roster.
    pub fn solo(local: Member) -> Self {
        Self::new(local, Vec::new())
    }
}

impl Membership for StaticMembership {
    fn local_name(&self) -> &str {
        &self.local.name
    }

    fn members(&self) -> Vec<Member> {
        let mut members = Vec::with_capacity(self.peers.len() + 1);
        members.push(self.local.clone());
        members.extend(self.peers.iter().cloned());
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, port: u16) -> Member {
        Member::new(name, format!("127.0.0.1:{port}").parse().unwrap())
    }

    #[test]
    fn test_solo_roster() {
        let membership = StaticMembership::solo(member("a", 7001));
        assert_eq!(membership.local_name(), "a");
        assert_eq!(membership.members().len(), 1);
    }

    #[test]
    fn test_roster_includes_local_and_peers() {
        let membership =
            StaticMembership::new(member("b", 7002), vec![member("a", 7001), member("c", 7003)]);
        let names: Vec<String> = membership.members().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
