//! Key-space ring view.
//!
//! Every peer derives the same view from the same member set: member names
//! are sorted, and the 63-bit key space is split into equal contiguous
//! slices, one per member, in name order. Membership churn reshuffles
//! ownership of much of the key space; the eventual-delivery model absorbs
//! the resulting duplicate or skipped reads.

use crate::membership::Member;
use veloq_core::{KeyRange, KEY_SPACE};

/// This node's position within the sorted member list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingView {
    position: usize,
    count: usize,
}

impl RingView {
    /// Build the view for `local_name` from a member snapshot.
    ///
    /// Returns `None` when the local node is not in the list; callers must
    /// treat the slice as unavailable rather than guess a position.
    pub fn new(members: &[Member], local_name: &str) -> Option<Self> {
        let mut names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        let position = names.binary_search(&local_name).ok()?;
        Some(Self { position, count: names.len() })
    }

    /// Number of distinct members in the view.
    pub const fn node_count(&self) -> usize {
        self.count
    }

    /// This node's contiguous slice of the key space.
    ///
    /// `step = KEY_SPACE / node_count`; the slice is
    /// `[position * step, (position + 1) * step)`.
    pub fn slice(&self) -> KeyRange {
        let step = KEY_SPACE / self.count as u64;
        KeyRange::new(self.position as u64 * step, (self.position as u64 + 1) * step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(names: &[&str]) -> Vec<Member> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Member::new(*name, format!("127.0.0.1:{}", 7000 + i).parse().unwrap()))
            .collect()
    }

    #[test]
    fn test_three_member_slice() {
        let members = members(&["a", "b", "c"]);
        let view = RingView::new(&members, "b").unwrap();
        let step = KEY_SPACE / 3;
        assert_eq!(view.slice(), KeyRange::new(step, 2 * step));
    }

    #[test]
    fn test_view_ignores_input_order() {
        let shuffled = members(&["c", "a", "b"]);
        let sorted = members(&["a", "b", "c"]);
        assert_eq!(RingView::new(&shuffled, "b"), RingView::new(&sorted, "b"));
    }

    #[test]
    fn test_slices_cover_and_do_not_overlap() {
        for count in 1..=5 {
            let names: Vec<String> = (0..count).map(|i| format!("node-{i}")).collect();
            let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let roster = members(&name_refs);
            let step = KEY_SPACE / count as u64;

            let mut slices: Vec<KeyRange> =
                names.iter().map(|n| RingView::new(&roster, n).unwrap().slice()).collect();
            slices.sort_by_key(|r| r.lo);

            assert_eq!(slices[0].lo, 0);
            assert_eq!(slices.last().unwrap().hi, count as u64 * step);
            for pair in slices.windows(2) {
                assert_eq!(pair[0].hi, pair[1].lo);
            }
        }
    }

    #[test]
    fn test_unknown_local_node() {
        let members = members(&["a", "b"]);
        assert!(RingView::new(&members, "z").is_none());
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let mut roster = members(&["a", "b"]);
        roster.push(Member::new("a", "127.0.0.1:9999".parse().unwrap()));
        let view = RingView::new(&roster, "b").unwrap();
        assert_eq!(view.node_count(), 2);
    }
}
