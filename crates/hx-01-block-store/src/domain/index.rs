//! # Height Index
//!
//! In-memory mirror of the persisted height tables, ordered by
//! `(height, signature)`. Rebuilt from the ascending table on open and
//! updated incrementally on every put and delete. The signature -> block
//! table stays the source of truth.

use shared_types::{BlockSignature, SIGNATURE_LENGTH};
use std::collections::{BTreeSet, HashMap};
use std::ops::RangeInclusive;

const MIN_SIGNATURE: BlockSignature = BlockSignature([0x00; SIGNATURE_LENGTH]);
const MAX_SIGNATURE: BlockSignature = BlockSignature([0xFF; SIGNATURE_LENGTH]);

/// Traversal order for range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Ordered `(height, signature)` set with a reverse lookup by signature.
#[derive(Debug, Clone, Default)]
pub struct HeightIndex {
    entries: BTreeSet<(u64, BlockSignature)>,
    heights: HashMap<BlockSignature, u64>,
}

impl HeightIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `signature` at `height`.
    ///
    /// Returns the height it was previously indexed at, if any.
    pub fn insert(&mut self, height: u64, signature: BlockSignature) -> Option<u64> {
        let previous = self.heights.insert(signature, height);
        if let Some(old) = previous {
            self.entries.remove(&(old, signature));
        }
        self.entries.insert((height, signature));
        previous
    }

    /// Drop `signature`, returning the height it was indexed at.
    pub fn remove(&mut self, signature: &BlockSignature) -> Option<u64> {
        let height = self.heights.remove(signature)?;
        self.entries.remove(&(height, *signature));
        Some(height)
    }

    pub fn height_of(&self, signature: &BlockSignature) -> Option<u64> {
        self.heights.get(signature).copied()
    }

    pub fn contains(&self, signature: &BlockSignature) -> bool {
        self.heights.contains_key(signature)
    }

    /// Signatures stored at `height`, in signature order.
    pub fn at_height(&self, height: u64) -> impl Iterator<Item = BlockSignature> + '_ {
        self.entries
            .range(Self::span(height, height))
            .map(|(_, signature)| *signature)
    }

    /// Signatures with heights in `from..=to`, in the requested order.
    ///
    /// Empty when `from > to`.
    pub fn range(&self, from: u64, to: u64, order: Order) -> Vec<BlockSignature> {
        if from > to {
            return Vec::new();
        }
        let span = self.entries.range(Self::span(from, to));
        match order {
            Order::Ascending => span.map(|(_, s)| *s).collect(),
            Order::Descending => span.rev().map(|(_, s)| *s).collect(),
        }
    }

    /// Highest indexed height.
    pub fn latest_height(&self) -> Option<u64> {
        self.entries.last().map(|(height, _)| *height)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn span(from: u64, to: u64) -> RangeInclusive<(u64, BlockSignature)> {
        (from, MIN_SIGNATURE)..=(to, MAX_SIGNATURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(byte: u8) -> BlockSignature {
        BlockSignature([byte; SIGNATURE_LENGTH])
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut index = HeightIndex::new();
        assert_eq!(index.insert(1, sig(1)), None);
        assert_eq!(index.insert(2, sig(2)), None);

        assert_eq!(index.height_of(&sig(2)), Some(2));
        assert_eq!(index.at_height(1).collect::<Vec<_>>(), vec![sig(1)]);
        assert_eq!(index.latest_height(), Some(2));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_reinsert_moves_entry() {
        let mut index = HeightIndex::new();
        index.insert(3, sig(7));
        assert_eq!(index.insert(5, sig(7)), Some(3));

        assert_eq!(index.len(), 1);
        assert_eq!(index.at_height(3).count(), 0);
        assert_eq!(index.height_of(&sig(7)), Some(5));
    }

    #[test]
    fn test_range_orders() {
        let mut index = HeightIndex::new();
        for h in 1..=5u8 {
            index.insert(h as u64, sig(h));
        }
        assert_eq!(index.range(2, 4, Order::Ascending), vec![sig(2), sig(3), sig(4)]);
        assert_eq!(index.range(2, 4, Order::Descending), vec![sig(4), sig(3), sig(2)]);
        assert!(index.range(4, 2, Order::Ascending).is_empty());
    }

    #[test]
    fn test_remove_clears_both_views() {
        let mut index = HeightIndex::new();
        index.insert(1, sig(1));
        assert_eq!(index.remove(&sig(1)), Some(1));
        assert_eq!(index.remove(&sig(1)), None);
        assert!(index.is_empty());
        assert!(!index.contains(&sig(1)));
    }

    #[test]
    fn test_fork_heights_share_a_slot() {
        let mut index = HeightIndex::new();
        index.insert(4, sig(9));
        index.insert(4, sig(2));
        assert_eq!(index.at_height(4).collect::<Vec<_>>(), vec![sig(2), sig(9)]);
    }
}
