//! Per-order free sets
//!
//! Each order keeps its free block offsets in an ordered set, so the lowest
//! offset is always handed out first and a specific buddy can be removed in
//! logarithmic time during coalescing.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

#[cfg(feature = "log")]
use log::error;

use super::buddy_block::{BuddyBlock, BuddyGeometry};

/// Free lists for each order, indexed by order.
pub struct SizeClassTable {
    free_lists: Vec<BTreeSet<usize>>,
}

impl SizeClassTable {
    /// Create empty free lists for orders `0..=max_order`.
    pub fn new(max_order: usize) -> Self {
        let mut free_lists = Vec::with_capacity(max_order + 1);
        free_lists.resize_with(max_order + 1, BTreeSet::new);
        Self { free_lists }
    }

    pub fn max_order(&self) -> usize {
        self.free_lists.len() - 1
    }

    /// Remove and return the lowest free offset at `order`.
    pub fn pop_any(&mut self, order: usize) -> Option<usize> {
        self.free_lists.get_mut(order)?.pop_first()
    }

    /// Pop a block from the smallest non-empty order at or above `order`.
    pub fn pop_smallest_fit(&mut self, order: usize) -> Option<BuddyBlock> {
        (order..self.free_lists.len()).find_map(|k| {
            self.pop_any(k).map(|offset| BuddyBlock::new(k, offset))
        })
    }

    /// Remove `offset` from the free set at `order`, returning whether it was
    /// present.
    pub fn remove_if_present(&mut self, order: usize, offset: usize) -> bool {
        match self.free_lists.get_mut(order) {
            Some(list) => list.remove(&offset),
            None => false,
        }
    }

    /// Insert a free block. Returns `false` if it was already free.
    pub fn push(&mut self, order: usize, offset: usize) -> bool {
        match self.free_lists.get_mut(order) {
            Some(list) => list.insert(offset),
            None => {
                error!(
                    "Order {} exceeds maximum order {}",
                    order,
                    self.max_order()
                );
                false
            }
        }
    }

    pub fn contains(&self, order: usize, offset: usize) -> bool {
        self.free_lists
            .get(order)
            .is_some_and(|list| list.contains(&offset))
    }

    /// Number of free blocks at `order`.
    pub fn len(&self, order: usize) -> usize {
        self.free_lists.get(order).map_or(0, BTreeSet::len)
    }

    /// Free offsets at `order`, ascending.
    pub fn iter(&self, order: usize) -> impl Iterator<Item = usize> + '_ {
        self.free_lists.get(order).into_iter().flatten().copied()
    }

    /// Total number of free blocks across all orders.
    pub fn block_count(&self) -> usize {
        self.free_lists.iter().map(BTreeSet::len).sum()
    }

    /// Total free bytes across all orders.
    pub fn free_bytes(&self, geometry: &BuddyGeometry) -> usize {
        self.free_lists
            .iter()
            .enumerate()
            .map(|(order, list)| list.len() * geometry.block_size(order))
            .sum()
    }

    /// Highest order with at least one free block.
    pub fn highest_free_order(&self) -> Option<usize> {
        self.free_lists.iter().rposition(|list| !list.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_any_returns_lowest_offset() {
        let mut table = SizeClassTable::new(3);
        assert!(table.push(0, 48));
        assert!(table.push(0, 16));
        assert!(table.push(0, 32));
        assert_eq!(table.pop_any(0), Some(16));
        assert_eq!(table.pop_any(0), Some(32));
        assert_eq!(table.pop_any(0), Some(48));
        assert_eq!(table.pop_any(0), None);
        assert_eq!(table.pop_any(9), None);
    }

    #[test]
    fn test_pop_smallest_fit_scans_upward() {
        let mut table = SizeClassTable::new(3);
        table.push(2, 64);
        table.push(3, 0);
        let block = table.pop_smallest_fit(1).unwrap();
        assert_eq!(block, BuddyBlock::new(2, 64));
        let block = table.pop_smallest_fit(1).unwrap();
        assert_eq!(block, BuddyBlock::new(3, 0));
        assert!(table.pop_smallest_fit(0).is_none());
    }

    #[test]
    fn test_remove_specific_block() {
        let mut table = SizeClassTable::new(2);
        table.push(1, 0);
        table.push(1, 64);
        assert!(!table.remove_if_present(1, 32));
        assert!(!table.remove_if_present(0, 64));
        assert!(table.remove_if_present(1, 64));
        assert!(!table.contains(1, 64));
        assert!(table.contains(1, 0));
        assert!(!table.remove_if_present(7, 0));
    }

    #[test]
    fn test_push_rejects_duplicates_and_bad_orders() {
        let mut table = SizeClassTable::new(1);
        assert!(table.push(1, 0));
        assert!(!table.push(1, 0));
        assert!(!table.push(2, 0));
        assert_eq!(table.block_count(), 1);
    }

    #[test]
    fn test_accounting() {
        let geometry = BuddyGeometry::new(128, 16).unwrap();
        let mut table = SizeClassTable::new(geometry.max_order());
        table.push(0, 16);
        table.push(1, 32);
        table.push(2, 64);
        assert_eq!(table.free_bytes(&geometry), 16 + 32 + 64);
        assert_eq!(table.len(1), 1);
        assert_eq!(table.highest_free_order(), Some(2));
        assert_eq!(table.iter(0).collect::<Vec<_>>(), [16]);
        assert_eq!(SizeClassTable::new(3).highest_free_order(), None);
    }
}
