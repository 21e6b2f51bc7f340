//! Statistics and introspection for the buddy allocator
//!
//! [`Snapshot`] is a point-in-time copy of the allocator state used for
//! diagnostics and test assertions. [`BuddyStats`] holds running counters and
//! is only compiled with the `tracking` feature.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// Copy of the free lists and allocation map at one instant.
///
/// All offsets are region-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub capacity: usize,
    pub min_block: usize,
    /// Free offsets for each order, ascending, indexed by order.
    pub free_lists: Vec<Vec<usize>>,
    /// Offset to order of every outstanding allocation.
    pub allocations: BTreeMap<usize, usize>,
}

impl Snapshot {
    #[inline]
    fn block_size(&self, order: usize) -> usize {
        self.min_block << order
    }

    pub fn free_bytes(&self) -> usize {
        self.free_lists
            .iter()
            .enumerate()
            .map(|(order, list)| list.len() * self.block_size(order))
            .sum()
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocations
            .values()
            .map(|&order| self.block_size(order))
            .sum()
    }

    pub fn free_block_count(&self) -> usize {
        self.free_lists.iter().map(Vec::len).sum()
    }

    /// Free blocks as `(offset, size)` pairs, ascending by offset.
    pub fn free_blocks(&self) -> Vec<(usize, usize)> {
        let mut blocks: Vec<(usize, usize)> = self
            .free_lists
            .iter()
            .enumerate()
            .flat_map(|(order, list)| list.iter().map(move |&off| (off, order)))
            .map(|(off, order)| (off, self.block_size(order)))
            .collect();
        blocks.sort_unstable();
        blocks
    }
}

/// Buddy system statistics
#[cfg(feature = "tracking")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuddyStats {
    pub total_bytes: usize,
    pub free_bytes: usize,
    pub used_bytes: usize,
    pub allocations: usize,
    pub releases: usize,
    pub splits: usize,
    pub merges: usize,
    pub failed_allocations: usize,
    pub invalid_frees: usize,
}

#[cfg(feature = "tracking")]
impl BuddyStats {
    pub const fn new(total_bytes: usize) -> Self {
        Self {
            total_bytes,
            free_bytes: total_bytes,
            used_bytes: 0,
            allocations: 0,
            releases: 0,
            splits: 0,
            merges: 0,
            failed_allocations: 0,
            invalid_frees: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_snapshot_accounting() {
        let mut allocations = BTreeMap::new();
        allocations.insert(0, 0);
        allocations.insert(64, 2);
        let snapshot = Snapshot {
            capacity: 128,
            min_block: 16,
            free_lists: vec![vec![16], vec![32], vec![], vec![]],
            allocations,
        };
        assert_eq!(snapshot.free_bytes(), 48);
        assert_eq!(snapshot.allocated_bytes(), 80);
        assert_eq!(snapshot.free_block_count(), 2);
        assert_eq!(snapshot.free_blocks(), vec![(16, 16), (32, 32)]);
    }
}
