//! Outstanding allocations, keyed by region offset.

use alloc::collections::BTreeMap;

/// Maps the offset of every allocated block to its order.
#[derive(Default)]
pub struct AllocationRegistry {
    records: BTreeMap<usize, usize>,
}

impl AllocationRegistry {
    pub const fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Record a new allocation. Returns `false` if the offset was already
    /// allocated, in which case nothing changes.
    pub fn record(&mut self, offset: usize, order: usize) -> bool {
        if self.records.contains_key(&offset) {
            return false;
        }
        self.records.insert(offset, order);
        true
    }

    pub fn lookup(&self, offset: usize) -> Option<usize> {
        self.records.get(&offset).copied()
    }

    /// Remove the allocation at `offset`, returning its order.
    pub fn lookup_and_remove(&mut self, offset: usize) -> Option<usize> {
        self.records.remove(&offset)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(offset, order)` pairs in ascending offset order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.records.iter().map(|(&offset, &order)| (offset, order))
    }

    pub(crate) fn records(&self) -> &BTreeMap<usize, usize> {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_remove() {
        let mut registry = AllocationRegistry::new();
        assert!(registry.record(32, 1));
        assert!(!registry.record(32, 0));
        assert_eq!(registry.lookup(32), Some(1));
        assert_eq!(registry.lookup_and_remove(32), Some(1));
        assert_eq!(registry.lookup_and_remove(32), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_offset_leaves_state_untouched() {
        let mut registry = AllocationRegistry::new();
        registry.record(0, 2);
        assert_eq!(registry.lookup_and_remove(16), None);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().next(), Some((0, 2)));
    }
}
