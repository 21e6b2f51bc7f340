//! Thread-safe buddy allocator front end.
//!
//! Wraps a [`BuddyAllocator`] in a single spin lock so that it can be shared
//! between threads. Every operation holds the lock for its whole duration and
//! the guard is dropped on every return path, so no caller ever observes a
//! half-split or half-merged state.

use crate::buddy::{BuddyAllocator, RegionConfig, Snapshot};
use crate::{AllocResult, RegionAllocator};
use kspin::SpinNoIrq;

#[cfg(feature = "tracking")]
use crate::buddy::BuddyStats;

/// Buddy allocator shared between threads
pub struct LockedBuddyAllocator {
    inner: SpinNoIrq<BuddyAllocator>,
    base: usize,
    capacity: usize,
}

impl LockedBuddyAllocator {
    /// Create a shared allocator for the region starting at `base`.
    ///
    /// See [`BuddyAllocator::new`] for how the geometry is validated.
    pub fn new(base: usize, capacity: usize, min_block: usize) -> AllocResult<Self> {
        Ok(Self::from_allocator(BuddyAllocator::new(
            base, capacity, min_block,
        )?))
    }

    pub fn with_config(base: usize, config: RegionConfig) -> AllocResult<Self> {
        Self::new(base, config.capacity, config.min_block)
    }

    /// Take ownership of an existing allocator, keeping its current state.
    pub fn from_allocator(allocator: BuddyAllocator) -> Self {
        Self {
            base: allocator.base(),
            capacity: allocator.capacity(),
            inner: SpinNoIrq::new(allocator),
        }
    }

    pub const fn base(&self) -> usize {
        self.base
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocate a block of at least `size` bytes.
    pub fn allocate(&self, size: usize) -> AllocResult<usize> {
        self.inner.lock().allocate(size)
    }

    /// Allocate a block of at least `size` bytes aligned to `align` relative to
    /// the region base.
    pub fn allocate_aligned(&self, size: usize, align: usize) -> AllocResult<usize> {
        self.inner.lock().allocate_aligned(size, align)
    }

    /// Release a block, coalescing it with free buddies.
    pub fn release(&self, addr: usize) -> AllocResult {
        self.inner.lock().release(addr)
    }

    pub fn granted_size(&self, addr: usize) -> Option<usize> {
        self.inner.lock().granted_size(addr)
    }

    pub fn is_allocated(&self, addr: usize) -> bool {
        self.inner.lock().is_allocated(addr)
    }

    pub fn largest_free_block(&self) -> Option<usize> {
        self.inner.lock().largest_free_block()
    }

    pub fn allocation_count(&self) -> usize {
        self.inner.lock().allocation_count()
    }

    pub fn available_bytes(&self) -> usize {
        self.inner.lock().available_bytes()
    }

    /// Consistent copy of the free lists and allocation map.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().snapshot()
    }

    pub fn check_invariants(&self) -> AllocResult {
        self.inner.lock().check_invariants()
    }

    /// Get buddy allocator statistics
    #[cfg(feature = "tracking")]
    pub fn stats(&self) -> BuddyStats {
        self.inner.lock().stats()
    }
}

impl RegionAllocator for LockedBuddyAllocator {
    fn allocate(&mut self, size: usize) -> AllocResult<usize> {
        LockedBuddyAllocator::allocate(self, size)
    }

    fn release(&mut self, addr: usize) -> AllocResult {
        LockedBuddyAllocator::release(self, addr)
    }

    fn total_bytes(&self) -> usize {
        self.capacity
    }

    fn used_bytes(&self) -> usize {
        self.inner.lock().used_bytes()
    }

    fn available_bytes(&self) -> usize {
        LockedBuddyAllocator::available_bytes(self)
    }
}
