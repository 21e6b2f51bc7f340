//! Single-region buddy allocator
//!
//! Implements the core buddy system: blocks are split on allocation, keeping
//! the lower half and freeing the upper half, and merged with their buddy on
//! release for as many orders as possible. This type is not synchronized; see
//! [`crate::LockedBuddyAllocator`] for the shared front end.

use alloc::vec::Vec;

use crate::{AllocError, AllocResult, RegionAllocator};

#[cfg(feature = "log")]
use log::{debug, error, info, trace, warn};

#[cfg(feature = "tracking")]
use super::stats::BuddyStats;
use super::{
    buddy_block::{BuddyBlock, BuddyGeometry},
    registry::AllocationRegistry,
    size_class::SizeClassTable,
    stats::Snapshot,
};

/// Default region size used by [`RegionConfig::default`]: 1MB
pub const DEFAULT_REGION_SIZE: usize = 0x10_0000;

/// Region geometry requested from the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionConfig {
    /// Region size in bytes, rounded up to the next power of two.
    pub capacity: usize,
    /// Smallest block handed out, must be a power of two.
    pub min_block: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_REGION_SIZE,
            min_block: crate::DEFAULT_MIN_BLOCK,
        }
    }
}

/// Buddy allocator over one region
///
/// Addresses returned to callers are `base + offset`. Internally every block is
/// identified by its region-relative offset, so `base` is never dereferenced
/// and may be any handle the memory provider chooses. A returned block is
/// aligned to its granted size relative to `base`, and absolutely aligned when
/// `base` itself is aligned to the capacity.
pub struct BuddyAllocator {
    base: usize,
    geometry: BuddyGeometry,
    /// Free lists for each order
    free_lists: SizeClassTable,
    registry: AllocationRegistry,
    #[cfg(feature = "tracking")]
    stats: BuddyStats,
}

impl BuddyAllocator {
    /// Create an allocator for the region starting at `base`.
    ///
    /// `capacity` is rounded up to the next power of two; `min_block` must be
    /// a power of two no larger than the rounded capacity.
    pub fn new(base: usize, capacity: usize, min_block: usize) -> AllocResult<Self> {
        let geometry = match BuddyGeometry::new(capacity, min_block) {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!(
                    "buddy allocator: invalid region: capacity {:#x}, min block {:#x}",
                    capacity, min_block
                );
                return Err(e);
            }
        };
        if base.checked_add(geometry.capacity() - 1).is_none() {
            warn!(
                "buddy allocator: region at {:#x} with capacity {:#x} overflows the address space",
                base,
                geometry.capacity()
            );
            return Err(AllocError::InvalidSize);
        }

        let mut free_lists = SizeClassTable::new(geometry.max_order());
        free_lists.push(geometry.max_order(), 0);

        info!(
            "buddy allocator: region [{:#x}, {:#x}), min block {:#x}, max order {}",
            base,
            base + (geometry.capacity() - 1),
            geometry.min_block(),
            geometry.max_order()
        );

        Ok(Self {
            base,
            geometry,
            free_lists,
            registry: AllocationRegistry::new(),
            #[cfg(feature = "tracking")]
            stats: BuddyStats::new(geometry.capacity()),
        })
    }

    pub fn with_config(base: usize, config: RegionConfig) -> AllocResult<Self> {
        Self::new(base, config.capacity, config.min_block)
    }

    pub const fn base(&self) -> usize {
        self.base
    }

    pub const fn capacity(&self) -> usize {
        self.geometry.capacity()
    }

    pub const fn min_block(&self) -> usize {
        self.geometry.min_block()
    }

    pub const fn max_order(&self) -> usize {
        self.geometry.max_order()
    }

    pub const fn geometry(&self) -> &BuddyGeometry {
        &self.geometry
    }

    /// Translate an address into a region offset.
    fn offset_of(&self, addr: usize) -> Option<usize> {
        addr.checked_sub(self.base)
            .filter(|&offset| offset < self.geometry.capacity())
    }

    /// Allocate a block of at least `size` bytes.
    ///
    /// The granted block is `min_block << order_for(size)` bytes. Among free
    /// blocks of the smallest sufficient order, the lowest offset is used.
    pub fn allocate(&mut self, size: usize) -> AllocResult<usize> {
        if size == 0 || size > self.geometry.capacity() {
            debug!(
                "buddy allocator: rejecting request of {:#x} bytes (capacity {:#x})",
                size,
                self.geometry.capacity()
            );
            return Err(AllocError::InvalidSize);
        }
        let order = self.geometry.order_for(size)?;
        self.allocate_order(order)
    }

    /// Allocate a block of at least `size` bytes aligned to `align` relative to
    /// the region base.
    pub fn allocate_aligned(&mut self, size: usize, align: usize) -> AllocResult<usize> {
        if !align.is_power_of_two() || align > self.geometry.capacity() {
            debug!(
                "buddy allocator: rejecting alignment {:#x} (capacity {:#x})",
                align,
                self.geometry.capacity()
            );
            return Err(AllocError::InvalidSize);
        }
        if size == 0 || size > self.geometry.capacity() {
            return Err(AllocError::InvalidSize);
        }
        let order = self
            .geometry
            .order_for(size)?
            .max(self.geometry.order_for(align)?);
        self.allocate_order(order)
    }

    fn allocate_order(&mut self, order: usize) -> AllocResult<usize> {
        let Some(mut block) = self.free_lists.pop_smallest_fit(order) else {
            debug!(
                "buddy allocator: out of memory for order {} ({:#x} bytes), largest free block {:?}",
                order,
                self.geometry.block_size(order),
                self.largest_free_block()
            );
            #[cfg(feature = "tracking")]
            {
                self.stats.failed_allocations += 1;
            }
            return Err(AllocError::OutOfMemory);
        };

        // Split down to the required order, keeping the lower half
        while block.order > order {
            block.order -= 1;
            let upper = block.offset + self.geometry.block_size(block.order);
            if !self.free_lists.push(block.order, upper) {
                error!(
                    "buddy allocator: split half at offset {:#x} order {} is already free",
                    upper, block.order
                );
                return Err(AllocError::InternalInconsistency);
            }
            trace!(
                "buddy allocator: split, freed upper half {:#x} at order {}",
                upper,
                block.order
            );
            #[cfg(feature = "tracking")]
            {
                self.stats.splits += 1;
            }
        }

        if !self.registry.record(block.offset, order) {
            error!(
                "buddy allocator: offset {:#x} handed out while already allocated",
                block.offset
            );
            return Err(AllocError::InternalInconsistency);
        }

        #[cfg(feature = "tracking")]
        {
            let size = self.geometry.block_size(order);
            self.stats.allocations += 1;
            self.stats.used_bytes += size;
            self.stats.free_bytes -= size;
        }

        Ok(self.base + block.offset)
    }

    /// Release a block previously returned by an allocate call.
    ///
    /// The block is merged with its buddy for as long as the buddy is free,
    /// so no two free buddies are ever left side by side. Unknown addresses
    /// and double frees fail with [`AllocError::InvalidFree`] without touching
    /// any state.
    pub fn release(&mut self, addr: usize) -> AllocResult {
        let Some(offset) = self.offset_of(addr) else {
            warn!(
                "buddy allocator: release of {:#x} outside region [{:#x}, +{:#x})",
                addr,
                self.base,
                self.geometry.capacity()
            );
            #[cfg(feature = "tracking")]
            {
                self.stats.invalid_frees += 1;
            }
            return Err(AllocError::InvalidFree);
        };
        let Some(order) = self.registry.lookup_and_remove(offset) else {
            warn!(
                "buddy allocator: release of {:#x} which is not allocated (double free?)",
                addr
            );
            #[cfg(feature = "tracking")]
            {
                self.stats.invalid_frees += 1;
            }
            return Err(AllocError::InvalidFree);
        };

        #[cfg(feature = "tracking")]
        {
            let size = self.geometry.block_size(order);
            self.stats.releases += 1;
            self.stats.used_bytes -= size;
            self.stats.free_bytes += size;
        }

        let mut block = BuddyBlock::new(order, offset);
        while block.order < self.geometry.max_order() {
            let buddy = block.buddy_offset(&self.geometry);
            if !self.free_lists.remove_if_present(block.order, buddy) {
                break;
            }
            trace!(
                "buddy allocator: merged {:#x} with buddy {:#x} at order {}",
                block.offset,
                buddy,
                block.order
            );
            block.offset = block.offset.min(buddy);
            block.order += 1;
            #[cfg(feature = "tracking")]
            {
                self.stats.merges += 1;
            }
        }

        if !self.free_lists.push(block.order, block.offset) {
            error!(
                "buddy allocator: released block {:#x} order {} is already free",
                block.offset, block.order
            );
            return Err(AllocError::InternalInconsistency);
        }
        Ok(())
    }

    /// Granted size of the allocation at `addr`, if it is allocated.
    pub fn granted_size(&self, addr: usize) -> Option<usize> {
        let offset = self.offset_of(addr)?;
        self.registry
            .lookup(offset)
            .map(|order| self.geometry.block_size(order))
    }

    pub fn is_allocated(&self, addr: usize) -> bool {
        self.granted_size(addr).is_some()
    }

    /// Size of the largest free block, i.e. the largest request that can
    /// currently succeed.
    pub fn largest_free_block(&self) -> Option<usize> {
        self.free_lists
            .highest_free_order()
            .map(|order| self.geometry.block_size(order))
    }

    /// Number of free blocks in a specific order
    pub fn free_block_count(&self, order: usize) -> usize {
        self.free_lists.len(order)
    }

    /// Number of outstanding allocations.
    pub fn allocation_count(&self) -> usize {
        self.registry.len()
    }

    /// Copy the current free lists and allocation map.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            capacity: self.geometry.capacity(),
            min_block: self.geometry.min_block(),
            free_lists: (0..=self.geometry.max_order())
                .map(|order| self.free_lists.iter(order).collect())
                .collect(),
            allocations: self.registry.records().clone(),
        }
    }

    #[cfg(feature = "tracking")]
    pub fn stats(&self) -> BuddyStats {
        self.stats
    }

    /// Verify the block invariants over the whole region.
    ///
    /// Checks that every free and allocated block is aligned to its size and
    /// inside the region, that no two blocks overlap, that together they cover
    /// the region exactly, and that no two free buddies remain unmerged.
    pub fn check_invariants(&self) -> AllocResult {
        let capacity = self.geometry.capacity();
        let mut blocks: Vec<(usize, usize)> = Vec::new();

        for order in 0..=self.geometry.max_order() {
            for offset in self.free_lists.iter(order) {
                blocks.push((offset, order));
                if order < self.geometry.max_order()
                    && self
                        .free_lists
                        .contains(order, self.geometry.buddy_of(offset, order))
                {
                    error!(
                        "buddy allocator: free buddies {:#x} and {:#x} left unmerged at order {}",
                        offset,
                        self.geometry.buddy_of(offset, order),
                        order
                    );
                    return Err(AllocError::InternalInconsistency);
                }
            }
        }
        blocks.extend(self.registry.iter());

        let mut covered = 0usize;
        let mut end = 0usize;
        blocks.sort_unstable();
        for (offset, order) in blocks {
            if order > self.geometry.max_order() || !self.geometry.is_aligned(offset, order) {
                error!(
                    "buddy allocator: block {:#x} is misaligned for order {}",
                    offset, order
                );
                return Err(AllocError::InternalInconsistency);
            }
            let size = self.geometry.block_size(order);
            if offset < end || offset >= capacity || size > capacity - offset {
                error!(
                    "buddy allocator: block [{:#x}, {:#x}) overlaps a neighbour or leaves the region",
                    offset,
                    offset + size
                );
                return Err(AllocError::InternalInconsistency);
            }
            end = offset + size;
            covered += size;
        }

        if covered != capacity {
            error!(
                "buddy allocator: blocks cover {:#x} of {:#x} bytes",
                covered, capacity
            );
            return Err(AllocError::InternalInconsistency);
        }
        Ok(())
    }
}

impl RegionAllocator for BuddyAllocator {
    fn allocate(&mut self, size: usize) -> AllocResult<usize> {
        BuddyAllocator::allocate(self, size)
    }

    fn release(&mut self, addr: usize) -> AllocResult {
        BuddyAllocator::release(self, addr)
    }

    fn total_bytes(&self) -> usize {
        self.geometry.capacity()
    }

    fn used_bytes(&self) -> usize {
        self.geometry.capacity() - self.available_bytes()
    }

    fn available_bytes(&self) -> usize {
        self.free_lists.free_bytes(&self.geometry)
    }
}
