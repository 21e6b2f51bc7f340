//! Buddy block metadata and order arithmetic
//!
//! Represents a block of the region with order and offset information, and
//! the pure size/order/buddy calculations shared by every other component.

use core::cmp::PartialOrd;

use crate::{AllocError, AllocResult};

/// Buddy block metadata
///
/// `offset` is relative to the region base, never an absolute address.
#[derive(Debug, Clone, Copy)]
pub struct BuddyBlock {
    pub order: usize,
    pub offset: usize,
}

impl BuddyBlock {
    /// Create a new buddy block
    pub const fn new(order: usize, offset: usize) -> Self {
        Self { order, offset }
    }

    /// Size of this block in bytes for the given geometry.
    pub fn size(&self, geometry: &BuddyGeometry) -> usize {
        geometry.block_size(self.order)
    }

    /// Offset of this block's buddy.
    /// For a block at order k with offset A, its buddy is at A ^ (2^k * min_block)
    pub fn buddy_offset(&self, geometry: &BuddyGeometry) -> usize {
        geometry.buddy_of(self.offset, self.order)
    }
}

impl PartialOrd for BuddyBlock {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        self.offset.partial_cmp(&other.offset)
    }
}

impl PartialEq for BuddyBlock {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.order == other.order
    }
}

impl Eq for BuddyBlock {}

/// Size-class geometry of a region.
///
/// Order `k` blocks are `min_block << k` bytes, for `k` in `0..=max_order`.
/// All offsets handled here are region-relative, which is what makes the XOR
/// buddy formula exact: the initial block sits at offset 0, and splitting an
/// order `k + 1` block aligned to `min_block << (k + 1)` yields halves at `o`
/// and `o + (min_block << k)`, both aligned to their own size. By induction
/// every live block is size-aligned, so flipping the size bit selects exactly
/// the sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyGeometry {
    min_block: usize,
    max_order: usize,
}

impl BuddyGeometry {
    /// Build the geometry for a region.
    ///
    /// `min_block` must be a power of two. `capacity` is rounded up to the
    /// next power of two and must then be at least `min_block`.
    pub fn new(capacity: usize, min_block: usize) -> AllocResult<Self> {
        if capacity == 0 || min_block == 0 || !min_block.is_power_of_two() {
            return Err(AllocError::InvalidSize);
        }
        let capacity = capacity
            .checked_next_power_of_two()
            .ok_or(AllocError::InvalidSize)?;
        if capacity < min_block {
            return Err(AllocError::InvalidSize);
        }
        let max_order = (capacity / min_block).trailing_zeros() as usize;
        Ok(Self {
            min_block,
            max_order,
        })
    }

    pub const fn min_block(&self) -> usize {
        self.min_block
    }

    pub const fn max_order(&self) -> usize {
        self.max_order
    }

    /// Total region size in bytes (the single block at `max_order`).
    pub const fn capacity(&self) -> usize {
        self.min_block << self.max_order
    }

    #[inline]
    pub const fn block_size(&self, order: usize) -> usize {
        self.min_block << order
    }

    /// Smallest order whose block holds `size` bytes.
    pub fn order_for(&self, size: usize) -> AllocResult<usize> {
        if size == 0 {
            return Err(AllocError::InvalidSize);
        }
        let blocks = size.div_ceil(self.min_block);
        let order = match blocks.checked_next_power_of_two() {
            Some(n) => n.trailing_zeros() as usize,
            None => return Err(AllocError::InvalidSize),
        };
        if order > self.max_order {
            return Err(AllocError::InvalidSize);
        }
        Ok(order)
    }

    /// Offset of the sibling of the order `order` block at `offset`.
    ///
    /// `offset` must be aligned to `block_size(order)`.
    #[inline]
    pub fn buddy_of(&self, offset: usize, order: usize) -> usize {
        debug_assert!(self.is_aligned(offset, order));
        offset ^ self.block_size(order)
    }

    /// Offset of the order `order + 1` block containing `offset`.
    #[inline]
    pub fn parent_of(&self, offset: usize, order: usize) -> usize {
        crate::align_down(offset, self.block_size(order + 1))
    }

    #[inline]
    pub fn is_aligned(&self, offset: usize, order: usize) -> bool {
        crate::is_aligned(offset, self.block_size(order))
    }

    /// Whether `offset` names a possible block start inside the region.
    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        offset < self.capacity() && crate::is_aligned(offset, self.min_block)
    }
}
