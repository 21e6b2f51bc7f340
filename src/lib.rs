//! Buddy Region Allocator
//!
//! A power-of-two buddy allocator managing a single contiguous region whose
//! backing memory is supplied by an external provider. The allocator only
//! hands out addresses inside the region, it never reads or writes the memory
//! itself, so the base may be a device handle as well as a host pointer.
//!
//! - Size-class free lists, one per order
//! - Block splitting on allocation, full buddy coalescing on release
//! - Allocation registry for double-free detection
//! - Spin-locked front end for multi-threaded callers

#![no_std]

extern crate alloc;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Default minimum block size in bytes.
pub const DEFAULT_MIN_BLOCK: usize = 16;

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Zero-sized or oversized request, or an invalid region geometry.
    InvalidSize,
    /// No free block is large enough, even if free bytes remain.
    OutOfMemory,
    /// Release of an address that is not currently allocated.
    InvalidFree,
    /// An allocator invariant was found broken.
    InternalInconsistency,
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSize => write!(f, "invalid allocation size"),
            Self::OutOfMemory => write!(f, "out of memory: no free block large enough"),
            Self::InvalidFree => write!(f, "address is not currently allocated"),
            Self::InternalInconsistency => write!(f, "buddy allocator state is inconsistent"),
        }
    }
}

impl core::error::Error for AllocError {}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// Region-granularity allocator.
///
/// Addresses are `base + offset` where `base` is the opaque handle the region
/// was created with.
pub trait RegionAllocator {
    /// Allocate a block of at least `size` bytes.
    fn allocate(&mut self, size: usize) -> AllocResult<usize>;

    /// Release a block previously returned by [`RegionAllocator::allocate`].
    fn release(&mut self, addr: usize) -> AllocResult;

    /// Returns total memory size in bytes.
    fn total_bytes(&self) -> usize;

    /// Returns allocated memory size in bytes (granted sizes, not requested).
    fn used_bytes(&self) -> usize;

    /// Returns available memory size in bytes.
    fn available_bytes(&self) -> usize;
}

#[inline]
const fn align_down(pos: usize, align: usize) -> usize {
    pos & !(align - 1)
}

/// Checks whether the address has the demanded alignment.
///
/// Equivalent to `addr % align == 0`, but the alignment must be a power of two.
#[inline]
const fn is_aligned(base_addr: usize, align: usize) -> bool {
    base_addr & (align - 1) == 0
}

// Export our allocator implementations
pub mod buddy;
#[cfg(feature = "tracking")]
pub use buddy::BuddyStats;
pub use buddy::{BuddyAllocator, BuddyBlock, BuddyGeometry, RegionConfig, Snapshot};

pub mod locked_allocator;
pub use locked_allocator::LockedBuddyAllocator;
