//! Buddy allocator module
//!
//! This module provides a complete buddy system implementation with:
//! - Ordered per-order free sets with lowest-offset-first allocation
//! - An allocation registry for double-free detection
//! - Full coalescing on release
//! - Snapshots and optional statistics

pub mod buddy_allocator;
pub mod buddy_block;
pub mod registry;
pub mod size_class;
pub mod stats;

pub use buddy_allocator::{BuddyAllocator, RegionConfig, DEFAULT_REGION_SIZE};
pub use buddy_block::{BuddyBlock, BuddyGeometry};
pub use registry::AllocationRegistry;
pub use size_class::SizeClassTable;
#[cfg(feature = "tracking")]
pub use stats::BuddyStats;
pub use stats::Snapshot;
