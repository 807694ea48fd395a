//! # Memory Management
//!
//! Pre-reserved regions and the allocators that carve them up.
//!
//! ## Design Philosophy
//!
//! Every allocator reserves its region once at construction. Afterwards:
//! - No heap allocations on the hot path
//! - Bookkeeping lives beside the bytes, never inside them
//! - Predictable, bounded latency per call

mod bitmap;
mod linear;
mod pool;
mod region;
mod stack;

pub use bitmap::Bitmap;
pub use linear::LinearAllocator;
pub use pool::PoolAllocator;
pub use region::Region;
pub use stack::{BlockHandle, BlockId, StackAllocator};
