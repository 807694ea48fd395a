//! # Ember Memory
//!
//! Manual allocators for hot paths that must not touch the global heap:
//! - [`LinearAllocator`] - bump allocation, bulk reset
//! - [`PoolAllocator`] - fixed-size blocks indexed by an occupancy bitmap
//! - [`StackAllocator`] - LIFO blocks with an addressable directory
//!
//! ## Architecture Rules
//!
//! 1. **One reservation per allocator** - the [`Region`] is reserved at
//!    construction and released on drop
//! 2. **Single owner** - allocators are movable but not cloneable, and are not
//!    internally synchronized
//! 3. **Loud vs quiet failure** - Linear and Stack report [`AllocError`],
//!    Pool exhaustion is a plain `None`
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember_memory::{AllocatorSet, MemoryConfig};
//!
//! let config = MemoryConfig::from_path("config/memory.toml")?;
//! let mut allocators = AllocatorSet::from_config(&config)?;
//!
//! let particles = allocators.pool_mut("particles").unwrap();
//! let slot = particles.allocate(64);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod budget;
pub mod config;
pub mod error;
pub mod memory;

pub use budget::AllocatorSet;
pub use config::{LinearConfig, MemoryConfig, PoolConfig, StackConfig};
pub use error::{AllocError, AllocResult, ConfigError, ConfigResult};
pub use memory::{
    Bitmap, BlockHandle, BlockId, LinearAllocator, PoolAllocator, Region, StackAllocator,
};
