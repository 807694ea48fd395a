//! # Allocator Set
//!
//! Builds every allocator a [`MemoryConfig`] asks for and owns them together,
//! so a subsystem can reserve its whole memory budget at startup.

use std::collections::HashMap;

use crate::config::MemoryConfig;
use crate::error::ConfigResult;
use crate::memory::{LinearAllocator, PoolAllocator, StackAllocator};

/// The allocators described by one [`MemoryConfig`].
///
/// # Example
///
/// ```rust
/// use ember_memory::{AllocatorSet, MemoryConfig};
///
/// let config = MemoryConfig::from_toml_str(r#"
///     [linear]
///     capacity_bytes = 1024
///
///     [[pools]]
///     name = "particles"
///     block_size = 32
///     block_count = 64
/// "#)?;
///
/// let mut allocators = AllocatorSet::from_config(&config)?;
/// assert!(allocators.linear_mut().is_some());
/// assert!(allocators.stack_mut().is_none());
/// assert!(allocators.pool_mut("particles").is_some());
/// # Ok::<(), ember_memory::ConfigError>(())
/// ```
#[derive(Debug, Default)]
pub struct AllocatorSet {
    /// Frame scratch allocator.
    linear: Option<LinearAllocator>,
    /// Scoped LIFO allocator.
    stack: Option<StackAllocator>,
    /// Pools by name.
    pools: HashMap<String, PoolAllocator>,
}

impl AllocatorSet {
    /// Validates `config` and reserves every allocator it describes.
    ///
    /// Nothing is kept if any reservation fails.
    ///
    /// # Errors
    ///
    /// Returns the validation errors of [`MemoryConfig::validate`], or
    /// [`crate::ConfigError::Invalid`] wrapping the allocator error if a
    /// region cannot be reserved.
    pub fn from_config(config: &MemoryConfig) -> ConfigResult<Self> {
        config.validate()?;

        let linear = config
            .linear
            .as_ref()
            .map(|linear| LinearAllocator::new(linear.capacity_bytes))
            .transpose()?;
        let stack = config
            .stack
            .as_ref()
            .map(|stack| StackAllocator::new(stack.capacity_bytes))
            .transpose()?;

        let mut pools = HashMap::with_capacity(config.pools.len());
        for pool in &config.pools {
            let allocator = PoolAllocator::new(pool.block_size, pool.block_count)?;
            pools.insert(pool.name.clone(), allocator);
        }

        tracing::debug!(
            linear = linear.is_some(),
            stack = stack.is_some(),
            pools = pools.len(),
            "allocator set reserved"
        );

        Ok(Self {
            linear,
            stack,
            pools,
        })
    }

    /// Returns the linear allocator, if configured.
    #[inline]
    pub fn linear_mut(&mut self) -> Option<&mut LinearAllocator> {
        self.linear.as_mut()
    }

    /// Returns the stack allocator, if configured.
    #[inline]
    pub fn stack_mut(&mut self) -> Option<&mut StackAllocator> {
        self.stack.as_mut()
    }

    /// Returns the pool registered under `name`.
    #[inline]
    pub fn pool_mut(&mut self, name: &str) -> Option<&mut PoolAllocator> {
        self.pools.get_mut(name)
    }

    /// Returns the configured pool names, sorted.
    #[must_use]
    pub fn pool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Total bytes reserved for data across every allocator.
    #[must_use]
    pub fn reserved_bytes(&self) -> usize {
        let linear = self.linear.as_ref().map_or(0, LinearAllocator::capacity);
        let stack = self.stack.as_ref().map_or(0, StackAllocator::capacity);
        let pools: usize = self.pools.values().map(PoolAllocator::capacity).sum();
        linear + stack + pools
    }

    /// Resets every allocator, e.g. at the end of a frame.
    pub fn reset_all(&mut self) {
        if let Some(linear) = &mut self.linear {
            linear.reset();
        }
        if let Some(stack) = &mut self.stack {
            stack.reset();
        }
        for pool in self.pools.values_mut() {
            pool.reset();
        }
    }
}
