//! # Allocator Error Types
//!
//! All errors that can occur while reserving regions, allocating, freeing,
//! or loading allocator configuration.

use thiserror::Error;

use crate::memory::BlockId;

/// Errors reported by the allocators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The region could not be reserved, or the request does not fit.
    #[error("out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
        /// Bytes still available when the request was made.
        available: usize,
    },

    /// No contiguous run of free pool blocks was long enough.
    #[error("allocation failed: no run of {blocks_needed} contiguous free blocks")]
    AllocationFailed {
        /// Length of the run that was searched for.
        blocks_needed: usize,
    },

    /// A free or deallocate did not match a live allocation.
    #[error("invalid free of block {id:?} (top of stack is {top:?})")]
    InvalidFree {
        /// The block the caller tried to release.
        id: BlockId,
        /// The most recently pushed live block, if any.
        top: Option<BlockId>,
    },

    /// Construction parameters were rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for allocator operations.
pub type AllocResult<T> = Result<T, AllocError>;

/// Errors produced while loading allocator configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(String),

    /// The configuration is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Two pools were declared with the same name.
    #[error("duplicate pool name: {0}")]
    DuplicatePool(String),

    /// A value was rejected by validation or by allocator construction.
    #[error(transparent)]
    Invalid(#[from] AllocError),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
