//! # Pool Allocator
//!
//! Fixed-size block allocator for objects that are frequently allocated and freed.
//!
//! Occupancy is tracked in a [`Bitmap`] kept apart from the data region, so
//! the block storage itself carries no headers.

use std::ptr::NonNull;

use super::bitmap::Bitmap;
use super::region::Region;
use crate::error::{AllocError, AllocResult};

/// A pool allocator handing out runs of fixed-size blocks.
///
/// Requests are rounded up to whole blocks and served first-fit by ascending
/// block index. A request larger than one block needs that many **contiguous**
/// free blocks. Exhaustion is an expected outcome and is reported as `None`.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust
/// use ember_memory::PoolAllocator;
///
/// let mut pool = PoolAllocator::new(64, 128)?;
///
/// // One block.
/// let particle = pool.allocate(48).expect("pool has room");
/// // Three contiguous blocks.
/// let packet = pool.allocate(150).expect("pool has room");
///
/// pool.free(packet, 150);
/// pool.free(particle, 48);
/// assert!(pool.is_empty());
/// # Ok::<(), ember_memory::AllocError>(())
/// ```
#[derive(Debug)]
pub struct PoolAllocator {
    /// Block storage, `block_size * block_count` bytes.
    region: Region,
    /// One bit per block, set = allocated.
    bitmap: Bitmap,
    /// Size of a single block in bytes.
    block_size: usize,
}

impl PoolAllocator {
    /// Creates a new pool of `block_count` blocks of `block_size` bytes.
    ///
    /// All memory is pre-allocated upfront and every block starts free.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidConfiguration`] if either argument is zero
    /// or their product overflows, and [`AllocError::OutOfMemory`] if the
    /// region or bitmap cannot be reserved.
    pub fn new(block_size: usize, block_count: usize) -> AllocResult<Self> {
        if block_size == 0 {
            return Err(AllocError::InvalidConfiguration(
                "pool block size must be greater than zero".to_string(),
            ));
        }
        if block_count == 0 {
            return Err(AllocError::InvalidConfiguration(
                "pool block count must be greater than zero".to_string(),
            ));
        }
        let capacity = block_size.checked_mul(block_count).ok_or_else(|| {
            AllocError::InvalidConfiguration(format!(
                "pool of {block_count} blocks of {block_size} bytes overflows the address space"
            ))
        })?;

        let region = Region::new(capacity)?;
        let bitmap = Bitmap::new(block_count)?;
        tracing::debug!(block_size, block_count, "pool allocator created");

        Ok(Self {
            region,
            bitmap,
            block_size,
        })
    }

    /// Creates a pool whose blocks are sized for one `T` each.
    ///
    /// # Errors
    ///
    /// Same as [`PoolAllocator::new`]; zero-sized types are rejected.
    pub fn for_type<T>(block_count: usize) -> AllocResult<Self> {
        Self::new(std::mem::size_of::<T>(), block_count)
    }

    /// Returns the size of one block in bytes.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of blocks.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> usize {
        self.bitmap.block_count()
    }

    /// Returns the size of the data region in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Returns the number of allocated blocks.
    #[must_use]
    pub fn allocated_blocks(&self) -> usize {
        self.bitmap.count_set()
    }

    /// Returns the number of free blocks.
    #[must_use]
    pub fn free_blocks(&self) -> usize {
        self.block_count() - self.allocated_blocks()
    }

    /// Returns `true` if no block is allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bitmap.is_clear()
    }

    /// Returns `true` if block `index` is free.
    ///
    /// Out-of-range indices are reported as free.
    #[inline]
    #[must_use]
    pub fn is_block_free(&self, index: usize) -> bool {
        !self.is_block_allocated(index)
    }

    /// Returns `true` if block `index` is allocated.
    ///
    /// Out-of-range indices are reported as not allocated.
    #[inline]
    #[must_use]
    pub fn is_block_allocated(&self, index: usize) -> bool {
        self.bitmap.is_set(index)
    }

    /// Returns the occupancy bitmap.
    #[inline]
    #[must_use]
    pub const fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Returns the number of blocks a request of `size` bytes occupies.
    ///
    /// A zero-byte request still occupies one block.
    #[inline]
    #[must_use]
    pub const fn blocks_for(&self, size: usize) -> usize {
        if size == 0 {
            1
        } else {
            size.div_ceil(self.block_size)
        }
    }

    /// Returns `true` if `address` is the start of a block of this pool.
    #[must_use]
    pub fn is_pointer_valid(&self, address: NonNull<u8>) -> bool {
        self.block_index(address).is_some()
    }

    /// Allocates the first run of free blocks large enough for `size` bytes.
    ///
    /// # Returns
    ///
    /// The address of the first block of the run, or `None` if no run of
    /// contiguous free blocks is long enough.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        let blocks_needed = self.blocks_for(size);
        let Some(start) = self.bitmap.find_clear_run(blocks_needed) else {
            tracing::debug!(size, blocks_needed, "pool has no contiguous run");
            return None;
        };

        self.bitmap.set_run(start, blocks_needed);
        Some(self.region.address_at(start * self.block_size))
    }

    /// Like [`PoolAllocator::allocate`], but reports exhaustion as an error.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::AllocationFailed`] if no run is long enough.
    pub fn try_allocate(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
        let blocks_needed = self.blocks_for(size);
        self.allocate(size)
            .ok_or(AllocError::AllocationFailed { blocks_needed })
    }

    /// Frees the blocks covering `size` bytes starting at `address`.
    ///
    /// Addresses outside the pool or not on a block boundary are ignored, so
    /// stray frees cannot corrupt the bitmap. Clearing stops at the last block.
    pub fn free(&mut self, address: NonNull<u8>, size: usize) {
        let Some(index) = self.block_index(address) else {
            tracing::debug!(?address, "ignoring free of foreign or misaligned address");
            return;
        };

        self.bitmap.clear_run(index, self.blocks_for(size));
    }

    /// Frees every block without checking for outstanding allocations.
    ///
    /// Previously returned addresses must not be used afterwards.
    pub fn reset(&mut self) {
        tracing::trace!(released = self.allocated_blocks(), "pool allocator reset");
        self.bitmap.clear_all();
    }

    /// Returns the bytes of an allocation, if every block it covers is
    /// allocated.
    pub fn bytes_mut(&mut self, address: NonNull<u8>, size: usize) -> Option<&mut [u8]> {
        let index = self.block_index(address)?;
        let blocks = self.blocks_for(size);
        let covered = (index..index.checked_add(blocks)?).all(|i| self.bitmap.is_set(i));
        if !covered {
            return None;
        }

        let start = index * self.block_size;
        self.region.bytes_mut(start..start.checked_add(size)?)
    }

    /// Maps a block-aligned address inside the region to its block index.
    fn block_index(&self, address: NonNull<u8>) -> Option<usize> {
        let offset = self.region.offset_of(address)?;
        (offset % self.block_size == 0).then_some(offset / self.block_size)
    }
}
