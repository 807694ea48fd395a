//! # Stack Allocator
//!
//! LIFO allocator for nested-scope allocations. Every block gets an id and a
//! directory record, and only the most recent block can be released.

use std::ptr::NonNull;

use super::region::Region;
use crate::error::{AllocError, AllocResult};

/// Identifier of a stack block.
///
/// Ids are assigned in increasing order starting at 1 and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

impl BlockId {
    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Handle to a block pushed onto a [`StackAllocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHandle {
    /// The block id.
    pub id: BlockId,
    /// Size of the block in bytes.
    pub size: usize,
    /// Offset of the block from the start of the region.
    pub offset: usize,
    /// Address of the first byte of the block.
    pub address: NonNull<u8>,
}

/// Directory record of a live block.
#[derive(Clone, Copy, Debug)]
struct BlockRecord {
    id: BlockId,
    size: usize,
    offset: usize,
}

/// A LIFO allocator over a single [`Region`].
///
/// Blocks are laid out back to back: the block pushed after block `i` starts
/// where block `i` ends. Releasing anything but the top block is rejected,
/// because it would corrupt the offsets of every later push.
///
/// # Thread Safety
///
/// This allocator is NOT synchronized. Use one per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust
/// use ember_memory::StackAllocator;
///
/// let mut stack = StackAllocator::new(256)?;
/// let outer = stack.allocate(64)?;
/// let inner = stack.allocate(32)?;
///
/// // Out of order is refused.
/// assert!(stack.deallocate(outer.id).is_err());
///
/// stack.deallocate_handle(&inner)?;
/// stack.deallocate_handle(&outer)?;
/// assert_eq!(stack.top_offset(), 0);
/// # Ok::<(), ember_memory::AllocError>(())
/// ```
#[derive(Debug)]
pub struct StackAllocator {
    /// The backing storage.
    region: Region,
    /// Live blocks in push order.
    directory: Vec<BlockRecord>,
    /// End offset of the top block.
    top: usize,
    /// Id given to the next pushed block.
    next_id: u64,
}

impl StackAllocator {
    /// Creates a new stack allocator reserving `capacity` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidConfiguration`] if `capacity` is zero and
    /// [`AllocError::OutOfMemory`] if the region cannot be reserved.
    pub fn new(capacity: usize) -> AllocResult<Self> {
        let region = Region::new(capacity)?;
        tracing::debug!(capacity, "stack allocator created");
        Ok(Self {
            region,
            directory: Vec::new(),
            top: 0,
            next_id: 1,
        })
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Returns the end offset of the top block (0 when empty).
    #[inline]
    #[must_use]
    pub const fn top_offset(&self) -> usize {
        self.top
    }

    /// Returns the remaining free space in bytes.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.region.capacity() - self.top
    }

    /// Returns the number of live blocks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.directory.len()
    }

    /// Returns `true` if no block is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Pushes a block of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::OutOfMemory`] if the block does not fit in the
    /// remaining space or the directory cannot grow.
    pub fn allocate(&mut self, size: usize) -> AllocResult<BlockHandle> {
        let end = self
            .top
            .checked_add(size)
            .filter(|&end| end <= self.capacity())
            .ok_or_else(|| {
                tracing::warn!(
                    requested = size,
                    available = self.remaining(),
                    "stack allocator exhausted"
                );
                AllocError::OutOfMemory {
                    requested: size,
                    available: self.remaining(),
                }
            })?;

        self.directory
            .try_reserve(1)
            .map_err(|_| AllocError::OutOfMemory {
                requested: std::mem::size_of::<BlockRecord>(),
                available: 0,
            })?;

        let record = BlockRecord {
            id: BlockId(self.next_id),
            size,
            offset: self.top,
        };
        self.next_id += 1;
        self.directory.push(record);
        self.top = end;

        Ok(self.handle(record))
    }

    /// Pops the block `id`, which must be the most recently pushed live block.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidFree`] if `id` is not the top block.
    pub fn deallocate(&mut self, id: BlockId) -> AllocResult<()> {
        let Some(record) = self.directory.last().copied().filter(|record| record.id == id) else {
            return Err(self.reject(id));
        };

        self.directory.pop();
        self.top = record.offset;
        Ok(())
    }

    /// Pops the block described by `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidFree`] if the handle is not the top block
    /// or its size or offset disagree with the directory.
    pub fn deallocate_handle(&mut self, handle: &BlockHandle) -> AllocResult<()> {
        let matches = self
            .directory
            .last()
            .is_some_and(|record| record.size == handle.size && record.offset == handle.offset);
        if !matches {
            return Err(self.reject(handle.id));
        }
        self.deallocate(handle.id)
    }

    /// Returns the handle of the top block.
    #[must_use]
    pub fn peek(&mut self) -> Option<BlockHandle> {
        let record = *self.directory.last()?;
        Some(self.handle(record))
    }

    /// Returns `(id, size, offset)` of every live block in push order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, usize, usize)> + '_ {
        self.directory
            .iter()
            .map(|record| (record.id, record.size, record.offset))
    }

    /// Returns the bytes of a live block.
    pub fn bytes_mut(&mut self, handle: &BlockHandle) -> Option<&mut [u8]> {
        let index = self
            .directory
            .binary_search_by_key(&handle.id, |record| record.id)
            .ok()?;
        let record = self.directory[index];
        if record.size != handle.size || record.offset != handle.offset {
            return None;
        }
        self.region.bytes_mut(record.offset..record.offset + record.size)
    }

    /// Drops every block at once. Ids keep increasing afterwards.
    pub fn reset(&mut self) {
        tracing::trace!(released = self.directory.len(), "stack allocator reset");
        self.directory.clear();
        self.top = 0;
    }

    fn handle(&mut self, record: BlockRecord) -> BlockHandle {
        BlockHandle {
            id: record.id,
            size: record.size,
            offset: record.offset,
            address: self.region.address_at(record.offset),
        }
    }

    fn reject(&self, id: BlockId) -> AllocError {
        let top = self.directory.last().map(|record| record.id);
        tracing::warn!(?id, ?top, "stack deallocation out of LIFO order");
        AllocError::InvalidFree { id, top }
    }
}
