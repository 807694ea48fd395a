//! # Linear Allocator
//!
//! A bump allocator for scratch memory that is released all at once.

use std::ptr::NonNull;

use super::region::Region;
use crate::error::{AllocError, AllocResult};

/// A bump-pointer allocator over a single [`Region`].
///
/// Allocations are fast (just bump an offset). There is no per-allocation
/// free: memory is reclaimed in bulk by [`LinearAllocator::reset`] or when
/// the allocator is dropped.
///
/// Addresses carry no alignment guarantee beyond the region start
/// ([`Region::ALIGN`]). Callers needing stricter alignment over-request and
/// align the returned address themselves.
///
/// # Thread Safety
///
/// This allocator is NOT synchronized. Use one per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust
/// use ember_memory::LinearAllocator;
///
/// let mut frame = LinearAllocator::new(1024)?;
/// let a = frame.allocate(100)?;
/// let b = frame.allocate(100)?;
/// assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 100);
///
/// // End of frame: everything goes at once.
/// frame.reset();
/// assert!(frame.is_empty());
/// # Ok::<(), ember_memory::AllocError>(())
/// ```
#[derive(Debug)]
pub struct LinearAllocator {
    /// The backing storage.
    region: Region,
    /// Current bump offset.
    used: usize,
}

impl LinearAllocator {
    /// Creates a new linear allocator reserving exactly `capacity` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidConfiguration`] if `capacity` is zero and
    /// [`AllocError::OutOfMemory`] if the region cannot be reserved.
    pub fn new(capacity: usize) -> AllocResult<Self> {
        let region = Region::new(capacity)?;
        tracing::debug!(capacity, "linear allocator created");
        Ok(Self { region, used: 0 })
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Returns the number of bytes handed out since the last reset.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.used
    }

    /// Returns the remaining free space in bytes.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.region.capacity() - self.used
    }

    /// Returns `true` if nothing has been allocated since the last reset.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Allocates `size` bytes at the current bump offset.
    ///
    /// A zero-byte request succeeds and returns the current offset without
    /// advancing it.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::OutOfMemory`] if the request does not fit. The
    /// allocator is left untouched in that case.
    pub fn allocate(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
        let end = self
            .used
            .checked_add(size)
            .filter(|&end| end <= self.capacity())
            .ok_or_else(|| {
                tracing::warn!(
                    requested = size,
                    available = self.remaining(),
                    "linear allocator exhausted"
                );
                AllocError::OutOfMemory {
                    requested: size,
                    available: self.remaining(),
                }
            })?;

        let address = self.region.address_at(self.used);
        self.used = end;
        Ok(address)
    }

    /// Resets the allocator, invalidating all previous allocations.
    ///
    /// This is a **zero-cost** operation - memory is neither zeroed nor freed.
    /// Previously returned addresses must not be used afterwards.
    #[inline]
    pub fn reset(&mut self) {
        tracing::trace!(released = self.used, "linear allocator reset");
        self.used = 0;
    }

    /// Returns the `len` bytes starting at `address`, if they were handed out
    /// since the last reset.
    pub fn bytes_mut(&mut self, address: NonNull<u8>, len: usize) -> Option<&mut [u8]> {
        let start = self.region.offset_of(address)?;
        let end = start.checked_add(len).filter(|&end| end <= self.used)?;
        self.region.bytes_mut(start..end)
    }
}
