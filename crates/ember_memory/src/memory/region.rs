//! # Region
//!
//! One contiguous, pre-reserved byte buffer owned by exactly one allocator.

use std::fmt;
use std::ops::Range;
use std::ptr::NonNull;

use crate::error::{AllocError, AllocResult};

/// Size in bytes of one backing word.
const WORD_BYTES: usize = std::mem::size_of::<u64>();

/// A fixed-capacity byte buffer reserved once and released on drop.
///
/// The bytes live in a boxed slice of `u64` words so that the region start is
/// always 8-byte aligned. The buffer never moves, which keeps every address
/// handed out by an allocator stable even when the allocator itself is moved.
///
/// # Example
///
/// ```rust
/// use ember_memory::Region;
///
/// let mut region = Region::new(64)?;
/// let address = region.address_at(16);
/// assert_eq!(region.offset_of(address), Some(16));
/// # Ok::<(), ember_memory::AllocError>(())
/// ```
pub struct Region {
    /// Backing storage, zero-initialized.
    words: Box<[u64]>,
    /// Addressable bytes (may be less than `words.len() * 8`).
    capacity: usize,
}

impl Region {
    /// Natural alignment of the region start.
    pub const ALIGN: usize = std::mem::align_of::<u64>();

    /// Reserves a zeroed region of exactly `capacity` addressable bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidConfiguration`] if `capacity` is zero and
    /// [`AllocError::OutOfMemory`] if the reservation fails.
    pub fn new(capacity: usize) -> AllocResult<Self> {
        if capacity == 0 {
            return Err(AllocError::InvalidConfiguration(
                "region capacity must be greater than zero".to_string(),
            ));
        }

        let word_count = capacity.div_ceil(WORD_BYTES);
        let mut words: Vec<u64> = Vec::new();
        words
            .try_reserve_exact(word_count)
            .map_err(|_| AllocError::OutOfMemory {
                requested: capacity,
                available: 0,
            })?;
        words.resize(word_count, 0);

        Ok(Self {
            words: words.into_boxed_slice(),
            capacity,
        })
    }

    /// Returns the number of addressable bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the numeric address of the first byte.
    #[inline]
    #[must_use]
    pub fn base_addr(&self) -> usize {
        self.words.as_ptr() as usize
    }

    /// Returns the address of the byte at `offset`.
    ///
    /// `offset == capacity` is allowed and yields the one-past-the-end address.
    ///
    /// # Panics
    ///
    /// Panics if `offset > capacity`.
    #[must_use]
    pub fn address_at(&mut self, offset: usize) -> NonNull<u8> {
        let tail = &mut self.all_bytes_mut()[offset..];
        NonNull::from(tail).cast::<u8>()
    }

    /// Converts an address back into an offset, if it points inside the region.
    #[must_use]
    pub fn offset_of(&self, address: NonNull<u8>) -> Option<usize> {
        let offset = (address.as_ptr() as usize).checked_sub(self.base_addr())?;
        (offset < self.capacity).then_some(offset)
    }

    /// Returns the bytes in `range`, or `None` if it is out of bounds.
    #[must_use]
    pub fn bytes(&self, range: Range<usize>) -> Option<&[u8]> {
        self.all_bytes().get(range)
    }

    /// Returns the bytes in `range` mutably, or `None` if it is out of bounds.
    pub fn bytes_mut(&mut self, range: Range<usize>) -> Option<&mut [u8]> {
        self.all_bytes_mut().get_mut(range)
    }

    #[inline]
    fn all_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.capacity]
    }

    #[inline]
    fn all_bytes_mut(&mut self) -> &mut [u8] {
        let capacity = self.capacity;
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..capacity]
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("base", &format_args!("{:#x}", self.base_addr()))
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_alignment() {
        let region = Region::new(13).unwrap();
        assert_eq!(region.capacity(), 13);
        assert_eq!(region.base_addr() % Region::ALIGN, 0);
    }

    #[test]
    fn test_region_zero_capacity() {
        assert!(matches!(
            Region::new(0),
            Err(AllocError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_region_offsets() {
        let mut region = Region::new(13).unwrap();

        let first = region.address_at(0);
        assert_eq!(first.as_ptr() as usize, region.base_addr());
        assert_eq!(region.offset_of(first), Some(0));

        let last = region.address_at(12);
        assert_eq!(region.offset_of(last), Some(12));

        // One past the end is a valid address but not inside the region.
        let end = region.address_at(13);
        assert_eq!(region.offset_of(end), None);
    }

    #[test]
    fn test_region_bytes_are_zeroed_and_bounded() {
        let mut region = Region::new(10).unwrap();
        assert!(region.bytes(0..10).unwrap().iter().all(|&b| b == 0));
        assert!(region.bytes(0..11).is_none());

        region.bytes_mut(2..4).unwrap().copy_from_slice(&[7, 9]);
        assert_eq!(region.bytes(1..5).unwrap(), &[0, 7, 9, 0]);
    }

    #[test]
    fn test_region_address_survives_move() {
        let mut region = Region::new(32).unwrap();
        let address = region.address_at(8);
        let moved = region;
        assert_eq!(moved.offset_of(address), Some(8));
    }
}
