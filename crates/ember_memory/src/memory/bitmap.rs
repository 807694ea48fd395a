//! # Occupancy Bitmap
//!
//! Packed one-bit-per-block index used by the pool allocator.

use std::fmt;

use crate::error::{AllocError, AllocResult};

/// A packed bitmap, one bit per block, set = allocated.
///
/// Block `i` lives in word `i / 64` at bit `i % 64` (least significant bit
/// first). Padding bits past `block_count` in the last word are never set.
#[derive(Debug)]
pub struct Bitmap {
    /// Packed occupancy words.
    words: Box<[u64]>,
    /// Number of meaningful bits.
    block_count: usize,
}

impl Bitmap {
    /// Bits per word.
    pub const WORD_BITS: usize = u64::BITS as usize;

    /// Creates a bitmap of `block_count` clear bits.
    pub(crate) fn new(block_count: usize) -> AllocResult<Self> {
        let word_count = block_count.div_ceil(Self::WORD_BITS);
        let mut words: Vec<u64> = Vec::new();
        words
            .try_reserve_exact(word_count)
            .map_err(|_| AllocError::OutOfMemory {
                requested: word_count * std::mem::size_of::<u64>(),
                available: 0,
            })?;
        words.resize(word_count, 0);

        Ok(Self {
            words: words.into_boxed_slice(),
            block_count,
        })
    }

    /// Returns the number of tracked blocks.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> usize {
        self.block_count
    }

    /// Returns the raw occupancy words.
    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Returns `true` if block `index` is allocated.
    ///
    /// Out-of-range indices are reported as not allocated.
    #[inline]
    #[must_use]
    pub fn is_set(&self, index: usize) -> bool {
        if index >= self.block_count {
            return false;
        }
        self.words[index / Self::WORD_BITS] & Self::mask(index) != 0
    }

    /// Returns `true` if no block is allocated.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Returns the number of allocated blocks.
    #[must_use]
    pub fn count_set(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Marks `count` blocks starting at `start` as allocated, stopping at
    /// `block_count`.
    pub(crate) fn set_run(&mut self, start: usize, count: usize) {
        for index in start..start.saturating_add(count).min(self.block_count) {
            self.words[index / Self::WORD_BITS] |= Self::mask(index);
        }
    }

    /// Marks `count` blocks starting at `start` as free, stopping at
    /// `block_count`.
    pub(crate) fn clear_run(&mut self, start: usize, count: usize) {
        for index in start..start.saturating_add(count).min(self.block_count) {
            self.words[index / Self::WORD_BITS] &= !Self::mask(index);
        }
    }

    /// Clears every bit.
    pub(crate) fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Finds the lowest index starting `run` contiguous clear bits.
    ///
    /// Fully occupied words are skipped whole.
    #[must_use]
    pub fn find_clear_run(&self, run: usize) -> Option<usize> {
        if run == 0 || run > self.block_count {
            return None;
        }

        let mut start = 0;
        while start + run <= self.block_count {
            if start % Self::WORD_BITS == 0 && self.words[start / Self::WORD_BITS] == u64::MAX {
                start += Self::WORD_BITS;
                continue;
            }
            if self.is_set(start) {
                start += 1;
                continue;
            }

            // `start` is clear: look for the first set bit inside the window.
            match (start + 1..start + run).find(|&index| self.is_set(index)) {
                None => return Some(start),
                Some(blocked) => start = blocked + 1,
            }
        }

        None
    }

    #[inline]
    const fn mask(index: usize) -> u64 {
        1 << (index % Self::WORD_BITS)
    }
}

impl fmt::Display for Bitmap {
    /// Renders one line per word, block 0 being the rightmost bit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} words, {} blocks", self.words.len(), self.block_count)?;
        for word in self.words.iter() {
            writeln!(f, "{word:064b}")?;
        }
        Ok(())
    }
}
