//! The fixed-capacity byte arena.
//!
//! An [`Arena`] is one contiguous byte buffer reserved at pool init. It is
//! never grown, shrunk, or relocated; the block registry addresses it by
//! offset. The arena itself knows nothing about blocks.

use std::alloc::{handle_alloc_error, Layout};

/// Reserve exactly `additional` elements or abort the process.
///
/// Arena and header-pool reservation is the one unrecoverable failure in the
/// pool: nothing can be returned into because no pool state exists yet.
pub(crate) fn reserve_exact_or_abort<T>(vec: &mut Vec<T>, additional: usize) {
    if vec.try_reserve_exact(additional).is_err() {
        let layout = Layout::array::<T>(additional).unwrap_or_else(|_| Layout::new::<T>());
        handle_alloc_error(layout);
    }
}

/// Passive byte storage for all block payloads.
pub struct Arena {
    /// Backing storage. Reserved to full capacity at creation.
    bytes: Vec<u8>,
}

impl Arena {
    /// Reserve a zero-initialised arena of `capacity` bytes.
    ///
    /// Aborts through [`handle_alloc_error`] if the reservation fails.
    pub fn new(capacity: usize) -> Self {
        let mut bytes = Vec::new();
        reserve_exact_or_abort(&mut bytes, capacity);
        bytes.resize(capacity, 0);
        Self { bytes }
    }

    /// Shared view of `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the arena. Callers pass ranges taken from
    /// the block registry, which never exceed it.
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.bytes[offset..offset + len]
    }

    /// Mutable view of `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the arena.
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.bytes[offset..offset + len]
    }

    /// Copy `len` bytes from `src` to `dst`. The ranges may overlap.
    pub fn copy_within(&mut self, src: usize, dst: usize, len: usize) {
        self.bytes.copy_within(src..src + len, dst);
    }

    /// Zero `len` bytes starting at `offset`.
    pub fn zero(&mut self, offset: usize, len: usize) {
        self.slice_mut(offset, len).fill(0);
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_arena_is_zeroed_and_sized() {
        let arena = Arena::new(128);
        assert_eq!(arena.capacity(), 128);
        assert!(arena.slice(0, 128).iter().all(|&b| b == 0));
    }

    #[test]
    fn slice_reads_written_data() {
        let mut arena = Arena::new(64);
        arena.slice_mut(10, 3).copy_from_slice(&[1, 2, 3]);
        assert_eq!(arena.slice(10, 3), &[1, 2, 3]);
        assert_eq!(arena.slice(9, 1), &[0]);
    }

    #[test]
    fn copy_within_moves_bytes() {
        let mut arena = Arena::new(64);
        arena.slice_mut(0, 4).copy_from_slice(&[9, 8, 7, 6]);
        arena.copy_within(0, 32, 4);
        assert_eq!(arena.slice(32, 4), &[9, 8, 7, 6]);
    }

    #[test]
    fn zero_clears_range_only() {
        let mut arena = Arena::new(16);
        arena.slice_mut(0, 16).fill(0xaa);
        arena.zero(4, 8);
        assert_eq!(arena.slice(0, 4), &[0xaa; 4]);
        assert_eq!(arena.slice(4, 8), &[0; 8]);
        assert_eq!(arena.slice(12, 4), &[0xaa; 4]);
    }

    #[test]
    #[should_panic]
    fn slice_past_end_panics() {
        let arena = Arena::new(16);
        let _ = arena.slice(8, 9);
    }
}
