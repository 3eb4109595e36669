//! Slot+generation table mapping issued handles to block headers.
//!
//! This is the ownership check that replaces `pointer - header_size`
//! arithmetic: a handle resolves only if it names this pool, its slot
//! exists, and the slot's generation still matches. Freed handles have stale
//! generations, so double-free and use-after-free are detectable no-ops.

use mempool_core::{Handle, PoolId};

use crate::arena::reserve_exact_or_abort;
use crate::block::BlockId;

struct Slot {
    generation: u32,
    block: Option<BlockId>,
}

/// Handle table for one pool. Reuses slots via a free list; generation
/// counters increment on removal.
pub(crate) struct HandleTable {
    pool: PoolId,
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl HandleTable {
    /// Create an empty table with room for `capacity` live handles.
    pub(crate) fn new(pool: PoolId, capacity: usize) -> Self {
        let mut slots = Vec::new();
        reserve_exact_or_abort(&mut slots, capacity);
        Self {
            pool,
            slots,
            free_list: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    /// Issue a handle for `block`.
    pub(crate) fn insert(&mut self, block: BlockId) -> Handle {
        self.live += 1;
        if let Some(slot_idx) = self.free_list.pop() {
            let slot = &mut self.slots[slot_idx as usize];
            slot.block = Some(block);
            Handle::new(self.pool, slot_idx, slot.generation)
        } else {
            let slot_idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                block: Some(block),
            });
            Handle::new(self.pool, slot_idx, 0)
        }
    }

    /// Resolve a handle to its block.
    ///
    /// Returns `None` if the handle belongs to another pool, is stale, or
    /// was never valid.
    pub(crate) fn get(&self, handle: Handle) -> Option<BlockId> {
        if handle.pool() != self.pool {
            return None;
        }
        let slot = self.slots.get(handle.slot() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.block
    }

    /// Invalidate a handle, returning the block it resolved to.
    ///
    /// If the generation wraps to zero the slot is retired instead of being
    /// recycled, so a handle from the slot's first epoch cannot resolve
    /// again. Returns `None` for stale handles (double-remove is safe).
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<BlockId> {
        if handle.pool() != self.pool {
            return None;
        }
        let slot = self.slots.get_mut(handle.slot() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let block = slot.block.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation != 0 {
            self.free_list.push(handle.slot());
        }
        self.live -= 1;
        Some(block)
    }

    /// Blocks behind every live handle.
    pub(crate) fn live_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.slots.iter().filter_map(|s| s.block)
    }

    /// Number of live handles.
    pub(crate) fn live_count(&self) -> usize {
        self.live
    }
}
