//! Pool identities and allocation handles.
//!
//! A [`Handle`] stands in for the raw payload pointer a C allocator would
//! return. It names a slot in the issuing pool's handle table together with
//! the slot's generation, so a freed or foreign handle is detected by a
//! table lookup instead of corrupting memory.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Counter for unique [`PoolId`] allocation.
static POOL_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Unique per-instance identifier for a memory pool.
///
/// Allocated from a monotonic atomic counter via [`PoolId::next`]. Two pools
/// alive in the same process never share an ID, which lets a pool reject
/// handles minted by another pool even when slot and generation collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(u32);

impl PoolId {
    /// Allocate a fresh, unique pool ID. Thread-safe.
    pub fn next() -> Self {
        Self(POOL_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to one live allocation.
///
/// Handles are minted by an allocator on `alloc`/`resize` and are the only
/// way to reach the allocation's bytes. They are plain `Copy` values: holding
/// a handle does not keep the allocation alive, and using a handle after the
/// allocation was freed is a checked, recoverable condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Handle {
    pool: PoolId,
    slot: u32,
    generation: u32,
}

impl Handle {
    /// Size of the fixed little-endian encoding produced by [`to_bytes`](Self::to_bytes).
    pub const ENCODED_LEN: usize = 12;

    /// Create a handle. Allocators call this when issuing an allocation.
    pub fn new(pool: PoolId, slot: u32, generation: u32) -> Self {
        Self {
            pool,
            slot,
            generation,
        }
    }

    /// The pool that issued this handle.
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// Index of the handle-table slot.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation of the slot when the handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Encode as 12 little-endian bytes: pool, slot, generation.
    ///
    /// Used by clients that store handles inside pool memory (for example
    /// the `next` link of a list node).
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..4].copy_from_slice(&self.pool.0.to_le_bytes());
        out[4..8].copy_from_slice(&self.slot.to_le_bytes());
        out[8..12].copy_from_slice(&self.generation.to_le_bytes());
        out
    }

    /// Decode a handle previously produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: [u8; Self::ENCODED_LEN]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            pool: PoolId(word(0)),
            slot: word(4),
            generation: word(8),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handle(pool={}, slot={}, gen={})",
            self.pool, self.slot, self.generation
        )
    }
}
