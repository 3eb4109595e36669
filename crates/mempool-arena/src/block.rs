//! Block headers and their public views.

use std::fmt;

/// Index of a header in the out-of-line header pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct BlockId(pub(crate) u32);

impl BlockId {
    /// The header at offset zero. It heads the chain for the pool's lifetime:
    /// merges always keep the lower-address header.
    pub(crate) const HEAD: BlockId = BlockId(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bookkeeping record for one contiguous run of the arena.
///
/// Every block, free or allocated, sits on a single doubly-linked chain in
/// ascending address order. The free-list is the subsequence of that chain
/// with `free == true`.
#[derive(Clone, Debug)]
pub(crate) struct BlockHeader {
    /// Arena offset where the block's span (header charge + payload) starts.
    pub(crate) offset: usize,
    /// Usable payload bytes, header charge excluded.
    pub(crate) size: usize,
    pub(crate) free: bool,
    pub(crate) prev: Option<BlockId>,
    pub(crate) next: Option<BlockId>,
}

/// Read-only snapshot of one block, in chain order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Arena offset of the block's span.
    pub offset: usize,
    /// Arena offset of the first payload byte.
    pub payload_offset: usize,
    /// Usable payload bytes.
    pub size: usize,
    /// Whether the block is on the free-list.
    pub free: bool,
}

impl BlockInfo {
    /// One past the last payload byte.
    pub fn end(&self) -> usize {
        self.payload_offset + self.size
    }
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.free { "free" } else { "used" };
        write!(
            f,
            "[{}..{}) {} bytes {state}",
            self.payload_offset,
            self.end(),
            self.size
        )
    }
}
