//! Pool-specific error types.

use std::error::Error;
use std::fmt;

/// Errors detected by [`PoolConfig::validate`](crate::PoolConfig::validate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `alignment` is zero or not a power of two.
    AlignmentNotPowerOfTwo {
        /// The rejected alignment.
        alignment: usize,
    },
    /// `header_overhead` is not a multiple of `alignment`, so payload offsets
    /// would drift out of alignment.
    HeaderMisaligned {
        /// The configured header overhead.
        header_overhead: usize,
        /// The configured alignment.
        alignment: usize,
    },
    /// The arena cannot hold even one header plus a one-byte payload.
    CapacityTooSmall {
        /// The configured capacity.
        capacity: usize,
        /// Smallest valid capacity for this header overhead.
        minimum: usize,
    },
    /// The capacity exceeds what a single Rust allocation can address.
    CapacityOverflow {
        /// The configured capacity.
        capacity: usize,
    },
    /// The worst-case block count does not fit the 32-bit handle slots.
    TooManyBlocks {
        /// Worst-case number of blocks for this configuration.
        max_blocks: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlignmentNotPowerOfTwo { alignment } => {
                write!(f, "alignment {alignment} is not a power of two")
            }
            Self::HeaderMisaligned {
                header_overhead,
                alignment,
            } => {
                write!(
                    f,
                    "header overhead {header_overhead} is not a multiple of alignment {alignment}"
                )
            }
            Self::CapacityTooSmall { capacity, minimum } => {
                write!(
                    f,
                    "capacity {capacity} bytes is too small: need at least {minimum} bytes"
                )
            }
            Self::CapacityOverflow { capacity } => {
                write!(f, "capacity {capacity} bytes exceeds isize::MAX")
            }
            Self::TooManyBlocks { max_blocks } => {
                write!(
                    f,
                    "worst-case block count {max_blocks} exceeds the handle table limit"
                )
            }
        }
    }
}

impl Error for ConfigError {}

/// A broken bookkeeping invariant found by
/// [`MemoryPool::check_invariants`](crate::MemoryPool::check_invariants).
///
/// Seeing one of these means the registry is corrupt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A block does not start where the previous block ended.
    Gap {
        /// Offset where the block was expected to start.
        expected: usize,
        /// Offset the block actually starts at.
        found: usize,
    },
    /// The chain does not end exactly at the arena capacity.
    SpanMismatch {
        /// Sum of all block spans.
        covered: usize,
        /// Arena capacity.
        capacity: usize,
    },
    /// Two address-adjacent blocks are both free.
    AdjacentFree {
        /// Offset of the first free block.
        first: usize,
        /// Offset of the second free block.
        second: usize,
    },
    /// A block's back link does not name its predecessor.
    BrokenLink {
        /// Offset of the block with the bad link.
        offset: usize,
    },
    /// Header slots are neither on the chain nor recycled.
    LeakedHeaders {
        /// Headers reachable from the chain.
        linked: usize,
        /// Recycled header slots.
        vacant: usize,
        /// Total header slots in the pool.
        total: usize,
    },
    /// Live handles and allocated blocks disagree.
    HandleMismatch {
        /// Number of live handles.
        live_handles: usize,
        /// Number of allocated blocks on the chain.
        allocated_blocks: usize,
    },
    /// A live handle resolves to a block that is marked free.
    HandleToFreeBlock {
        /// Offset of the free block.
        offset: usize,
    },
    /// Two live handles resolve to the same block.
    DuplicateHandle {
        /// Offset of the doubly-issued block.
        offset: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gap { expected, found } => {
                write!(f, "block expected at offset {expected}, found at {found}")
            }
            Self::SpanMismatch { covered, capacity } => {
                write!(f, "blocks cover {covered} bytes of a {capacity}-byte arena")
            }
            Self::AdjacentFree { first, second } => {
                write!(f, "free blocks at {first} and {second} are adjacent")
            }
            Self::BrokenLink { offset } => {
                write!(f, "block at offset {offset} has a broken back link")
            }
            Self::LeakedHeaders {
                linked,
                vacant,
                total,
            } => {
                write!(
                    f,
                    "header pool leak: {linked} linked + {vacant} vacant != {total} total"
                )
            }
            Self::HandleMismatch {
                live_handles,
                allocated_blocks,
            } => {
                write!(
                    f,
                    "{live_handles} live handles for {allocated_blocks} allocated blocks"
                )
            }
            Self::HandleToFreeBlock { offset } => {
                write!(f, "live handle resolves to free block at offset {offset}")
            }
            Self::DuplicateHandle { offset } => {
                write!(f, "block at offset {offset} is reachable from two live handles")
            }
        }
    }
}

impl Error for InvariantViolation {}
