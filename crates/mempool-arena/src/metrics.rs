//! Counters and occupancy gauges for a memory pool.
//!
//! [`PoolMetrics`] accumulates per-operation counts over the pool's
//! lifetime; [`PoolUsage`] is a point-in-time view of how the arena is
//! partitioned. Both are plain values copied out under the pool lock.

/// Cumulative operation counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Calls to `alloc`, including those made by `resize`.
    pub alloc_calls: u64,
    /// `alloc` calls that found no block large enough.
    pub alloc_failures: u64,
    /// `alloc` calls with a size of zero.
    pub zero_size_requests: u64,
    /// Calls to `free`, including those made by `resize`.
    pub free_calls: u64,
    /// `free` calls ignored because the handle was `None`, foreign or stale.
    pub ignored_frees: u64,
    /// Blocks split during allocation.
    pub splits: u64,
    /// Neighbour merges performed during deallocation.
    pub merges: u64,
    /// Calls to `resize`.
    pub resize_calls: u64,
    /// Resizes satisfied by the existing block.
    pub resize_in_place: u64,
    /// Resizes that moved the data to a new block.
    pub resize_moved: u64,
    /// Resizes that could not allocate and left the old block untouched.
    pub resize_failures: u64,
}

/// Point-in-time partition of the arena.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolUsage {
    /// Arena capacity in bytes.
    pub capacity: usize,
    /// Blocks on the chain.
    pub block_count: usize,
    /// Free blocks on the chain.
    pub free_block_count: usize,
    /// Allocated blocks on the chain.
    pub allocated_block_count: usize,
    /// Payload bytes in allocated blocks.
    pub used_bytes: usize,
    /// Payload bytes in free blocks.
    pub free_bytes: usize,
    /// Arena bytes charged to block headers.
    pub header_bytes: usize,
    /// Payload size of the largest free block; the biggest request that can
    /// currently succeed.
    pub largest_free_block: usize,
}

impl PoolUsage {
    /// External fragmentation: `1 - largest_free_block / free_bytes`.
    ///
    /// 0.0 when all free space is one block (or there is none), approaching
    /// 1.0 as free space splinters into many small blocks.
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free_block as f64 / self.free_bytes as f64
    }
}
