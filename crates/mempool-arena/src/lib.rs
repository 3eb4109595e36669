//! Fixed-capacity, thread-safe memory pool.
//!
//! A [`MemoryPool`] reserves one byte arena at init and serves variable-sized
//! allocations out of it until deinit. It never grows and never touches the
//! platform allocator after init.
//!
//! # Architecture
//!
//! ```text
//! MemoryPool
//! └── Mutex<Option<PoolState>>   (None after deinit)
//!     ├── Arena                  one Vec<u8>, capacity bytes
//!     ├── Registry               out-of-line header pool
//!     │   └── block chain        ascending address, all blocks
//!     ├── HandleTable            slot + generation → block
//!     └── PoolMetrics            operation counters
//! ```
//!
//! Each block is charged `header_overhead` bytes of arena ahead of its
//! payload, so the chain partitions the arena exactly. Allocation picks a
//! free block by [`FitPolicy`] and splits off any remainder that can hold a
//! header plus a non-empty payload. Deallocation merges with the next block
//! and then the previous one, so no two address-adjacent free blocks ever
//! exist outside the lock.
//!
//! # Handles
//!
//! Allocations are addressed by [`Handle`](mempool_core::Handle), never by
//! pointer. A handle carries the issuing pool's id and a generation, so
//! freeing a handle twice, freeing a handle from another pool, or reading
//! through a freed handle are all detected and rejected without touching the
//! registry.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod arena;
mod block;
pub mod config;
pub mod error;
mod handle;
pub mod metrics;
pub mod pool;
mod registry;

pub use block::BlockInfo;
pub use config::{FitPolicy, PoolConfig};
pub use error::{ConfigError, InvariantViolation};
pub use metrics::{PoolMetrics, PoolUsage};
pub use pool::MemoryPool;
