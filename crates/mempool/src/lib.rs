//! mempool: a fixed-capacity, thread-safe memory pool allocator.
//!
//! This is the facade crate that re-exports the public API of the mempool
//! sub-crates. For most users, adding `mempool` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use mempool::prelude::*;
//!
//! let pool = MemoryPool::init(PoolConfig::new(4096)).unwrap();
//!
//! let h = pool.alloc(32).unwrap();
//! pool.write(h, 0, b"hello").unwrap();
//! let h = pool.resize(h, 128).unwrap();
//!
//! let mut buf = [0u8; 5];
//! pool.read(h, 0, &mut buf).unwrap();
//! assert_eq!(&buf, b"hello");
//! pool.free(h);
//!
//! let mut list = LinkedList::new(&pool);
//! list.push_back(1);
//! list.push_back(2);
//! assert_eq!(list.to_string(), "[1, 2]");
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `mempool-core` | `Handle`, `PoolId`, `AccessError`, `BlockAllocator` |
//! | [`pool`] | `mempool-arena` | `MemoryPool`, configuration, metrics, invariant checks |
//! | [`list`] | `mempool-list` | Pool-backed singly-linked `u16` list |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Handles, pool identities and the allocator trait (`mempool-core`).
pub use mempool_core as types;

/// The memory pool, its configuration and introspection (`mempool-arena`).
pub use mempool_arena as pool;

/// The pool-backed linked list (`mempool-list`).
pub use mempool_list as list;

/// Common imports for typical mempool usage.
///
/// ```rust
/// use mempool::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use mempool_core::{AccessError, BlockAllocator, Handle, PoolId};

    // Pool
    pub use mempool_arena::{
        BlockInfo, ConfigError, FitPolicy, InvariantViolation, MemoryPool, PoolConfig,
        PoolMetrics, PoolUsage,
    };

    // List
    pub use mempool_list::{node_pool_config, LinkedList, NodeRef};
}
