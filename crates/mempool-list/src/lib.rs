//! Singly-linked `u16` list whose nodes live in a mempool arena.
//!
//! A thin client of [`BlockAllocator`](mempool_core::BlockAllocator): each
//! node is one fixed-size allocation holding its value and the handle of
//! the next node. Node lifetime is delegated entirely to the allocator; the
//! list never sees block headers and assumes no particular fit policy.
//!
//! ```
//! use mempool_arena::MemoryPool;
//! use mempool_list::{node_pool_config, LinkedList};
//!
//! let pool = MemoryPool::init(node_pool_config(8)).unwrap();
//! let mut list = LinkedList::new(&pool);
//! let one = list.push_back(1).unwrap();
//! list.push_back(3);
//! list.insert_after(one, 2);
//! assert_eq!(list.to_string(), "[1, 2, 3]");
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod list;
mod node;

use mempool_arena::PoolConfig;

pub use list::{DisplayRange, Iter, LinkedList, NodeRef};
pub use node::NODE_SIZE;

/// A default pool configuration with room for exactly `max_nodes` nodes.
///
/// Every node costs `NODE_SIZE` payload bytes plus the default header
/// overhead, and same-sized blocks never fragment below one node, so
/// `max_nodes` inserts always succeed and the next one is skipped.
pub fn node_pool_config(max_nodes: usize) -> PoolConfig {
    let span = NODE_SIZE + PoolConfig::DEFAULT_HEADER_OVERHEAD;
    PoolConfig::new(max_nodes.max(1).saturating_mul(span))
}
