//! Core types and traits for the mempool workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the allocator and its clients: pool identities,
//! allocation handles, payload access errors, and the [`BlockAllocator`]
//! trait that clients program against.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;

pub use error::AccessError;
pub use id::{Handle, PoolId};
pub use traits::BlockAllocator;
