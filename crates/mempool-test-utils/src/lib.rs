//! Test utilities for mempool development.
//!
//! Provides a seeded random workload generator ([`random_ops`]) and a
//! [`ShadowHeap`] that replays a workload against any
//! [`BlockAllocator`], tracking the bytes each live allocation should hold.
//! Overlapping allocations, lost data on resize, or handles that outlive
//! their allocation all show up as a [`Divergence`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod shadow;
pub mod workload;

pub use shadow::{Divergence, ShadowHeap};
pub use workload::{random_ops, Op};
