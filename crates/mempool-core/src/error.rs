//! Errors surfaced when reading or writing allocation payloads.
//!
//! Allocation itself never fails with an error: exhaustion is `None` and
//! misuse of `free` is a silent no-op. Payload access is the one place a
//! caller can ask for bytes that are not there, so it reports why.

use std::error::Error;
use std::fmt;

use crate::id::Handle;

/// Errors from payload access through a [`Handle`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessError {
    /// The pool has been deinitialized; no allocations exist.
    Uninitialized,
    /// The handle was not issued by this pool or its allocation was freed.
    StaleHandle {
        /// The rejected handle.
        handle: Handle,
    },
    /// The byte range falls outside the allocation's usable size.
    OutOfBounds {
        /// Requested start offset within the payload.
        offset: usize,
        /// Requested length in bytes.
        len: usize,
        /// Usable size of the allocation in bytes.
        size: usize,
    },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "pool is not initialized"),
            Self::StaleHandle { handle } => {
                write!(f, "stale or foreign handle: {handle}")
            }
            Self::OutOfBounds { offset, len, size } => {
                write!(
                    f,
                    "payload access out of bounds: {len} bytes at offset {offset}, allocation holds {size} bytes"
                )
            }
        }
    }
}

impl Error for AccessError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::PoolId;

    #[test]
    fn display_out_of_bounds() {
        let e = AccessError::OutOfBounds {
            offset: 4,
            len: 8,
            size: 10,
        };
        assert_eq!(
            e.to_string(),
            "payload access out of bounds: 8 bytes at offset 4, allocation holds 10 bytes"
        );
    }

    #[test]
    fn display_stale_handle_includes_handle() {
        let h = Handle::new(PoolId::next(), 1, 2);
        let msg = AccessError::StaleHandle { handle: h }.to_string();
        assert!(msg.contains("slot=1"));
        assert!(msg.contains("gen=2"));
    }
}
