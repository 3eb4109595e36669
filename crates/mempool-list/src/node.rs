//! Fixed-size node record stored in each allocation.
//!
//! ```text
//! byte  0..2   value, little-endian u16
//! byte  2      1 if a next link follows, else 0
//! byte  3      padding
//! byte  4..16  next handle (Handle::to_bytes), zero when absent
//! ```

use mempool_core::Handle;

/// Bytes requested from the allocator per node.
pub const NODE_SIZE: usize = 16;

const LINK_OFFSET: usize = 4;

const _: () = assert!(LINK_OFFSET + Handle::ENCODED_LEN == NODE_SIZE);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) value: u16,
    pub(crate) next: Option<Handle>,
}

impl Node {
    pub(crate) fn encode(&self) -> [u8; NODE_SIZE] {
        let mut buf = [0u8; NODE_SIZE];
        buf[..2].copy_from_slice(&self.value.to_le_bytes());
        if let Some(next) = self.next {
            buf[2] = 1;
            buf[LINK_OFFSET..].copy_from_slice(&next.to_bytes());
        }
        buf
    }

    pub(crate) fn decode(buf: &[u8; NODE_SIZE]) -> Self {
        let value = u16::from_le_bytes([buf[0], buf[1]]);
        let next = (buf[2] != 0).then(|| {
            let mut link = [0u8; Handle::ENCODED_LEN];
            link.copy_from_slice(&buf[LINK_OFFSET..]);
            Handle::from_bytes(link)
        });
        Self { value, next }
    }
}
