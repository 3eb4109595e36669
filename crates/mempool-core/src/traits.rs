//! The allocator abstraction consumed by pool clients.

use crate::error::AccessError;
use crate::id::Handle;

/// A fixed-capacity allocator that hands out [`Handle`]s to byte payloads.
///
/// Implemented by the arena pool. Clients such as the linked list and the
/// test shadow model are written against this trait so they never depend on
/// block headers, fit policy, or locking details.
///
/// All methods take `&self`: implementations are expected to serialize
/// mutation internally so a single allocator can be shared across threads.
pub trait BlockAllocator {
    /// Allocate at least `size` bytes.
    ///
    /// Returns `None` for `size == 0` and when no free block is large
    /// enough. A failed call has no side effects.
    fn alloc(&self, size: usize) -> Option<Handle>;

    /// Release an allocation.
    ///
    /// `None`, foreign, stale and already-freed handles are ignored.
    fn free(&self, handle: Option<Handle>);

    /// Change the size of an allocation.
    ///
    /// `None` behaves as [`alloc`](Self::alloc); `new_size == 0` frees the
    /// allocation and returns `None`. If the allocation must move and no
    /// space is available, `None` is returned and the original allocation
    /// is left intact.
    fn resize(&self, handle: Option<Handle>, new_size: usize) -> Option<Handle>;

    /// Copy `buf.len()` payload bytes starting at `offset` into `buf`.
    fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<(), AccessError>;

    /// Copy `data` into the payload starting at `offset`.
    fn write(&self, handle: Handle, offset: usize, data: &[u8]) -> Result<(), AccessError>;

    /// Usable payload size of a live allocation, or `None` if the handle is
    /// not live in this allocator.
    fn usable_size(&self, handle: Handle) -> Option<usize>;
}
