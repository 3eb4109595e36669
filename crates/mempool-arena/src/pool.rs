//! The thread-safe memory pool.
//!
//! [`MemoryPool`] owns an [`Arena`], the block [`Registry`] and the handle
//! table behind one `Mutex`. Every public operation takes the lock once and
//! runs to completion on the locked state, so no thread ever observes a
//! half-split or half-merged block. `resize` composes the same internal
//! primitives as `alloc` and `free` on the already-locked state rather than
//! re-entering the public API.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, TryLockError};

use mempool_core::{AccessError, BlockAllocator, Handle, PoolId};

use crate::arena::Arena;
use crate::block::{BlockId, BlockInfo};
use crate::config::PoolConfig;
use crate::error::{ConfigError, InvariantViolation};
use crate::handle::HandleTable;
use crate::metrics::{PoolMetrics, PoolUsage};
use crate::registry::Registry;

/// Everything that exists only between `init` and `deinit`.
struct PoolState {
    arena: Arena,
    registry: Registry,
    handles: HandleTable,
    metrics: PoolMetrics,
}

impl PoolState {
    fn new(id: PoolId, config: &PoolConfig) -> Self {
        Self {
            arena: Arena::new(config.capacity),
            registry: Registry::new(config),
            handles: HandleTable::new(id, config.max_blocks()),
            metrics: PoolMetrics::default(),
        }
    }

    fn alloc(&mut self, config: &PoolConfig, size: usize) -> Option<Handle> {
        self.alloc_block(config, size).map(|(h, _)| h)
    }

    fn alloc_block(&mut self, config: &PoolConfig, size: usize) -> Option<(Handle, BlockId)> {
        self.metrics.alloc_calls += 1;
        if size == 0 {
            self.metrics.zero_size_requests += 1;
            return None;
        }
        let Some(placement) = config
            .align_up(size)
            .and_then(|aligned| self.registry.allocate(aligned))
        else {
            self.metrics.alloc_failures += 1;
            return None;
        };
        if placement.split {
            self.metrics.splits += 1;
        }
        if config.zero_on_alloc {
            let (offset, len) = self.registry.payload(placement.id);
            self.arena.zero(offset, len);
        }
        Some((self.handles.insert(placement.id), placement.id))
    }

    fn free(&mut self, handle: Option<Handle>) {
        self.metrics.free_calls += 1;
        let Some(id) = handle.and_then(|h| self.handles.remove(h)) else {
            self.metrics.ignored_frees += 1;
            return;
        };
        if let Some(coalesce) = self.registry.release(id) {
            debug_assert!(self.registry.header(coalesce.survivor).free);
            self.metrics.merges += u64::from(coalesce.merges);
        }
    }

    fn resize(&mut self, config: &PoolConfig, handle: Option<Handle>, new_size: usize) -> Option<Handle> {
        self.metrics.resize_calls += 1;
        let Some(handle) = handle else {
            return self.alloc(config, new_size);
        };
        if new_size == 0 {
            self.free(Some(handle));
            return None;
        }
        let old_id = self.handles.get(handle)?;
        let (old_offset, old_len) = self.registry.payload(old_id);
        if old_len >= new_size {
            self.metrics.resize_in_place += 1;
            return Some(handle);
        }

        // Allocate before freeing: on failure the old block is untouched.
        let Some((new_handle, new_id)) = self.alloc_block(config, new_size) else {
            self.metrics.resize_failures += 1;
            return None;
        };
        let (new_offset, _) = self.registry.payload(new_id);
        self.arena.copy_within(old_offset, new_offset, old_len);
        self.free(Some(handle));
        self.metrics.resize_moved += 1;
        Some(new_handle)
    }

    /// Absolute arena offset of `len` bytes at `offset` within a payload.
    fn payload_range(&self, handle: Handle, offset: usize, len: usize) -> Result<usize, AccessError> {
        let id = self
            .handles
            .get(handle)
            .ok_or(AccessError::StaleHandle { handle })?;
        let (start, size) = self.registry.payload(id);
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(start + offset),
            _ => Err(AccessError::OutOfBounds { offset, len, size }),
        }
    }

    fn check(&self) -> Result<(), InvariantViolation> {
        self.registry.check()?;
        let usage = self.registry.usage();
        if self.arena.capacity() != usage.capacity {
            return Err(InvariantViolation::SpanMismatch {
                covered: self.arena.capacity(),
                capacity: usage.capacity,
            });
        }
        if usage.allocated_block_count != self.handles.live_count() {
            return Err(InvariantViolation::HandleMismatch {
                live_handles: self.handles.live_count(),
                allocated_blocks: usage.allocated_block_count,
            });
        }
        let mut seen = HashSet::with_capacity(self.handles.live_count());
        for id in self.handles.live_blocks() {
            let h = self.registry.header(id);
            if h.free {
                return Err(InvariantViolation::HandleToFreeBlock { offset: h.offset });
            }
            if !seen.insert(id) {
                return Err(InvariantViolation::DuplicateHandle { offset: h.offset });
            }
        }
        Ok(())
    }
}

/// A fixed-capacity, thread-safe memory pool.
///
/// The pool carves a single arena reserved at [`init`](Self::init) into
/// variable-sized blocks. Allocation selects a block by the configured
/// [`FitPolicy`](crate::FitPolicy), splitting off any usable remainder;
/// deallocation coalesces with free neighbours. Allocations are addressed
/// through [`Handle`]s, never raw pointers.
///
/// All operations take `&self`; share the pool across threads by reference
/// or through an `Arc`.
///
/// # Example
///
/// ```
/// use mempool_arena::MemoryPool;
///
/// let pool = MemoryPool::with_capacity(1024).unwrap();
/// let h = pool.alloc(8).unwrap();
/// pool.write(h, 0, b"mempool!").unwrap();
///
/// let h = pool.resize(h, 64).unwrap();
/// let mut buf = [0u8; 8];
/// pool.read(h, 0, &mut buf).unwrap();
/// assert_eq!(&buf, b"mempool!");
///
/// pool.free(h);
/// pool.check_invariants().unwrap();
/// ```
pub struct MemoryPool {
    id: PoolId,
    config: PoolConfig,
    state: Mutex<Option<PoolState>>,
}

impl MemoryPool {
    /// Validate `config` and reserve the arena, header pool and handle table.
    ///
    /// The pool starts as one free block spanning the whole arena.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid; nothing is
    /// reserved in that case.
    ///
    /// # Aborts
    ///
    /// If the platform allocator cannot provide the reservation the process
    /// aborts via [`std::alloc::handle_alloc_error`]. There is no pool state
    /// to return into.
    pub fn init(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let id = PoolId::next();
        let state = PoolState::new(id, &config);
        tracing::debug!(
            pool = %id,
            capacity = config.capacity,
            header_overhead = config.header_overhead,
            alignment = config.alignment,
            fit = ?config.fit,
            max_blocks = config.max_blocks(),
            "memory pool initialized"
        );
        Ok(Self {
            id,
            config,
            state: Mutex::new(Some(state)),
        })
    }

    /// Shorthand for `init(PoolConfig::new(capacity))`.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::init(PoolConfig::new(capacity))
    }

    fn lock(&self) -> MutexGuard<'_, Option<PoolState>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(pool = %self.id, "recovering pool lock poisoned by a panicking thread");
            self.state.clear_poison();
            poisoned.into_inner()
        })
    }

    /// This pool's identity, carried by every handle it issues.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// The configuration the pool was created with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Whether [`deinit`](Self::deinit) has not yet been called.
    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Allocate at least `size` bytes.
    ///
    /// Returns `None` for `size == 0`, when the pool is deinitialized, and
    /// when no free block is large enough. A failed call changes nothing.
    pub fn alloc(&self, size: usize) -> Option<Handle> {
        self.lock().as_mut()?.alloc(&self.config, size)
    }

    /// Release an allocation and coalesce it with free neighbours.
    ///
    /// `None`, handles from another pool, and handles whose allocation was
    /// already freed are ignored.
    pub fn free(&self, handle: impl Into<Option<Handle>>) {
        let handle = handle.into();
        if let Some(state) = self.lock().as_mut() {
            state.free(handle);
        }
    }

    /// Resize an allocation.
    ///
    /// - `None` handle: behaves as [`alloc`](Self::alloc).
    /// - `new_size == 0`: frees the allocation and returns `None`.
    /// - Current usable size already `>= new_size`: returns the same handle.
    /// - Otherwise allocates a new block, copies the old payload, frees the
    ///   old block and returns the new handle. If the new block cannot be
    ///   allocated, returns `None` and the old allocation stays valid.
    ///
    /// Stale or foreign handles are ignored and yield `None`.
    pub fn resize(&self, handle: impl Into<Option<Handle>>, new_size: usize) -> Option<Handle> {
        let handle = handle.into();
        self.lock().as_mut()?.resize(&self.config, handle, new_size)
    }

    /// Release the arena, header pool and handle table.
    ///
    /// Afterwards every allocation call returns `None`, `free` is a no-op,
    /// and payload access fails with [`AccessError::Uninitialized`]. Calling
    /// `deinit` twice is harmless. Dropping the pool has the same effect.
    pub fn deinit(&self) {
        let mut guard = self.lock();
        if let Some(state) = guard.take() {
            tracing::debug!(
                pool = %self.id,
                live_allocations = state.handles.live_count(),
                "memory pool deinitialized"
            );
        }
    }

    /// Copy payload bytes starting at `offset` into `buf`.
    pub fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<(), AccessError> {
        self.with_state(|state| {
            let start = state.payload_range(handle, offset, buf.len())?;
            buf.copy_from_slice(state.arena.slice(start, buf.len()));
            Ok(())
        })
    }

    /// Copy `data` into the payload starting at `offset`.
    pub fn write(&self, handle: Handle, offset: usize, data: &[u8]) -> Result<(), AccessError> {
        self.with_state_mut(|state| {
            let start = state.payload_range(handle, offset, data.len())?;
            state.arena.slice_mut(start, data.len()).copy_from_slice(data);
            Ok(())
        })
    }

    /// Run `f` on the whole usable payload of an allocation.
    ///
    /// The pool lock is held while `f` runs; calling back into this pool
    /// from `f` deadlocks. Formatting the pool with `{:?}` is the one
    /// exception: it reports `live_allocations` as `<locked>`.
    pub fn with_payload<R>(&self, handle: Handle, f: impl FnOnce(&[u8]) -> R) -> Result<R, AccessError> {
        self.with_state(|state| {
            let id = state
                .handles
                .get(handle)
                .ok_or(AccessError::StaleHandle { handle })?;
            let (start, len) = state.registry.payload(id);
            Ok(f(state.arena.slice(start, len)))
        })
    }

    /// Run `f` on the whole usable payload of an allocation, mutably.
    ///
    /// The pool lock is held while `f` runs; calling back into this pool
    /// from `f` deadlocks.
    pub fn with_payload_mut<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, AccessError> {
        self.with_state_mut(|state| {
            let id = state
                .handles
                .get(handle)
                .ok_or(AccessError::StaleHandle { handle })?;
            let (start, len) = state.registry.payload(id);
            Ok(f(state.arena.slice_mut(start, len)))
        })
    }

    fn with_state<R>(
        &self,
        f: impl FnOnce(&PoolState) -> Result<R, AccessError>,
    ) -> Result<R, AccessError> {
        let guard = self.lock();
        let state = guard.as_ref().ok_or(AccessError::Uninitialized)?;
        f(state)
    }

    fn with_state_mut<R>(
        &self,
        f: impl FnOnce(&mut PoolState) -> Result<R, AccessError>,
    ) -> Result<R, AccessError> {
        let mut guard = self.lock();
        let state = guard.as_mut().ok_or(AccessError::Uninitialized)?;
        f(state)
    }

    /// Usable payload size of a live allocation (the request rounded up to
    /// the alignment, or the whole block when it was not split).
    pub fn usable_size(&self, handle: Handle) -> Option<usize> {
        let guard = self.lock();
        let state = guard.as_ref()?;
        let id = state.handles.get(handle)?;
        Some(state.registry.header(id).size)
    }

    /// Describe the block behind a live handle.
    pub fn locate(&self, handle: Handle) -> Option<BlockInfo> {
        let guard = self.lock();
        let state = guard.as_ref()?;
        let id = state.handles.get(handle)?;
        let (payload_offset, size) = state.registry.payload(id);
        Some(BlockInfo {
            offset: state.registry.header(id).offset,
            payload_offset,
            size,
            free: false,
        })
    }

    /// Number of live allocations.
    pub fn live_allocations(&self) -> usize {
        self.lock()
            .as_ref()
            .map_or(0, |state| state.handles.live_count())
    }

    /// Cumulative operation counters. `None` after `deinit`.
    pub fn metrics(&self) -> Option<PoolMetrics> {
        self.lock().as_ref().map(|state| state.metrics.clone())
    }

    /// Current partition of the arena. `None` after `deinit`.
    pub fn usage(&self) -> Option<PoolUsage> {
        self.lock().as_ref().map(|state| state.registry.usage())
    }

    /// Every block in ascending address order. Empty after `deinit`.
    pub fn blocks(&self) -> Vec<BlockInfo> {
        self.lock()
            .as_ref()
            .map_or_else(Vec::new, |state| state.registry.blocks())
    }

    /// Verify the registry and handle table against each other.
    ///
    /// Checks that blocks partition the arena, that no two free blocks are
    /// adjacent, that links are consistent, and that live handles map
    /// one-to-one onto allocated blocks. A deinitialized pool is trivially
    /// consistent.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match self.lock().as_ref() {
            Some(state) => state.check(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("MemoryPool");
        d.field("id", &self.id).field("config", &self.config);
        // Never block: the caller may already hold the lock.
        match self.state.try_lock() {
            Ok(guard) => d.field("live_allocations", &live_count(&guard)),
            Err(TryLockError::Poisoned(poisoned)) => {
                d.field("live_allocations", &live_count(&poisoned.into_inner()))
            }
            Err(TryLockError::WouldBlock) => d.field("live_allocations", &format_args!("<locked>")),
        };
        d.finish()
    }
}

fn live_count(state: &Option<PoolState>) -> usize {
    state.as_ref().map_or(0, |s| s.handles.live_count())
}

impl BlockAllocator for MemoryPool {
    fn alloc(&self, size: usize) -> Option<Handle> {
        MemoryPool::alloc(self, size)
    }

    fn free(&self, handle: Option<Handle>) {
        MemoryPool::free(self, handle)
    }

    fn resize(&self, handle: Option<Handle>, new_size: usize) -> Option<Handle> {
        MemoryPool::resize(self, handle, new_size)
    }

    fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<(), AccessError> {
        MemoryPool::read(self, handle, offset, buf)
    }

    fn write(&self, handle: Handle, offset: usize, data: &[u8]) -> Result<(), AccessError> {
        MemoryPool::write(self, handle, offset, data)
    }

    fn usable_size(&self, handle: Handle) -> Option<usize> {
        MemoryPool::usable_size(self, handle)
    }
}
