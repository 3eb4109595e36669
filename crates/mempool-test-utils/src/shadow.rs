//! Shadow model of an allocator's live allocations.

use std::error::Error;
use std::fmt;

use indexmap::IndexMap;
use mempool_core::{BlockAllocator, Handle};

use crate::workload::Op;

/// A mismatch between the allocator and the shadow model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Divergence {
    pub handle: Option<Handle>,
    pub reason: String,
}

impl Divergence {
    fn new(handle: Option<Handle>, reason: impl Into<String>) -> Self {
        Self {
            handle,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle {
            Some(h) => write!(f, "{h}: {}", self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

impl Error for Divergence {}

/// Expected contents of every live allocation, keyed by handle.
///
/// Each allocation is filled with a distinct byte value when created, so any
/// overlap between two live allocations corrupts one of them and is caught
/// by [`verify`](ShadowHeap::verify).
#[derive(Debug, Default)]
pub struct ShadowHeap {
    live: IndexMap<Handle, Vec<u8>>,
    /// Handles that were freed or moved away from; must never resolve again.
    retired: Vec<Handle>,
    fill: u8,
}

impl ShadowHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocations the model believes are live.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live handles in insertion order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.live.keys().copied()
    }

    fn next_fill(&mut self) -> u8 {
        // Skip zero so a freshly zeroed payload never looks correct by accident.
        self.fill = self.fill.wrapping_add(1).max(1);
        self.fill
    }

    fn pick(&self, pick: usize) -> Option<(Handle, Vec<u8>)> {
        if self.live.is_empty() {
            return None;
        }
        let (h, bytes) = self.live.get_index(pick % self.live.len())?;
        Some((*h, bytes.clone()))
    }

    /// Apply one operation to `alloc` and to the model, checking every
    /// contract the operation promises.
    pub fn apply<A: BlockAllocator + ?Sized>(&mut self, alloc: &A, op: &Op) -> Result<(), Divergence> {
        match *op {
            Op::Alloc { size } => self.alloc(alloc, size),
            Op::Free { pick } => self.free(alloc, pick),
            Op::Resize { pick, size } => self.resize(alloc, pick, size),
        }
    }

    /// Apply a whole workload, stopping at the first divergence.
    pub fn run<A: BlockAllocator + ?Sized>(&mut self, alloc: &A, ops: &[Op]) -> Result<(), Divergence> {
        ops.iter().try_for_each(|op| self.apply(alloc, op))
    }

    fn alloc<A: BlockAllocator + ?Sized>(&mut self, alloc: &A, size: usize) -> Result<(), Divergence> {
        let Some(h) = alloc.alloc(size) else {
            return Ok(());
        };
        if size == 0 {
            return Err(Divergence::new(Some(h), "alloc(0) returned a handle"));
        }
        self.install(alloc, h, Vec::new(), size)
    }

    /// Record `h` as live with `prefix` followed by fresh fill bytes up to `size`.
    fn install<A: BlockAllocator + ?Sized>(
        &mut self,
        alloc: &A,
        h: Handle,
        mut contents: Vec<u8>,
        size: usize,
    ) -> Result<(), Divergence> {
        let usable = alloc
            .usable_size(h)
            .ok_or_else(|| Divergence::new(Some(h), "fresh handle does not resolve"))?;
        if usable < size {
            return Err(Divergence::new(
                Some(h),
                format!("usable size {usable} below requested {size}"),
            ));
        }
        if self.live.contains_key(&h) {
            return Err(Divergence::new(Some(h), "handle issued twice"));
        }
        let fill = self.next_fill();
        contents.resize(size, fill);
        alloc
            .write(h, 0, &contents)
            .map_err(|e| Divergence::new(Some(h), e.to_string()))?;
        self.live.insert(h, contents);
        Ok(())
    }

    fn free<A: BlockAllocator + ?Sized>(&mut self, alloc: &A, pick: usize) -> Result<(), Divergence> {
        let Some((h, _)) = self.pick(pick) else {
            // Nothing live: exercise the no-op paths instead.
            let stale = (!self.retired.is_empty()).then(|| self.retired[pick % self.retired.len()]);
            alloc.free(stale);
            return Ok(());
        };
        alloc.free(Some(h));
        self.retire(alloc, h)
    }

    fn resize<A: BlockAllocator + ?Sized>(
        &mut self,
        alloc: &A,
        pick: usize,
        size: usize,
    ) -> Result<(), Divergence> {
        let Some((h, old)) = self.pick(pick) else {
            // resize(None, n) behaves as alloc(n).
            return match alloc.resize(None, size) {
                Some(h) if size == 0 => Err(Divergence::new(Some(h), "resize(None, 0) returned a handle")),
                Some(h) => self.install(alloc, h, Vec::new(), size),
                None => Ok(()),
            };
        };

        match alloc.resize(Some(h), size) {
            None if size == 0 => self.retire(alloc, h),
            Some(n) if size == 0 => Err(Divergence::new(Some(n), "resize to zero returned a handle")),
            None => {
                // Failed move: the old allocation must be intact.
                self.check_contents(alloc, h, &old)
            }
            Some(n) => {
                let keep = old.len().min(size);
                self.check_contents(alloc, n, &old[..keep])?;
                self.live.shift_remove(&h);
                if n != h {
                    self.retire(alloc, h)?;
                }
                self.install(alloc, n, old[..keep].to_vec(), size)
            }
        }
    }

    fn retire<A: BlockAllocator + ?Sized>(&mut self, alloc: &A, h: Handle) -> Result<(), Divergence> {
        self.live.shift_remove(&h);
        if alloc.usable_size(h).is_some() {
            return Err(Divergence::new(Some(h), "handle still resolves after free"));
        }
        self.retired.push(h);
        Ok(())
    }

    fn check_contents<A: BlockAllocator + ?Sized>(
        &self,
        alloc: &A,
        h: Handle,
        expected: &[u8],
    ) -> Result<(), Divergence> {
        let mut actual = vec![0u8; expected.len()];
        alloc
            .read(h, 0, &mut actual)
            .map_err(|e| Divergence::new(Some(h), e.to_string()))?;
        if actual != expected {
            let at = actual
                .iter()
                .zip(expected)
                .position(|(a, e)| a != e)
                .unwrap_or(0);
            return Err(Divergence::new(
                Some(h),
                format!(
                    "contents differ at byte {at}: expected {:#04x}, found {:#04x}",
                    expected[at], actual[at]
                ),
            ));
        }
        Ok(())
    }

    /// Read back every live allocation and compare with the model.
    pub fn verify<A: BlockAllocator + ?Sized>(&self, alloc: &A) -> Result<(), Divergence> {
        self.live
            .iter()
            .try_for_each(|(h, expected)| self.check_contents(alloc, *h, expected))
    }

    /// Free every live allocation.
    pub fn release_all<A: BlockAllocator + ?Sized>(&mut self, alloc: &A) -> Result<(), Divergence> {
        let handles: Vec<Handle> = self.live.keys().copied().collect();
        handles.into_iter().try_for_each(|h| {
            alloc.free(Some(h));
            self.retire(alloc, h)
        })
    }
}
