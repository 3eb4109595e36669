//! Block registry: the split/coalesce bookkeeping over the arena.
//!
//! The registry owns an out-of-line header pool. Headers are linked into one
//! ascending-address chain covering the whole arena; each block is charged
//! `header_overhead` bytes of arena ahead of its payload, so the chain
//! partitions the arena exactly:
//!
//! ```text
//! offset 0                                                     capacity
//! |  H  | payload (used) |  H  | payload (free)  |  H  | payload (used) |
//! └─────── block 0 ──────┴─────── block 1 ───────┴─────── block 2 ──────┘
//! ```
//!
//! Header slots freed by merges are recycled through `vacant`, so the pool
//! never grows past the bound reserved at init.

use crate::arena::reserve_exact_or_abort;
use crate::block::{BlockHeader, BlockId, BlockInfo};
use crate::config::{FitPolicy, PoolConfig};
use crate::error::InvariantViolation;
use crate::metrics::PoolUsage;

/// Outcome of a successful [`Registry::allocate`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Placement {
    pub(crate) id: BlockId,
    /// Whether a free remainder was split off the chosen block.
    pub(crate) split: bool,
}

/// Outcome of a successful [`Registry::release`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Coalesce {
    /// Header describing the merged free run.
    pub(crate) survivor: BlockId,
    /// Number of neighbours absorbed (0, 1 or 2).
    pub(crate) merges: u32,
}

pub(crate) struct Registry {
    headers: Vec<BlockHeader>,
    /// Recycled header slots, not on the chain.
    vacant: Vec<BlockId>,
    capacity: usize,
    header_overhead: usize,
    fit: FitPolicy,
}

impl Registry {
    /// One free block spanning the whole arena.
    ///
    /// The caller has validated `config`, so the capacity exceeds the header
    /// overhead and the worst-case block count fits in `u32`.
    pub(crate) fn new(config: &PoolConfig) -> Self {
        let max_blocks = config.max_blocks();
        let mut headers = Vec::new();
        reserve_exact_or_abort(&mut headers, max_blocks);
        headers.push(BlockHeader {
            offset: 0,
            size: config.capacity - config.header_overhead,
            free: true,
            prev: None,
            next: None,
        });
        Self {
            headers,
            vacant: Vec::with_capacity(max_blocks),
            capacity: config.capacity,
            header_overhead: config.header_overhead,
            fit: config.fit,
        }
    }

    pub(crate) fn header(&self, id: BlockId) -> &BlockHeader {
        &self.headers[id.index()]
    }

    fn header_mut(&mut self, id: BlockId) -> &mut BlockHeader {
        &mut self.headers[id.index()]
    }

    /// Arena range `(offset, len)` of a block's payload.
    pub(crate) fn payload(&self, id: BlockId) -> (usize, usize) {
        let h = self.header(id);
        (h.offset + self.header_overhead, h.size)
    }

    /// Iterate all blocks in ascending address order.
    pub(crate) fn chain(&self) -> Chain<'_> {
        Chain {
            registry: self,
            cursor: Some(BlockId::HEAD),
        }
    }

    /// Pick a free block of at least `size` bytes according to the fit policy.
    fn find_fit(&self, size: usize) -> Option<BlockId> {
        let mut best: Option<(BlockId, usize)> = None;
        for (id, h) in self.chain() {
            if !h.free || h.size < size {
                continue;
            }
            match self.fit {
                FitPolicy::FirstFit => return Some(id),
                FitPolicy::BestFit => {
                    // Strict `<` keeps the lowest-address block on ties.
                    if best.map_or(true, |(_, s)| h.size < s) {
                        best = Some((id, h.size));
                        if h.size == size {
                            break;
                        }
                    }
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Carve an allocated block of `size` payload bytes out of the free-list.
    ///
    /// `size` must already be aligned and non-zero.
    pub(crate) fn allocate(&mut self, size: usize) -> Option<Placement> {
        let id = self.find_fit(size)?;
        let split = self.split(id, size);
        self.header_mut(id).free = false;
        Some(Placement { id, split })
    }

    /// Split a free remainder off `id` if it can hold a header and a
    /// non-empty payload. Returns whether a split happened.
    fn split(&mut self, id: BlockId, size: usize) -> bool {
        let h = self.header(id);
        // h.size >= size here, and h.size <= capacity, so no overflow.
        if h.size <= size + self.header_overhead {
            return false;
        }
        let remainder = BlockHeader {
            offset: h.offset + self.header_overhead + size,
            size: h.size - size - self.header_overhead,
            free: true,
            prev: Some(id),
            next: h.next,
        };
        let old_next = h.next;
        let new_id = self.insert_header(remainder);
        if let Some(next) = old_next {
            self.header_mut(next).prev = Some(new_id);
        }
        let h = self.header_mut(id);
        h.size = size;
        h.next = Some(new_id);
        true
    }

    fn insert_header(&mut self, header: BlockHeader) -> BlockId {
        if let Some(id) = self.vacant.pop() {
            self.headers[id.index()] = header;
            id
        } else {
            // Bounded by max_blocks: the Vec never reallocates.
            let id = BlockId(self.headers.len() as u32);
            self.headers.push(header);
            id
        }
    }

    /// Return an allocated block to the free-list and coalesce it with free
    /// neighbours: forward first, then backward, so the survivor is the
    /// lowest-address header of the run.
    ///
    /// Returns `None` if the block is already free.
    pub(crate) fn release(&mut self, id: BlockId) -> Option<Coalesce> {
        let h = self.header_mut(id);
        if h.free {
            return None;
        }
        h.free = true;
        let mut merges = 0;

        if let Some(next) = h.next {
            if self.header(next).free {
                self.absorb_next(id);
                merges += 1;
            }
        }

        let mut survivor = id;
        if let Some(prev) = self.header(id).prev {
            if self.header(prev).free {
                self.absorb_next(prev);
                survivor = prev;
                merges += 1;
            }
        }

        Some(Coalesce { survivor, merges })
    }

    /// Fold the block after `id` into `id` and recycle its header.
    fn absorb_next(&mut self, id: BlockId) {
        let Some(next) = self.header(id).next else {
            return;
        };
        let absorbed = self.header(next).clone();
        if let Some(after) = absorbed.next {
            self.header_mut(after).prev = Some(id);
        }
        let overhead = self.header_overhead;
        let h = self.header_mut(id);
        h.size += overhead + absorbed.size;
        h.next = absorbed.next;
        self.retire_header(next);
    }

    fn retire_header(&mut self, id: BlockId) {
        let h = self.header_mut(id);
        h.size = 0;
        h.free = true;
        h.prev = None;
        h.next = None;
        self.vacant.push(id);
    }

    /// Public view of every block in address order.
    pub(crate) fn blocks(&self) -> Vec<BlockInfo> {
        self.chain()
            .map(|(_, h)| BlockInfo {
                offset: h.offset,
                payload_offset: h.offset + self.header_overhead,
                size: h.size,
                free: h.free,
            })
            .collect()
    }

    /// Occupancy gauges computed from one chain walk.
    pub(crate) fn usage(&self) -> PoolUsage {
        let mut usage = PoolUsage {
            capacity: self.capacity,
            ..PoolUsage::default()
        };
        for (_, h) in self.chain() {
            usage.block_count += 1;
            usage.header_bytes += self.header_overhead;
            if h.free {
                usage.free_block_count += 1;
                usage.free_bytes += h.size;
                usage.largest_free_block = usage.largest_free_block.max(h.size);
            } else {
                usage.allocated_block_count += 1;
                usage.used_bytes += h.size;
            }
        }
        usage
    }

    /// Verify partition, adjacency, link and header-pool invariants.
    pub(crate) fn check(&self) -> Result<(), InvariantViolation> {
        let total = self.headers.len();
        let mut expected = 0usize;
        let mut linked = 0usize;
        let mut prev: Option<(BlockId, &BlockHeader)> = None;

        for (id, h) in self.chain() {
            linked += 1;
            if linked > total {
                // A cycle: the chain visits more headers than exist.
                return Err(InvariantViolation::LeakedHeaders {
                    linked,
                    vacant: self.vacant.len(),
                    total,
                });
            }
            if h.offset != expected {
                return Err(InvariantViolation::Gap {
                    expected,
                    found: h.offset,
                });
            }
            if h.prev != prev.map(|(pid, _)| pid) {
                return Err(InvariantViolation::BrokenLink { offset: h.offset });
            }
            if let Some((_, p)) = prev {
                if p.free && h.free {
                    return Err(InvariantViolation::AdjacentFree {
                        first: p.offset,
                        second: h.offset,
                    });
                }
            }
            expected = h.offset + self.header_overhead + h.size;
            prev = Some((id, h));
        }

        if expected != self.capacity {
            return Err(InvariantViolation::SpanMismatch {
                covered: expected,
                capacity: self.capacity,
            });
        }
        if linked + self.vacant.len() != total {
            return Err(InvariantViolation::LeakedHeaders {
                linked,
                vacant: self.vacant.len(),
                total,
            });
        }
        Ok(())
    }
}

/// Address-order iterator over the block chain.
pub(crate) struct Chain<'a> {
    registry: &'a Registry,
    cursor: Option<BlockId>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = (BlockId, &'a BlockHeader);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let h = self.registry.header(id);
        self.cursor = h.next;
        Some((id, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(capacity: usize, fit: FitPolicy) -> Registry {
        Registry::new(&PoolConfig::new(capacity).with_fit(fit))
    }

    fn layout(reg: &Registry) -> Vec<(usize, usize, bool)> {
        reg.chain().map(|(_, h)| (h.offset, h.size, h.free)).collect()
    }

    /// Free blocks of 64 @0, 32 @104 and 64 @176, separated by two
    /// allocated 8-byte spacers.
    fn fragmented(fit: FitPolicy) -> Registry {
        let mut reg = registry(256, fit);
        let a = reg.allocate(64).unwrap().id;
        reg.allocate(8).unwrap();
        let b = reg.allocate(32).unwrap().id;
        reg.allocate(8).unwrap();
        reg.release(a).unwrap();
        reg.release(b).unwrap();
        assert_eq!(
            layout(&reg),
            vec![
                (0, 64, true),
                (80, 8, false),
                (104, 32, true),
                (152, 8, false),
                (176, 64, true),
            ]
        );
        reg.check().unwrap();
        reg
    }

    #[test]
    fn new_registry_is_one_free_block() {
        let reg = registry(256, FitPolicy::BestFit);
        assert_eq!(layout(&reg), vec![(0, 240, true)]);
        reg.check().unwrap();
    }

    #[test]
    fn allocate_splits_remainder() {
        let mut reg = registry(256, FitPolicy::BestFit);
        let p = reg.allocate(32).unwrap();
        assert!(p.split);
        assert_eq!(p.id, BlockId::HEAD);
        assert_eq!(layout(&reg), vec![(0, 32, false), (48, 192, true)]);
        assert_eq!(reg.payload(p.id), (16, 32));
        reg.check().unwrap();
    }

    #[test]
    fn small_remainder_is_not_split() {
        let mut reg = registry(256, FitPolicy::BestFit);
        // 240 - 232 = 8 bytes left: not enough for a header plus payload.
        let p = reg.allocate(232).unwrap();
        assert!(!p.split);
        assert_eq!(layout(&reg), vec![(0, 240, false)]);
        reg.check().unwrap();
    }

    #[test]
    fn remainder_of_exactly_one_header_is_not_split() {
        let mut reg = registry(256, FitPolicy::BestFit);
        let p = reg.allocate(224).unwrap();
        assert!(!p.split);
        assert_eq!(layout(&reg), vec![(0, 240, false)]);
    }

    #[test]
    fn exhaustion_returns_none_without_side_effects() {
        let mut reg = registry(256, FitPolicy::BestFit);
        assert!(reg.allocate(248).is_none());
        assert_eq!(layout(&reg), vec![(0, 240, true)]);
        assert!(reg.allocate(240).is_some());
    }

    #[test]
    fn best_fit_picks_smallest_sufficient_block() {
        let mut reg = fragmented(FitPolicy::BestFit);
        let p = reg.allocate(24).unwrap();
        assert_eq!(reg.header(p.id).offset, 104);
        // 32 - 24 = 8 < header + payload, so handed out whole.
        assert!(!p.split);
        assert_eq!(reg.header(p.id).size, 32);
    }

    #[test]
    fn best_fit_ties_go_to_lowest_address() {
        let mut reg = fragmented(FitPolicy::BestFit);
        let p = reg.allocate(64).unwrap();
        assert_eq!(reg.header(p.id).offset, 0);
    }

    #[test]
    fn first_fit_picks_lowest_address_block() {
        let mut reg = fragmented(FitPolicy::FirstFit);
        let p = reg.allocate(24).unwrap();
        assert_eq!(reg.header(p.id).offset, 0);
        assert!(p.split);
        reg.check().unwrap();
    }

    #[test]
    fn release_merges_forward() {
        let mut reg = registry(256, FitPolicy::BestFit);
        let a = reg.allocate(32).unwrap().id;
        let c = reg.release(a).unwrap();
        assert_eq!(c.merges, 1);
        assert_eq!(c.survivor, a);
        assert_eq!(layout(&reg), vec![(0, 240, true)]);
        reg.check().unwrap();
    }

    #[test]
    fn release_merges_backward() {
        let mut reg = registry(256, FitPolicy::BestFit);
        let a = reg.allocate(32).unwrap().id;
        let b = reg.allocate(32).unwrap().id;
        let _c = reg.allocate(32).unwrap().id;
        reg.release(a).unwrap();
        let merged = reg.release(b).unwrap();
        assert_eq!(merged.merges, 1);
        assert_eq!(merged.survivor, a);
        assert_eq!(
            layout(&reg),
            vec![(0, 80, true), (96, 32, false), (144, 96, true)]
        );
        reg.check().unwrap();
    }

    #[test]
    fn release_merges_both_sides_into_lowest_header() {
        let mut reg = registry(256, FitPolicy::BestFit);
        let a = reg.allocate(32).unwrap().id;
        let b = reg.allocate(32).unwrap().id;
        let c = reg.allocate(32).unwrap().id;
        let _d = reg.allocate(32).unwrap().id;
        reg.release(a).unwrap();
        reg.release(c).unwrap();
        let merged = reg.release(b).unwrap();
        assert_eq!(merged.merges, 2);
        assert_eq!(merged.survivor, a);
        assert_eq!(layout(&reg)[0], (0, 32 * 3 + 16 * 2, true));
        reg.check().unwrap();
    }

    #[test]
    fn double_release_is_rejected() {
        let mut reg = registry(256, FitPolicy::BestFit);
        let a = reg.allocate(32).unwrap().id;
        let _b = reg.allocate(32).unwrap().id;
        assert!(reg.release(a).is_some());
        assert!(reg.release(a).is_none());
        reg.check().unwrap();
    }

    #[test]
    fn merged_headers_are_recycled() {
        let mut reg = registry(256, FitPolicy::BestFit);
        for _ in 0..20 {
            let a = reg.allocate(16).unwrap().id;
            let b = reg.allocate(16).unwrap().id;
            reg.release(a).unwrap();
            reg.release(b).unwrap();
        }
        // Never more than three headers in use at once.
        assert!(reg.headers.len() <= 3);
        reg.check().unwrap();
    }

    #[test]
    fn usage_accounts_for_every_byte() {
        let mut reg = registry(256, FitPolicy::BestFit);
        reg.allocate(32).unwrap();
        reg.allocate(64).unwrap();
        let u = reg.usage();
        assert_eq!(u.block_count, 3);
        assert_eq!(u.allocated_block_count, 2);
        assert_eq!(u.free_block_count, 1);
        assert_eq!(u.used_bytes, 96);
        assert_eq!(u.header_bytes, 48);
        assert_eq!(u.used_bytes + u.free_bytes + u.header_bytes, 256);
        assert_eq!(u.largest_free_block, u.free_bytes);
    }

    #[test]
    fn check_detects_adjacent_free_blocks() {
        let mut reg = registry(256, FitPolicy::BestFit);
        let a = reg.allocate(32).unwrap().id;
        // Bypass release() so no coalescing happens.
        reg.header_mut(a).free = true;
        assert!(matches!(
            reg.check(),
            Err(InvariantViolation::AdjacentFree { first: 0, second: 48 })
        ));
    }

    #[test]
    fn check_detects_gap() {
        let mut reg = registry(256, FitPolicy::BestFit);
        let a = reg.allocate(32).unwrap().id;
        reg.header_mut(a).size = 24;
        assert!(matches!(
            reg.check(),
            Err(InvariantViolation::Gap {
                expected: 40,
                found: 48
            })
        ));
    }

    #[test]
    fn blocks_reports_chain_in_address_order() {
        let mut reg = registry(256, FitPolicy::BestFit);
        reg.allocate(32).unwrap();
        let blocks = reg.blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].payload_offset, 16);
        assert!(!blocks[0].free);
        assert_eq!(blocks[1].offset, 48);
        assert!(blocks[1].free);
    }
}
