//! Benchmark profiles for the mempool allocator.
//!
//! - [`reference_config`]: 1 MiB arena, default header overhead and alignment
//! - [`churned_pool`]: a pool left fragmented by a seeded random workload,
//!   so fit-policy scans run over a realistic mix of free and used blocks

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use mempool_arena::{FitPolicy, MemoryPool, PoolConfig};
use mempool_core::Handle;
use mempool_test_utils::{random_ops, Op};

/// Arena size used by the reference profile.
pub const REFERENCE_CAPACITY: usize = 1 << 20;

/// 1 MiB pool with the given fit policy and zero-fill disabled, so
/// benchmarks measure bookkeeping rather than memset.
pub fn reference_config(fit: FitPolicy) -> PoolConfig {
    PoolConfig {
        zero_on_alloc: false,
        ..PoolConfig::new(REFERENCE_CAPACITY).with_fit(fit)
    }
}

/// Build a pool from `config` and replay `steps` seeded operations with
/// sizes up to `max_size`. Returns the pool and its live handles.
///
/// # Panics
///
/// Panics if `config` is invalid.
pub fn churned_pool(
    config: PoolConfig,
    seed: u64,
    steps: usize,
    max_size: usize,
) -> (MemoryPool, Vec<Handle>) {
    let pool = MemoryPool::init(config).expect("benchmark pool config must be valid");
    let mut live: Vec<Handle> = Vec::new();
    for op in random_ops(seed, steps, max_size) {
        match op {
            Op::Alloc { size } => live.extend(pool.alloc(size)),
            Op::Free { pick } if !live.is_empty() => {
                let h = live.swap_remove(pick % live.len());
                pool.free(h);
            }
            Op::Resize { pick, size } if !live.is_empty() => {
                let idx = pick % live.len();
                match pool.resize(live[idx], size) {
                    Some(h) => live[idx] = h,
                    None if size == 0 => {
                        let _ = live.swap_remove(idx);
                    }
                    None => {}
                }
            }
            _ => {}
        }
    }
    (pool, live)
}
