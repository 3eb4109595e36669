//! Seeded random operation sequences.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// One allocator call in a generated workload.
///
/// `pick` selects a live allocation by index modulo the number of live
/// allocations, so a workload stays meaningful whatever the allocator
/// returned for earlier steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Alloc { size: usize },
    Free { pick: usize },
    Resize { pick: usize, size: usize },
}

/// Generate `count` operations with sizes in `0..=max_size`.
///
/// Identical seeds produce identical sequences. Roughly half the operations
/// allocate, 30% free and 20% resize; about one size in twenty is zero.
pub fn random_ops(seed: u64, count: usize, max_size: usize) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let size = |rng: &mut ChaCha8Rng| {
        if rng.random_range(0..20) == 0 {
            0
        } else {
            rng.random_range(1..=max_size.max(1))
        }
    };
    (0..count)
        .map(|_| {
            let roll = rng.random_range(0..10);
            let pick = rng.random_range(0..usize::MAX);
            match roll {
                0..=4 => Op::Alloc {
                    size: size(&mut rng),
                },
                5..=7 => Op::Free { pick },
                _ => Op::Resize {
                    pick,
                    size: size(&mut rng),
                },
            }
        })
        .collect()
}
