//! Pool configuration parameters.

use crate::error::ConfigError;

/// Strategy used to pick a free block for an allocation request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FitPolicy {
    /// Smallest free block that satisfies the request. Ties go to the lowest
    /// address. Minimises fragmentation growth.
    #[default]
    BestFit,
    /// Lowest-address free block that satisfies the request.
    FirstFit,
}

/// Configuration for a [`MemoryPool`](crate::MemoryPool).
///
/// Validated by [`MemoryPool::init`](crate::MemoryPool::init); all values are
/// immutable once the pool exists.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Total arena size in bytes, headers included.
    pub capacity: usize,

    /// Arena bytes charged to every block for its header.
    ///
    /// Headers live out-of-line in the header pool, but each block still
    /// occupies `header_overhead` bytes of arena ahead of its payload. This
    /// is also the minimum-split threshold: a free block is only split when
    /// the remainder can hold a header plus a non-empty payload.
    ///
    /// Default: 16. Must be a multiple of `alignment`.
    pub header_overhead: usize,

    /// Granularity of payload sizes and offsets. Requests are rounded up to
    /// a multiple of this value.
    ///
    /// Default: 8. Must be a power of two.
    pub alignment: usize,

    /// Block selection policy. Default: [`FitPolicy::BestFit`].
    pub fit: FitPolicy,

    /// Zero-fill payloads when they are handed out. Default: `true`.
    pub zero_on_alloc: bool,
}

impl PoolConfig {
    /// Default per-block header charge in bytes.
    pub const DEFAULT_HEADER_OVERHEAD: usize = 16;

    /// Default payload alignment in bytes.
    pub const DEFAULT_ALIGNMENT: usize = 8;

    /// Create a config for an arena of `capacity` bytes with default values
    /// for every other parameter.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            header_overhead: Self::DEFAULT_HEADER_OVERHEAD,
            alignment: Self::DEFAULT_ALIGNMENT,
            fit: FitPolicy::BestFit,
            zero_on_alloc: true,
        }
    }

    /// Builder-style override of the fit policy.
    pub fn with_fit(mut self, fit: FitPolicy) -> Self {
        self.fit = fit;
        self
    }

    /// Check structural constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.alignment.is_power_of_two() {
            return Err(ConfigError::AlignmentNotPowerOfTwo {
                alignment: self.alignment,
            });
        }
        if self.header_overhead % self.alignment != 0 {
            return Err(ConfigError::HeaderMisaligned {
                header_overhead: self.header_overhead,
                alignment: self.alignment,
            });
        }
        if self.capacity > isize::MAX as usize {
            return Err(ConfigError::CapacityOverflow {
                capacity: self.capacity,
            });
        }
        let minimum = self.minimum_capacity();
        if self.capacity < minimum {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
                minimum,
            });
        }
        let max_blocks = self.max_blocks();
        if max_blocks > u32::MAX as usize {
            return Err(ConfigError::TooManyBlocks { max_blocks });
        }
        Ok(())
    }

    /// Smallest arena that can hold one header and a one-byte payload.
    pub fn minimum_capacity(&self) -> usize {
        self.header_overhead.saturating_add(1)
    }

    /// Worst-case number of blocks the arena can be partitioned into.
    ///
    /// Every block but the last spans at least one header plus one alignment
    /// unit of payload; the last block may be smaller. The header pool and
    /// the handle table are reserved to this bound at init.
    pub fn max_blocks(&self) -> usize {
        let min_span = self.header_overhead + self.alignment;
        self.capacity / min_span + 1
    }

    /// Round `size` up to the configured alignment. `None` on overflow.
    pub fn align_up(&self, size: usize) -> Option<usize> {
        let mask = self.alignment - 1;
        size.checked_add(mask).map(|s| s & !mask)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(64 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = PoolConfig::new(256);
        assert_eq!(config.header_overhead, 16);
        assert_eq!(config.alignment, 8);
        assert_eq!(config.fit, FitPolicy::BestFit);
        assert!(config.zero_on_alloc);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn align_up_rounds_to_alignment() {
        let config = PoolConfig::new(256);
        assert_eq!(config.align_up(0), Some(0));
        assert_eq!(config.align_up(1), Some(8));
        assert_eq!(config.align_up(8), Some(8));
        assert_eq!(config.align_up(13), Some(16));
        assert_eq!(config.align_up(usize::MAX), None);
    }

    #[test]
    fn alignment_of_one_is_identity() {
        let config = PoolConfig {
            alignment: 1,
            ..PoolConfig::new(64)
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.align_up(13), Some(13));
    }

    #[test]
    fn rejects_non_power_of_two_alignment() {
        let config = PoolConfig {
            alignment: 12,
            header_overhead: 24,
            ..PoolConfig::new(256)
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::AlignmentNotPowerOfTwo { alignment: 12 })
        );
    }

    #[test]
    fn rejects_zero_alignment() {
        let config = PoolConfig {
            alignment: 0,
            ..PoolConfig::new(256)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AlignmentNotPowerOfTwo { alignment: 0 })
        ));
    }

    #[test]
    fn rejects_misaligned_header() {
        let config = PoolConfig {
            header_overhead: 12,
            ..PoolConfig::new(256)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::HeaderMisaligned { .. })
        ));
    }

    #[test]
    fn rejects_capacity_that_cannot_hold_a_block() {
        assert_eq!(
            PoolConfig::new(16).validate(),
            Err(ConfigError::CapacityTooSmall {
                capacity: 16,
                minimum: 17,
            })
        );
        assert!(PoolConfig::new(17).validate().is_ok());
    }

    #[test]
    fn rejects_capacity_beyond_isize() {
        let config = PoolConfig::new(usize::MAX);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn max_blocks_bounds_worst_case_partition() {
        let config = PoolConfig::new(256);
        // 256 / (16 + 8) = 10 full minimum spans, plus a short tail block.
        assert_eq!(config.max_blocks(), 11);
    }

    #[test]
    fn zero_header_overhead_is_allowed() {
        let config = PoolConfig {
            header_overhead: 0,
            ..PoolConfig::new(64)
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.minimum_capacity(), 1);
    }
}
