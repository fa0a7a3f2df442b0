//! Growth tuning knobs and the two growth triggers.

use crate::bucket::BUCKET_CAPACITY;
use crate::error::ConfigError;

/// Tuning constants for the growth engine.
///
/// The defaults (load factor 6.5, overflow cap 2^15, 1024 buckets per
/// cursor pass) are empirically tuned; any validated values keep both
/// triggers working.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GrowthPolicy {
    load_factor_num: u32,
    load_factor_den: u32,
    overflow_cap_shift: u8,
    evacuation_scan_limit: usize,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            load_factor_num: 13,
            load_factor_den: 2,
            overflow_cap_shift: 15,
            evacuation_scan_limit: 1024,
        }
    }
}

impl GrowthPolicy {
    /// Average entries per bucket above which the map doubles, as `num/den`.
    pub fn with_load_factor(self, num: u32, den: u32) -> Self {
        Self {
            load_factor_num: num,
            load_factor_den: den,
            ..self
        }
    }

    /// Size class at which the overflow-bloat cap stops growing with the table.
    pub fn with_overflow_cap_shift(self, shift: u8) -> Self {
        Self {
            overflow_cap_shift: shift,
            ..self
        }
    }

    /// Maximum number of already-evacuated buckets the cursor skips per pass.
    pub fn with_evacuation_scan_limit(self, limit: usize) -> Self {
        Self {
            evacuation_scan_limit: limit,
            ..self
        }
    }

    pub fn load_factor(&self) -> (u32, u32) {
        (self.load_factor_num, self.load_factor_den)
    }

    pub fn overflow_cap_shift(&self) -> u8 {
        self.overflow_cap_shift
    }

    pub fn evacuation_scan_limit(&self) -> usize {
        self.evacuation_scan_limit
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (num, den) = (self.load_factor_num, self.load_factor_den);
        if den == 0 {
            return Err(ConfigError::ZeroLoadFactorDenominator);
        }
        if num < den {
            return Err(ConfigError::LoadFactorTooSmall { num, den });
        }
        if u64::from(num) > u64::from(den) * BUCKET_CAPACITY as u64 {
            return Err(ConfigError::LoadFactorTooLarge {
                num,
                den,
                capacity: BUCKET_CAPACITY,
            });
        }
        if !(1..=15).contains(&self.overflow_cap_shift) {
            return Err(ConfigError::OverflowCapShift(self.overflow_cap_shift));
        }
        if self.evacuation_scan_limit == 0 {
            return Err(ConfigError::ZeroScanLimit);
        }
        Ok(())
    }

    /// Whether `count` entries in `2^size_class` buckets exceed the load factor.
    #[inline]
    pub(crate) fn over_load_factor(&self, count: usize, size_class: u8) -> bool {
        let lhs = (count as u128) * u128::from(self.load_factor_den);
        let rhs = u128::from(self.load_factor_num) << size_class;
        lhs > rhs
    }

    /// Whether `overflow` buckets are too many for `2^size_class` primaries.
    #[inline]
    pub(crate) fn too_many_overflow(&self, overflow: u16, size_class: u8) -> bool {
        let b = size_class.min(self.overflow_cap_shift);
        u32::from(overflow) >= 1u32 << b
    }

    /// Smallest size class able to hold `hint` entries without growing.
    pub(crate) fn size_class_for(&self, hint: usize) -> u8 {
        let mut b = 0u8;
        while b < MAX_SIZE_CLASS && self.over_load_factor(hint, b) {
            b += 1;
        }
        b
    }
}

/// Bucket indices are taken from a `u64` hash.
pub(crate) const MAX_SIZE_CLASS: u8 = 63;
