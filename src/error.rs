//! Errors reported while validating a map configuration.

/// A rejected [`GrowthPolicy`][crate::GrowthPolicy] setting.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The load factor denominator was zero.
    #[error("load factor denominator must be non-zero")]
    ZeroLoadFactorDenominator,

    /// The load factor was below one entry per bucket, which would keep the
    /// map doubling on almost every insertion.
    #[error("load factor {num}/{den} is below 1")]
    LoadFactorTooSmall { num: u32, den: u32 },

    /// The load factor exceeded the bucket capacity, which would force every
    /// chain to overflow before growth starts.
    #[error("load factor {num}/{den} exceeds the bucket capacity of {capacity}")]
    LoadFactorTooLarge { num: u32, den: u32, capacity: usize },

    /// The overflow cap shift was outside `1..=15`.
    #[error("overflow cap shift {0} is outside 1..=15")]
    OverflowCapShift(u8),

    /// The evacuation scan limit was zero.
    #[error("evacuation scan limit must be at least 1")]
    ZeroScanLimit,
}
