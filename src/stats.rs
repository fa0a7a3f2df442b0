use crate::growth::GrowthMode;
use std::fmt::{self, Debug};

/// A point-in-time snapshot of a map's layout and growth history.
///
/// - `size_class` is log2 of the current bucket count.
/// - `approx_overflow_buckets` is the current generation's overflow counter.
///   It is exact for size classes below 16 and sampled above that, which is
///   what the overflow-bloat trigger compares against.
/// - `growth` is `Some` while a previous generation is still being
///   evacuated; `evacuation_cursor` then counts the old buckets known to be
///   done.
/// - `doublings` and `same_size_growths` count growths *started* over the
///   map's lifetime. `clear` does not reset them.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MapStats {
    pub(crate) len: usize,
    pub(crate) size_class: u8,
    pub(crate) bucket_count: usize,
    pub(crate) approx_overflow_buckets: u16,
    pub(crate) growth: Option<GrowthMode>,
    pub(crate) evacuation_cursor: usize,
    pub(crate) doublings: u64,
    pub(crate) same_size_growths: u64,
}

impl Debug for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapStats")
            .field("len", &self.len)
            .field("size_class", &self.size_class)
            .field("bucket_count", &self.bucket_count)
            .field("load_factor", &self.load_factor())
            .field("approx_overflow_buckets", &self.approx_overflow_buckets)
            .field("growth", &self.growth)
            .field("evacuation_cursor", &self.evacuation_cursor)
            .field("doublings", &self.doublings)
            .field("same_size_growths", &self.same_size_growths)
            .finish()
    }
}

impl MapStats {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn size_class(&self) -> u8 {
        self.size_class
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Entries per bucket of the current generation.
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.bucket_count as f64
    }

    pub fn approx_overflow_buckets(&self) -> u16 {
        self.approx_overflow_buckets
    }

    pub fn growth(&self) -> Option<GrowthMode> {
        self.growth
    }

    pub fn is_growing(&self) -> bool {
        self.growth.is_some()
    }

    pub fn evacuation_cursor(&self) -> usize {
        self.evacuation_cursor
    }

    pub fn doublings(&self) -> u64 {
        self.doublings
    }

    pub fn same_size_growths(&self) -> u64 {
        self.same_size_growths
    }
}
