//! Overflow bucket supply and the approximate overflow counter.

use crate::bucket::{Bucket, BucketId};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;

/// Generations of at least 2^4 buckets get a preallocated overflow batch.
const PREALLOC_MIN_SIZE_CLASS: u8 = 4;

/// Below this size class the overflow counter is exact.
const EXACT_COUNT_SIZE_CLASS: u8 = 16;

#[derive(Clone, Debug)]
pub(crate) struct OverflowAllocator {
    /// Preallocated, still unused buckets already living in the arena.
    pool: Vec<BucketId>,
    approx_count: u16,
    rng: SmallRng,
}

impl OverflowAllocator {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            pool: Vec::new(),
            approx_count: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Number of overflow buckets to preallocate for a generation of
    /// `2^size_class` buckets.
    pub(crate) fn batch_size(size_class: u8) -> usize {
        if size_class >= PREALLOC_MIN_SIZE_CLASS {
            1usize << (size_class - PREALLOC_MIN_SIZE_CLASS)
        } else {
            0
        }
    }

    /// Fill the pool with `n` fresh buckets from `arena`.
    pub(crate) fn preallocate<K, V>(&mut self, arena: &mut SlotMap<BucketId, Bucket<K, V>>, n: usize) {
        self.pool.reserve(n);
        for _ in 0..n {
            self.pool.push(arena.insert(Bucket::new()));
        }
    }

    /// Hand out an empty bucket, pooled if one is left, and count it.
    pub(crate) fn next_overflow<K, V>(
        &mut self,
        arena: &mut SlotMap<BucketId, Bucket<K, V>>,
        size_class: u8,
    ) -> BucketId {
        let id = match self.pool.pop() {
            Some(id) => id,
            None => arena.insert(Bucket::new()),
        };
        self.note_allocated(size_class);
        log::trace!(
            "overflow bucket allocated (pooled left: {}, approx count: {})",
            self.pooled(),
            self.approx_count
        );
        id
    }

    /// Exact below `EXACT_COUNT_SIZE_CLASS`; above it, the counter moves with
    /// probability `2^-(size_class - 15)` so it stays within 16 bits.
    fn note_allocated(&mut self, size_class: u8) {
        if size_class < EXACT_COUNT_SIZE_CLASS {
            self.approx_count = self.approx_count.saturating_add(1);
            return;
        }
        let shift = u32::from(size_class - (EXACT_COUNT_SIZE_CLASS - 1)).min(31);
        let mask = (1u32 << shift) - 1;
        if self.rng.gen::<u32>() & mask == 0 {
            self.approx_count = self.approx_count.saturating_add(1);
        }
    }

    #[inline]
    pub(crate) fn approx_count(&self) -> u16 {
        self.approx_count
    }

    #[inline]
    pub(crate) fn pooled(&self) -> usize {
        self.pool.len()
    }
}
