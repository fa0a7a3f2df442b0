//! One full bucket array plus its overflow state.

use crate::bucket::{Bucket, BucketId};
use crate::overflow::OverflowAllocator;
use slotmap::SlotMap;

/// `2^size_class` primary buckets and every overflow bucket chained off them.
///
/// All buckets live in one arena owned by the generation, so releasing a
/// generation drops its whole bucket population at once.
#[derive(Clone, Debug)]
pub(crate) struct Generation<K, V> {
    size_class: u8,
    pub(crate) arena: SlotMap<BucketId, Bucket<K, V>>,
    primary: Vec<BucketId>,
    overflow: OverflowAllocator,
}

impl<K, V> Generation<K, V> {
    pub(crate) fn new(size_class: u8, seed: u64) -> Self {
        let n = 1usize << size_class;
        let batch = OverflowAllocator::batch_size(size_class);
        let mut arena = SlotMap::with_capacity_and_key(n + batch);
        let primary = (0..n).map(|_| arena.insert(Bucket::new())).collect();
        let mut overflow = OverflowAllocator::new(seed);
        overflow.preallocate(&mut arena, batch);
        Self {
            size_class,
            arena,
            primary,
            overflow,
        }
    }

    #[inline]
    pub(crate) fn size_class(&self) -> u8 {
        self.size_class
    }

    #[inline]
    pub(crate) fn bucket_count(&self) -> usize {
        self.primary.len()
    }

    #[inline]
    pub(crate) fn mask(&self) -> u64 {
        (self.bucket_count() as u64).wrapping_sub(1)
    }

    /// Chain head for bucket index `i`.
    #[inline]
    pub(crate) fn head(&self, i: usize) -> BucketId {
        self.primary[i]
    }

    #[inline]
    pub(crate) fn bucket(&self, id: BucketId) -> &Bucket<K, V> {
        &self.arena[id]
    }

    #[inline]
    pub(crate) fn bucket_mut(&mut self, id: BucketId) -> &mut Bucket<K, V> {
        &mut self.arena[id]
    }

    pub(crate) fn is_evacuated(&self, i: usize) -> bool {
        self.arena[self.primary[i]].is_evacuated()
    }

    /// Allocate an overflow bucket and link it after `tail`.
    pub(crate) fn append_overflow(&mut self, tail: BucketId) -> BucketId {
        debug_assert!(self.arena[tail].overflow.is_none());
        let id = self.overflow.next_overflow(&mut self.arena, self.size_class);
        self.arena[tail].overflow = Some(id);
        id
    }

    /// Drop every overflow bucket of chain `i`, keeping the primary bucket
    /// (and its migration markers) in place.
    pub(crate) fn release_overflow(&mut self, i: usize) -> usize {
        let head = self.primary[i];
        let mut next = self.arena[head].overflow.take();
        let mut released = 0;
        while let Some(id) = next {
            next = self.arena.remove(id).and_then(|b| b.overflow);
            released += 1;
        }
        released
    }

    #[inline]
    pub(crate) fn approx_overflow(&self) -> u16 {
        self.overflow.approx_count()
    }

    pub(crate) fn into_arena(self) -> SlotMap<BucketId, Bucket<K, V>> {
        self.arena
    }

    pub(crate) fn chain(&self, i: usize) -> Chain<'_, K, V> {
        Chain {
            generation: self,
            next: Some(self.primary[i]),
        }
    }
}

/// Bucket ids of one chain, head first.
pub(crate) struct Chain<'a, K, V> {
    generation: &'a Generation<K, V>,
    next: Option<BucketId>,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = BucketId;

    fn next(&mut self) -> Option<BucketId> {
        let id = self.next?;
        self.next = self.generation.arena[id].overflow;
        Some(id)
    }
}
