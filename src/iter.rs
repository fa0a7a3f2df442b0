//! Iterators over `EvacMap`.
//!
//! Iteration walks every bucket of the current generation, then every
//! bucket of the previous generation if a growth is in flight. Slots of the
//! previous generation whose entries already migrated carry an evacuation
//! marker instead of a live tag and are skipped, so each entry is yielded
//! exactly once. Order is unspecified.

use crate::bucket::{Bucket, BucketId, LiveSlots, LiveSlotsMut, Slot, BUCKET_CAPACITY};
use crate::generation::Generation;
use core::iter::{Flatten, FusedIterator};
use slotmap::basic;

type Buckets<'a, K, V> = basic::Values<'a, BucketId, Bucket<K, V>>;
type BucketsMut<'a, K, V> = basic::ValuesMut<'a, BucketId, Bucket<K, V>>;
type OwnedBuckets<K, V> = basic::IntoIter<BucketId, Bucket<K, V>>;
type OwnedSlots<K, V> = Flatten<core::array::IntoIter<Option<Slot<K, V>>, BUCKET_CAPACITY>>;

/// Iterator over `(&K, &V)`.
pub struct Iter<'a, K, V> {
    buckets: Option<Buckets<'a, K, V>>,
    pending: Option<Buckets<'a, K, V>>,
    slots: Option<LiveSlots<'a, K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(
        current: Option<&'a Generation<K, V>>,
        previous: Option<&'a Generation<K, V>>,
        len: usize,
    ) -> Self {
        Self {
            buckets: current.map(|g| g.arena.values()),
            pending: previous.map(|g| g.arena.values()),
            slots: None,
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(kv) = self.slots.as_mut().and_then(Iterator::next) {
                self.remaining = self.remaining.saturating_sub(1);
                return Some(kv);
            }
            match self.buckets.as_mut().and_then(Iterator::next) {
                Some(b) => self.slots = Some(LiveSlots::new(b)),
                None => {
                    self.slots = None;
                    self.buckets = Some(self.pending.take()?);
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)`.
pub struct IterMut<'a, K, V> {
    buckets: Option<BucketsMut<'a, K, V>>,
    pending: Option<BucketsMut<'a, K, V>>,
    slots: Option<LiveSlotsMut<'a, K, V>>,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(
        current: Option<&'a mut Generation<K, V>>,
        previous: Option<&'a mut Generation<K, V>>,
        len: usize,
    ) -> Self {
        Self {
            buckets: current.map(|g| g.arena.values_mut()),
            pending: previous.map(|g| g.arena.values_mut()),
            slots: None,
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(kv) = self.slots.as_mut().and_then(Iterator::next) {
                self.remaining = self.remaining.saturating_sub(1);
                return Some(kv);
            }
            match self.buckets.as_mut().and_then(Iterator::next) {
                Some(b) => self.slots = Some(LiveSlotsMut::new(b)),
                None => {
                    self.slots = None;
                    self.buckets = Some(self.pending.take()?);
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over `(K, V)`.
pub struct IntoIter<K, V> {
    buckets: Option<OwnedBuckets<K, V>>,
    pending: Option<OwnedBuckets<K, V>>,
    slots: Option<OwnedSlots<K, V>>,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(
        current: Option<Generation<K, V>>,
        previous: Option<Generation<K, V>>,
        len: usize,
    ) -> Self {
        Self {
            buckets: current.map(|g| g.into_arena().into_iter()),
            pending: previous.map(|g| g.into_arena().into_iter()),
            slots: None,
            remaining: len,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Evacuated and deleted slots hold `None`, so flattening the
            // slot array yields exactly the live entries.
            if let Some(slot) = self.slots.as_mut().and_then(Iterator::next) {
                self.remaining = self.remaining.saturating_sub(1);
                return Some(slot.into_pair());
            }
            match self.buckets.as_mut().and_then(Iterator::next) {
                Some((_, b)) => self.slots = Some(b.slots.into_iter().flatten()),
                None => {
                    self.slots = None;
                    self.buckets = Some(self.pending.take()?);
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

/// Iterator over `&K`.
pub struct Keys<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// Iterator over `&V`.
pub struct Values<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// Iterator over `&mut V`.
pub struct ValuesMut<'a, K, V> {
    pub(crate) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
