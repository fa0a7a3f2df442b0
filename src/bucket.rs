//! Fixed-capacity slot groups chained through arena links.

use crate::stored::{SlotLayout, Stored};
use crate::tag;
use slotmap::new_key_type;

/// Slots per bucket.
pub const BUCKET_CAPACITY: usize = 8;

new_key_type! {
    /// Arena index of a bucket within one generation.
    pub(crate) struct BucketId;
}

#[derive(Clone, Debug)]
pub(crate) struct Slot<K, V> {
    pub(crate) key: Stored<K>,
    pub(crate) value: Stored<V>,
}

impl<K, V> Slot<K, V> {
    pub(crate) fn new(key: K, value: V, layout: SlotLayout) -> Self {
        Self {
            key: Stored::new(key, layout.boxed_keys),
            value: Stored::new(value, layout.boxed_values),
        }
    }

    pub(crate) fn into_pair(self) -> (K, V) {
        (self.key.into_inner(), self.value.into_inner())
    }
}

/// One link of a bucket chain.
///
/// Invariant: `slots[i].is_some()` iff `tag::is_live(tags[i])`.
#[derive(Clone, Debug)]
pub(crate) struct Bucket<K, V> {
    pub(crate) tags: [u8; BUCKET_CAPACITY],
    pub(crate) slots: [Option<Slot<K, V>>; BUCKET_CAPACITY],
    pub(crate) overflow: Option<BucketId>,
}

impl<K, V> Bucket<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            tags: [tag::EMPTY; BUCKET_CAPACITY],
            slots: core::array::from_fn(|_| None),
            overflow: None,
        }
    }

    /// A chain head counts as evacuated once its first slot carries a
    /// migration marker; evacuation always rewrites every slot of the chain.
    #[inline]
    pub(crate) fn is_evacuated(&self) -> bool {
        tag::is_evacuated(self.tags[0])
    }

    /// Find the slot holding `key` among slots tagged `t`.
    #[inline]
    pub(crate) fn find<F>(&self, t: u8, mut eq: F) -> Option<usize>
    where
        F: FnMut(&K) -> bool,
    {
        (0..BUCKET_CAPACITY).find(|&i| {
            self.tags[i] == t
                && self.slots[i]
                    .as_ref()
                    .map(|s| eq(s.key.get()))
                    .unwrap_or(false)
        })
    }

    #[inline]
    pub(crate) fn first_empty(&self) -> Option<usize> {
        self.tags.iter().position(|&t| t == tag::EMPTY)
    }

    pub(crate) fn put(&mut self, i: usize, t: u8, slot: Slot<K, V>) {
        debug_assert!(tag::is_live(t));
        debug_assert_eq!(self.tags[i], tag::EMPTY);
        self.tags[i] = t;
        self.slots[i] = Some(slot);
    }

    /// Clear slot `i`, leaving `marker` behind as its tag.
    pub(crate) fn take(&mut self, i: usize, marker: u8) -> Option<Slot<K, V>> {
        debug_assert!(!tag::is_live(marker));
        self.tags[i] = marker;
        self.slots[i].take()
    }

    pub(crate) fn key(&self, i: usize) -> Option<&K> {
        self.slots[i].as_ref().map(|s| s.key.get())
    }

    pub(crate) fn value(&self, i: usize) -> Option<&V> {
        self.slots[i].as_ref().map(|s| s.value.get())
    }

    pub(crate) fn value_mut(&mut self, i: usize) -> Option<&mut V> {
        self.slots[i].as_mut().map(|s| s.value.get_mut())
    }

    pub(crate) fn live_count(&self) -> usize {
        self.tags.iter().filter(|&&t| tag::is_live(t)).count()
    }
}

impl<K, V> Default for Bucket<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Live entries of one bucket, in slot order.
pub(crate) struct LiveSlots<'a, K, V> {
    tags: core::slice::Iter<'a, u8>,
    slots: core::slice::Iter<'a, Option<Slot<K, V>>>,
}

impl<'a, K, V> LiveSlots<'a, K, V> {
    pub(crate) fn new(b: &'a Bucket<K, V>) -> Self {
        Self {
            tags: b.tags.iter(),
            slots: b.slots.iter(),
        }
    }
}

impl<'a, K, V> Iterator for LiveSlots<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let t = *self.tags.next()?;
            let s = self.slots.next()?;
            if !tag::is_live(t) {
                continue;
            }
            if let Some(s) = s {
                return Some((s.key.get(), s.value.get()));
            }
        }
    }
}

/// Mutable counterpart of [`LiveSlots`].
pub(crate) struct LiveSlotsMut<'a, K, V> {
    tags: core::slice::Iter<'a, u8>,
    slots: core::slice::IterMut<'a, Option<Slot<K, V>>>,
}

impl<'a, K, V> LiveSlotsMut<'a, K, V> {
    pub(crate) fn new(b: &'a mut Bucket<K, V>) -> Self {
        let Bucket { tags, slots, .. } = b;
        Self {
            tags: tags.iter(),
            slots: slots.iter_mut(),
        }
    }
}

impl<'a, K, V> Iterator for LiveSlotsMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let t = *self.tags.next()?;
            let s = self.slots.next()?;
            if !tag::is_live(t) {
                continue;
            }
            if let Some(s) = s {
                let Slot { key, value } = s;
                return Some((key.get(), value.get_mut()));
            }
        }
    }
}
