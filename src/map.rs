//! EvacMap: the public map type.
//!
//! `EvacMap` owns a `RawTable` and a `WriteFlag`. Every operation that can
//! restructure the table runs inside a write-flag section; read paths check
//! that no write is in progress. Everything else is delegated to the raw
//! table.

use crate::builder::MapBuilder;
use crate::entry::{Entry, OccupiedEntry, VacantEntry};
use crate::growth::GrowthMode;
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::policy::GrowthPolicy;
use crate::raw::{Probe, RawTable};
use crate::stats::MapStats;
use crate::write_flag::WriteFlag;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

/// A hash map that grows incrementally.
///
/// When the table outgrows its bucket array, a new array is allocated and
/// entries migrate a couple of buckets at a time as later insertions and
/// removals touch the table, so no single operation pays for rehashing the
/// whole map.
///
/// The map is not synchronized. Sharing it between threads needs external
/// locking; a detected unsynchronized write aborts the process.
pub struct EvacMap<K, V, S = RandomState> {
    pub(crate) table: RawTable<K, V, S>,
    pub(crate) write_flag: WriteFlag,
}

impl<K, V> EvacMap<K, V, RandomState>
where
    K: Eq + Hash,
{
    /// Create an empty map. No buckets are allocated until the first insert.
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Create a map sized so `capacity` entries fit without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }

    pub fn builder() -> MapBuilder<EvacMap<K, V, RandomState>> {
        MapBuilder::new()
    }
}

impl<K, V, S> EvacMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self::with_policy(capacity, hasher, GrowthPolicy::default())
    }

    /// Policy must already be validated.
    pub(crate) fn with_policy(capacity: usize, hasher: S, policy: GrowthPolicy) -> Self {
        Self {
            table: RawTable::new(capacity, hasher, policy),
            write_flag: WriteFlag::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hasher(&self) -> &S {
        &self.table.hasher
    }

    pub fn policy(&self) -> &GrowthPolicy {
        &self.table.policy
    }

    /// log2 of the current bucket count.
    pub fn size_class(&self) -> u8 {
        self.table.size_class
    }

    /// `Some` while entries are still migrating out of an old bucket array.
    pub fn growth_mode(&self) -> Option<GrowthMode> {
        self.table.growth
    }

    pub fn stats(&self) -> MapStats {
        self.table.stats()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.write_flag.check_read();
        if self.table.len() == 0 {
            return None;
        }
        let hash = self.table.make_hash(key);
        self.table.find(hash, key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).is_some()
    }

    /// Mutable access without triggering any migration work.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.write_flag.check_read();
        if self.table.len() == 0 {
            return None;
        }
        let hash = self.table.make_hash(key);
        self.table.find_mut(hash, key)
    }

    /// Locate `key`'s slot, growing and migrating first if needed.
    ///
    /// A vacant entry already has its destination chosen; inserting through
    /// it does no further probing.
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S> {
        let hash = self.table.make_hash(&key);
        let probe = {
            let _g = self.write_flag.enter();
            self.table.probe_for_insert(hash, &key)
        };
        match probe {
            Probe::Found(bucket, slot) => Entry::Occupied(OccupiedEntry {
                map: self,
                bucket,
                slot,
            }),
            Probe::Vacant(at) => Entry::Vacant(VacantEntry {
                map: self,
                hash,
                key,
                at,
            }),
        }
    }

    /// Insert or overwrite, returning the previous value. The stored key is
    /// kept when overwriting.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.entry(key) {
            Entry::Occupied(mut e) => Some(e.insert(value)),
            Entry::Vacant(e) => {
                e.insert(value);
                None
            }
        }
    }

    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.entry(key).or_insert_with(default)
    }

    /// Remove `key`, returning its value. Absent keys are a no-op.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.table.len() == 0 {
            return None;
        }
        let hash = self.table.make_hash(key);
        let _g = self.write_flag.enter();
        self.table.remove(hash, key)
    }

    /// Drop every entry, keeping the current bucket count.
    pub fn clear(&mut self) {
        let _g = self.write_flag.enter();
        self.table.clear();
    }
}

impl<K, V, S> EvacMap<K, V, S> {
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.write_flag.check_read();
        Iter::new(
            self.table.current.as_ref(),
            self.table.previous.as_ref(),
            self.table.count,
        )
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.write_flag.check_read();
        let t = &mut self.table;
        IterMut::new(t.current.as_mut(), t.previous.as_mut(), t.count)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }
}

impl<K, V, S> Default for EvacMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Clone for EvacMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        self.write_flag.check_read();
        Self {
            table: self.table.clone(),
            write_flag: WriteFlag::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for EvacMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for EvacMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for EvacMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity_and_hasher(iter.size_hint().0, S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S> IntoIterator for EvacMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        self.write_flag.check_read();
        let t = self.table;
        IntoIter::new(t.current, t.previous, t.count)
    }
}

impl<'a, K, V, S> IntoIterator for &'a EvacMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut EvacMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
