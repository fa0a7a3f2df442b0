//! Entry API: the write half of an insertion.
//!
//! `EvacMap::entry` does all the structural work up front (growth, migration,
//! choosing a slot). A `VacantEntry` then only has to drop the key and value
//! into the slot it was handed, so no temporary copy of the value is needed
//! before its final location is known.

use crate::bucket::BucketId;
use crate::map::EvacMap;
use crate::raw::VacantSlot;
use core::fmt;
use core::hash::{BuildHasher, Hash};

pub enum Entry<'a, K, V, S> {
    Occupied(OccupiedEntry<'a, K, V, S>),
    Vacant(VacantEntry<'a, K, V, S>),
}

pub struct OccupiedEntry<'a, K, V, S> {
    pub(crate) map: &'a mut EvacMap<K, V, S>,
    pub(crate) bucket: BucketId,
    pub(crate) slot: usize,
}

pub struct VacantEntry<'a, K, V, S> {
    pub(crate) map: &'a mut EvacMap<K, V, S>,
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) at: VacantSlot,
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(e) => e.key(),
            Entry::Vacant(e) => e.key(),
        }
    }

    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(default),
        }
    }

    /// Only calls `default` when the key is absent.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(default()),
        }
    }

    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }

    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut e) => {
                f(e.get_mut());
                Entry::Occupied(e)
            }
            Entry::Vacant(e) => Entry::Vacant(e),
        }
    }
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn key(&self) -> &K {
        self.map
            .table
            .key_at(self.bucket, self.slot)
            .expect("occupied entry points at a live slot")
    }

    pub fn get(&self) -> &V {
        self.map
            .table
            .value_at(self.bucket, self.slot)
            .expect("occupied entry points at a live slot")
    }

    pub fn get_mut(&mut self) -> &mut V {
        self.map
            .table
            .value_at_mut(self.bucket, self.slot)
            .expect("occupied entry points at a live slot")
    }

    pub fn into_mut(self) -> &'a mut V {
        self.map
            .table
            .value_at_mut(self.bucket, self.slot)
            .expect("occupied entry points at a live slot")
    }

    /// Replace the value in place, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    pub fn remove_entry(self) -> (K, V) {
        let map = self.map;
        let _g = map.write_flag.enter();
        map.table
            .remove_at(self.bucket, self.slot)
            .expect("occupied entry points at a live slot")
    }
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn into_key(self) -> K {
        self.key
    }

    /// Store the key and `value` in the reserved slot.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { map, hash, key, at } = self;
        let (bucket, slot) = {
            let _g = map.write_flag.enter();
            map.table.insert_vacant(at, hash, key, value)
        };
        map.table
            .value_at_mut(bucket, slot)
            .expect("slot was written above")
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for Entry<'_, K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Occupied(_) => f.write_str("Entry::Occupied"),
            Entry::Vacant(e) => f.debug_tuple("Entry::Vacant").field(&e.key).finish(),
        }
    }
}
