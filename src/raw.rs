//! RawTable: table header plus the lookup and mutate engine.
//!
//! The raw table does not guard against concurrent writers; `EvacMap` wraps
//! every call that can restructure it in a write-flag section.

use crate::bucket::{BucketId, Slot};
use crate::generation::Generation;
use crate::growth::GrowthMode;
use crate::policy::GrowthPolicy;
use crate::stats::MapStats;
use crate::stored::SlotLayout;
use crate::tag;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};

/// Where `probe_for_insert` wants a new entry written.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum VacantSlot {
    /// First free slot found while scanning the chain.
    Hole(BucketId, usize),
    /// Chain is full; a new overflow bucket goes after this tail.
    Append(BucketId),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Probe {
    Found(BucketId, usize),
    Vacant(VacantSlot),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Which {
    Current,
    Previous,
}

#[derive(Clone, Debug)]
pub(crate) struct RawTable<K, V, S> {
    pub(crate) hasher: S,
    pub(crate) count: usize,
    /// log2 of the current generation's bucket count.
    pub(crate) size_class: u8,
    pub(crate) growth: Option<GrowthMode>,
    pub(crate) current: Option<Generation<K, V>>,
    pub(crate) previous: Option<Generation<K, V>>,
    /// Every previous-generation bucket below this index is evacuated.
    pub(crate) evacuated: usize,
    pub(crate) policy: GrowthPolicy,
    pub(crate) layout: SlotLayout,
    generations_made: u64,
    pub(crate) doublings: u64,
    pub(crate) same_size_growths: u64,
}

impl<K, V, S> RawTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn new(hint: usize, hasher: S, policy: GrowthPolicy) -> Self {
        let size_class = policy.size_class_for(hint);
        let mut t = Self {
            hasher,
            count: 0,
            size_class,
            growth: None,
            current: None,
            previous: None,
            evacuated: 0,
            policy,
            layout: SlotLayout::of::<K, V>(),
            generations_made: 0,
            doublings: 0,
            same_size_growths: 0,
        };
        // Small tables allocate on first insertion.
        if size_class > 0 {
            let seed = t.generation_seed();
            t.current = Some(Generation::new(size_class, seed));
        }
        t
    }

    #[inline]
    pub(crate) fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Seed for a new generation's overflow counter, derived from the
    /// table's own hasher so no state is shared between tables.
    pub(crate) fn generation_seed(&mut self) -> u64 {
        self.generations_made += 1;
        self.hasher.hash_one(self.generations_made)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub(crate) fn is_growing(&self) -> bool {
        self.growth.is_some()
    }

    #[inline]
    fn generation(&self, which: Which) -> Option<&Generation<K, V>> {
        match which {
            Which::Current => self.current.as_ref(),
            Which::Previous => self.previous.as_ref(),
        }
    }

    #[inline]
    fn generation_mut(&mut self, which: Which) -> Option<&mut Generation<K, V>> {
        match which {
            Which::Current => self.current.as_mut(),
            Which::Previous => self.previous.as_mut(),
        }
    }

    /// Chain a read must search: the previous generation's bucket while it
    /// still holds unmigrated entries, otherwise the current one.
    fn read_target(&self, hash: u64) -> Option<(Which, usize)> {
        let cur = self.current.as_ref()?;
        if let Some(prev) = self.previous.as_ref() {
            let i = (hash & prev.mask()) as usize;
            if !prev.is_evacuated(i) {
                return Some((Which::Previous, i));
            }
        }
        Some((Which::Current, (hash & cur.mask()) as usize))
    }

    fn locate<Q>(&self, hash: u64, q: &Q) -> Option<(Which, BucketId, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        if self.count == 0 {
            return None;
        }
        let (which, i) = self.read_target(hash)?;
        let g = self.generation(which)?;
        let t = tag::tag_of(hash);
        g.chain(i).find_map(|id| {
            g.bucket(id)
                .find(t, |k| k.borrow() == q)
                .map(|s| (which, id, s))
        })
    }

    pub(crate) fn find<Q>(&self, hash: u64, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let (which, id, s) = self.locate(hash, q)?;
        let b = self.generation(which)?.bucket(id);
        Some((b.key(s)?, b.value(s)?))
    }

    pub(crate) fn find_mut<Q>(&mut self, hash: u64, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let (which, id, s) = self.locate(hash, q)?;
        self.generation_mut(which)?.bucket_mut(id).value_mut(s)
    }

    fn ensure_allocated(&mut self) {
        if self.current.is_none() {
            let seed = self.generation_seed();
            self.current = Some(Generation::new(self.size_class, seed));
        }
    }

    /// Current bucket index for `hash`, after paying any migration it owes.
    ///
    /// Finishing one growth may start a doubling, which changes the index,
    /// so the work is repeated until the size class holds still.
    fn settle_bucket(&mut self, hash: u64) -> usize {
        loop {
            let size_class = self.size_class;
            let i = (hash & ((1u64 << size_class) - 1)) as usize;
            if !self.is_growing() {
                return i;
            }
            self.grow_work(i);
            if self.size_class == size_class {
                return i;
            }
        }
    }

    /// Find `q`'s slot in the current generation, or decide where a new
    /// entry for it goes. May start a growth and always pays the migration
    /// work owed by the addressed bucket first.
    pub(crate) fn probe_for_insert<Q>(&mut self, hash: u64, q: &Q) -> Probe
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let t = tag::tag_of(hash);
        loop {
            self.ensure_allocated();
            let i = self.settle_bucket(hash);
            let cur = self
                .current
                .as_ref()
                .expect("bucket array allocated before probing");

            let mut hole = None;
            let mut tail = cur.head(i);
            for id in cur.chain(i) {
                let b = cur.bucket(id);
                if let Some(s) = b.find(t, |k| k.borrow() == q) {
                    return Probe::Found(id, s);
                }
                if hole.is_none() {
                    hole = b.first_empty().map(|s| (id, s));
                }
                tail = id;
            }

            if !self.is_growing() {
                let overloaded = self.policy.over_load_factor(self.count + 1, self.size_class);
                let bloated = self
                    .policy
                    .too_many_overflow(cur.approx_overflow(), self.size_class);
                if overloaded || bloated {
                    // Bucket identities change with the generation; start over.
                    self.start_growth();
                    continue;
                }
            }

            return Probe::Vacant(match hole {
                Some((id, s)) => VacantSlot::Hole(id, s),
                None => VacantSlot::Append(tail),
            });
        }
    }

    /// Write a new entry where `probe_for_insert` said it belongs.
    pub(crate) fn insert_vacant(
        &mut self,
        at: VacantSlot,
        hash: u64,
        key: K,
        value: V,
    ) -> (BucketId, usize) {
        let layout = self.layout;
        let cur = self
            .current
            .as_mut()
            .expect("probe allocated the bucket array");
        debug_assert_eq!(cur.size_class(), self.size_class);
        let (id, s) = match at {
            VacantSlot::Hole(id, s) => (id, s),
            VacantSlot::Append(tail) => (cur.append_overflow(tail), 0),
        };
        cur.bucket_mut(id)
            .put(s, tag::tag_of(hash), Slot::new(key, value, layout));
        self.count += 1;
        (id, s)
    }

    pub(crate) fn remove<Q>(&mut self, hash: u64, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        if self.count == 0 || self.current.is_none() {
            return None;
        }
        let i = self.settle_bucket(hash);
        let t = tag::tag_of(hash);
        let (id, s) = {
            let g = self.current.as_ref()?;
            g.chain(i)
                .find_map(|id| g.bucket(id).find(t, |k| k.borrow() == q).map(|s| (id, s)))?
        };
        self.remove_at(id, s)
    }

    /// Empty a current-generation slot. Holes stay until the next growth.
    pub(crate) fn remove_at(&mut self, id: BucketId, s: usize) -> Option<(K, V)> {
        let slot = self.current.as_mut()?.bucket_mut(id).take(s, tag::EMPTY)?;
        self.count -= 1;
        Some(slot.into_pair())
    }

    pub(crate) fn clear(&mut self) {
        self.previous = None;
        self.growth = None;
        self.evacuated = 0;
        self.count = 0;
        if self.current.is_some() {
            let seed = self.generation_seed();
            self.current = Some(Generation::new(self.size_class, seed));
        }
    }

    pub(crate) fn stats(&self) -> MapStats {
        MapStats {
            len: self.count,
            size_class: self.size_class,
            bucket_count: 1usize << self.size_class,
            approx_overflow_buckets: self.current.as_ref().map_or(0, |g| g.approx_overflow()),
            growth: self.growth,
            evacuation_cursor: self.evacuated,
            doublings: self.doublings,
            same_size_growths: self.same_size_growths,
        }
    }
}

impl<K, V, S> RawTable<K, V, S> {
    pub(crate) fn key_at(&self, id: BucketId, s: usize) -> Option<&K> {
        self.current.as_ref()?.bucket(id).key(s)
    }

    pub(crate) fn value_at(&self, id: BucketId, s: usize) -> Option<&V> {
        self.current.as_ref()?.bucket(id).value(s)
    }

    pub(crate) fn value_at_mut(&mut self, id: BucketId, s: usize) -> Option<&mut V> {
        self.current.as_mut()?.bucket_mut(id).value_mut(s)
    }
}
