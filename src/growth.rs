//! Growth engine: starting a new generation and evacuating the old one
//! bucket by bucket.
//!
//! A growth never moves the whole table at once. Each mutating operation
//! pays for at most two bucket evacuations (the bucket it touches and the
//! one under the cursor), so the cost of a resize is spread over the
//! operations that follow it.

use crate::bucket::{BucketId, Slot, BUCKET_CAPACITY};
use crate::generation::Generation;
use crate::raw::RawTable;
use crate::tag;
use crate::write_flag::fatal;
use core::hash::{BuildHasher, Hash};

/// Kind of growth in progress.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GrowthMode {
    /// Bucket count doubles; each old bucket splits into a low and a high half.
    Doubling,
    /// Bucket count stays; chains are compacted to shed overflow buckets.
    SameSize,
}

/// Next free slot of one destination chain in the new generation.
struct Dest {
    bucket: BucketId,
    slot: usize,
}

impl Dest {
    fn new(head: BucketId) -> Self {
        Self {
            bucket: head,
            slot: 0,
        }
    }

    fn push<K, V>(&mut self, g: &mut Generation<K, V>, t: u8, entry: Slot<K, V>) {
        loop {
            if self.slot == BUCKET_CAPACITY {
                self.bucket = match g.bucket(self.bucket).overflow {
                    Some(next) => next,
                    None => g.append_overflow(self.bucket),
                };
                self.slot = 0;
            }
            if g.bucket(self.bucket).tags[self.slot] == tag::EMPTY {
                break;
            }
            self.slot += 1;
        }
        g.bucket_mut(self.bucket).put(self.slot, t, entry);
        self.slot += 1;
    }
}

impl<K, V, S> RawTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Move the current generation to "previous" and allocate its successor.
    ///
    /// Doubling wins when the next insertion would overload the table;
    /// otherwise the growth only compacts overflow chains.
    pub(crate) fn start_growth(&mut self) {
        debug_assert!(self.growth.is_none());
        let old_class = self.size_class;
        let mode = if self.policy.over_load_factor(self.count + 1, old_class) {
            GrowthMode::Doubling
        } else {
            GrowthMode::SameSize
        };
        let new_class = match mode {
            GrowthMode::Doubling => old_class + 1,
            GrowthMode::SameSize => old_class,
        };
        let seed = self.generation_seed();
        self.previous = self.current.replace(Generation::new(new_class, seed));
        self.size_class = new_class;
        self.evacuated = 0;
        self.growth = Some(mode);
        match mode {
            GrowthMode::Doubling => self.doublings += 1,
            GrowthMode::SameSize => self.same_size_growths += 1,
        }
        log::debug!(
            "starting {:?} growth: size class {} -> {}, {} entries",
            mode,
            old_class,
            new_class,
            self.count
        );
    }

    /// Pay the migration owed before touching current bucket `i`.
    pub(crate) fn grow_work(&mut self, i: usize) {
        let Some(prev) = self.previous.as_ref() else {
            return;
        };
        let old = i & (prev.bucket_count() - 1);
        self.evacuate(old);
        if self.is_growing() {
            self.evacuate(self.evacuated);
        }
    }

    /// Migrate every live entry of previous-generation chain `old`.
    fn evacuate(&mut self, old: usize) {
        let RawTable {
            hasher,
            previous,
            current,
            growth,
            ..
        } = &mut *self;
        let (Some(prev), Some(cur), Some(mode)) = (previous.as_mut(), current.as_mut(), *growth)
        else {
            return;
        };
        let old_count = prev.bucket_count();

        if !prev.is_evacuated(old) {
            let mut low = Dest::new(cur.head(old));
            let mut high = match mode {
                GrowthMode::Doubling => Some(Dest::new(cur.head(old + old_count))),
                GrowthMode::SameSize => None,
            };
            let mut moved = 0usize;
            let mut next = Some(prev.head(old));
            while let Some(id) = next {
                let b = prev.bucket_mut(id);
                next = b.overflow;
                for s in 0..BUCKET_CAPACITY {
                    let t = b.tags[s];
                    if t == tag::EMPTY {
                        b.tags[s] = tag::EVACUATED_EMPTY;
                        continue;
                    }
                    if !tag::is_live(t) {
                        fatal("bad map state: migration marker in unevacuated bucket");
                    }
                    let Some(entry) = b.take(s, tag::EVACUATED_EMPTY) else {
                        fatal("bad map state: live tag without entry");
                    };
                    // The bit just above the old mask picks the half.
                    let dest = match high.as_mut() {
                        Some(h) if hasher.hash_one(entry.key.get()) & old_count as u64 != 0 => {
                            b.tags[s] = tag::EVACUATED_HIGH;
                            h
                        }
                        Some(_) => {
                            b.tags[s] = tag::EVACUATED_LOW;
                            &mut low
                        }
                        None => &mut low,
                    };
                    dest.push(cur, t, entry);
                    moved += 1;
                }
            }
            debug_assert_eq!(prev.bucket(prev.head(old)).live_count(), 0);
            let released = prev.release_overflow(old);
            log::trace!(
                "evacuated bucket {}/{}: {} entries moved, {} overflow buckets released",
                old,
                old_count,
                moved,
                released
            );
        }

        if old == self.evacuated {
            self.advance_evacuation_mark(old_count);
        }
    }

    /// Move the cursor past evacuated buckets, scanning at most the policy's
    /// limit, and finish the growth once every old bucket is done.
    fn advance_evacuation_mark(&mut self, old_count: usize) {
        self.evacuated += 1;
        let stop = self
            .evacuated
            .saturating_add(self.policy.evacuation_scan_limit())
            .min(old_count);
        if let Some(prev) = self.previous.as_ref() {
            while self.evacuated != stop && prev.is_evacuated(self.evacuated) {
                self.evacuated += 1;
            }
        }
        if self.evacuated == old_count {
            self.finish_growth(old_count);
        }
    }

    /// Drop the old generation. Entries added while a same-size growth (or
    /// a doubling) was in flight were never checked against the load
    /// factor, so an overloaded table starts doubling straight away.
    fn finish_growth(&mut self, old_count: usize) {
        self.previous = None;
        self.evacuated = 0;
        if let Some(mode) = self.growth.take() {
            log::debug!(
                "{:?} growth complete: {} buckets evacuated, size class {}",
                mode,
                old_count,
                self.size_class
            );
        }
        if self.policy.over_load_factor(self.count, self.size_class) {
            self.start_growth();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::Iter;
    use crate::policy::GrowthPolicy;
    use crate::raw::Probe;
    use core::hash::BuildHasherDefault;
    use std::collections::hash_map::RandomState;
    use std::hash::Hasher;

    #[derive(Default)]
    struct IdentityHasher(u64);
    impl Hasher for IdentityHasher {
        fn write(&mut self, _bytes: &[u8]) {
            unimplemented!("identity hasher only takes u64 keys")
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }
    type Identity = BuildHasherDefault<IdentityHasher>;

    fn put<S: BuildHasher>(t: &mut RawTable<u64, u64, S>, k: u64, v: u64) {
        let h = t.make_hash(&k);
        match t.probe_for_insert(h, &k) {
            Probe::Found(id, s) => *t.value_at_mut(id, s).unwrap() = v,
            Probe::Vacant(at) => {
                t.insert_vacant(at, h, k, v);
            }
        }
    }

    fn get<S: BuildHasher>(t: &RawTable<u64, u64, S>, k: u64) -> Option<u64> {
        t.find(t.make_hash(&k), &k).map(|(_, v)| *v)
    }

    fn identity_table() -> RawTable<u64, u64, Identity> {
        RawTable::new(0, Identity::default(), GrowthPolicy::default())
    }

    #[test]
    fn doubling_splits_on_old_mask_bit() {
        let mut t = identity_table();
        // Keys 0..6 fill the single bucket of size class 0.
        for k in 0..6 {
            put(&mut t, k, k * 10);
        }
        assert_eq!(t.size_class, 0);
        // Seventh key doubles and, on retry, evacuates the only old bucket.
        put(&mut t, 6, 60);
        assert_eq!(t.size_class, 1);
        assert!(!t.is_growing(), "single old bucket evacuates in one step");
        assert_eq!(t.doublings, 1);

        let g = t.current.as_ref().unwrap();
        let keys = |i: usize| -> Vec<u64> {
            g.chain(i)
                .flat_map(|id| {
                    let b = g.bucket(id);
                    (0..BUCKET_CAPACITY).filter_map(move |s| b.key(s).copied())
                })
                .collect()
        };
        let (low, high) = (keys(0), keys(1));
        assert!(low.iter().all(|k| k % 2 == 0));
        assert!(high.iter().all(|k| k % 2 == 1));
        assert_eq!(low.len() + high.len(), 7);
    }

    #[test]
    fn partially_evacuated_table_serves_reads_from_both_generations() {
        // A 32-bucket old generation takes many operations to drain.
        let mut t: RawTable<u64, u64, RandomState> =
            RawTable::new(0, RandomState::new(), GrowthPolicy::default());
        let mut k = 0u64;
        // Fill until a growth is caught in progress.
        while !(t.is_growing() && t.size_class >= 6) {
            put(&mut t, k, k + 1);
            k += 1;
        }
        let prev = t.previous.as_ref().unwrap();
        let evacuated = (0..prev.bucket_count()).filter(|&i| prev.is_evacuated(i)).count();
        assert!(evacuated < prev.bucket_count());
        for j in 0..k {
            assert_eq!(get(&t, j), Some(j + 1), "key {j} lost mid-growth");
        }
        assert_eq!(t.len() as u64, k);
    }

    #[test]
    fn growth_completes_and_releases_previous_generation() {
        let mut t: RawTable<u64, u64, RandomState> =
            RawTable::new(0, RandomState::new(), GrowthPolicy::default());
        for k in 0..1000 {
            put(&mut t, k, k);
        }
        // Keep updating existing keys until any growth in flight drains.
        let mut k = 0;
        while t.is_growing() {
            put(&mut t, k % 1000, k % 1000);
            k += 1;
        }
        assert!(t.previous.is_none());
        assert_eq!(t.evacuated, 0);
        let (num, den) = t.policy.load_factor();
        assert!(t.len() as u64 * u64::from(den) <= u64::from(num) << t.size_class);
        for k in 0..1000 {
            assert_eq!(get(&t, k), Some(k));
        }
    }

    #[test]
    fn same_size_growth_compacts_sparse_chains() {
        let mut t = identity_table();
        // 20 keys all in bucket 0 at every size class up to 2.
        for i in 0..20u64 {
            put(&mut t, i * 4, i);
        }
        assert_eq!(t.size_class, 2);
        assert!(!t.is_growing());
        // Hollow out bucket 0's chain.
        for i in 0..15u64 {
            let h = t.make_hash(&(i * 4));
            assert_eq!(t.remove(h, &(i * 4)).map(|(_, v)| v), Some(i));
        }
        // Now chain bucket 1 until the overflow count hits the bucket count.
        for i in 20..40u64 {
            put(&mut t, i * 4 + 1, i);
        }
        assert_eq!(t.same_size_growths, 1);
        assert_eq!(t.doublings, 2);
        assert_eq!(t.size_class, 2);
        for i in 15..20u64 {
            assert_eq!(get(&t, i * 4), Some(i));
        }
        for i in 20..40u64 {
            assert_eq!(get(&t, i * 4 + 1), Some(i));
        }
    }

    /// Keys 0..10 in a two-bucket identity table: evens in bucket 0,
    /// odds in bucket 1.
    fn two_bucket_table() -> RawTable<u64, u64, Identity> {
        let mut t = identity_table();
        for k in 0..10 {
            put(&mut t, k, k);
        }
        assert_eq!(t.size_class, 1);
        assert!(!t.is_growing());
        t
    }

    fn tags_of(g: &Generation<u64, u64>, i: usize) -> Vec<u8> {
        g.chain(i).flat_map(|id| g.bucket(id).tags).collect()
    }

    #[test]
    fn doubling_marks_low_and_high_halves() {
        let mut t = two_bucket_table();
        // A tighter load factor makes the next insertion overload the table.
        t.policy = t.policy.with_load_factor(5, 1);
        t.start_growth();
        assert_eq!(t.growth, Some(GrowthMode::Doubling));
        assert_eq!(t.size_class, 2);

        // Old bucket 1 holds 1, 3, 5, 7, 9; bit 1 sends 3 and 7 high.
        t.evacuate(1);
        let prev = t.previous.as_ref().unwrap();
        let tags = tags_of(prev, 1);
        assert_eq!(tags.iter().filter(|&&x| x == tag::EVACUATED_LOW).count(), 3);
        assert_eq!(tags.iter().filter(|&&x| x == tag::EVACUATED_HIGH).count(), 2);
        assert_eq!(tags.iter().filter(|&&x| x == tag::EVACUATED_EMPTY).count(), 3);
        assert!(prev.is_evacuated(1));
        assert!(!prev.is_evacuated(0));

        // The cursor has not moved: bucket 0 is still owed.
        assert_eq!(t.evacuated, 0);
        assert!(t.is_growing());

        // Reads reach both the migrated and the unmigrated half.
        for k in 0..10 {
            assert_eq!(get(&t, k), Some(k));
        }

        t.evacuate(0);
        assert!(!t.is_growing(), "cursor skips the already evacuated bucket");
        assert!(t.previous.is_none());
        for k in 0..10 {
            assert_eq!(get(&t, k), Some(k));
        }
    }

    #[test]
    fn same_size_growth_marks_everything_empty_and_compacts() {
        let mut t = two_bucket_table();
        // Punch holes into bucket 1 before the growth.
        for k in [1u64, 5] {
            let h = t.make_hash(&k);
            assert!(t.remove(h, &k).is_some());
        }
        t.start_growth();
        assert_eq!(t.growth, Some(GrowthMode::SameSize));
        assert_eq!(t.size_class, 1);

        t.evacuate(1);
        let prev = t.previous.as_ref().unwrap();
        assert!(tags_of(prev, 1).iter().all(|&x| x == tag::EVACUATED_EMPTY));

        // Survivors 3, 7, 9 sit contiguously at the front of the new bucket.
        let cur = t.current.as_ref().unwrap();
        let head = cur.bucket(cur.head(1));
        assert_eq!(head.live_count(), 3);
        assert!((0..3).all(|s| head.key(s).is_some()));
        assert_eq!(head.first_empty(), Some(3));
    }

    fn within_load_factor<S: BuildHasher>(t: &RawTable<u64, u64, S>) -> bool {
        let (num, den) = t.policy.load_factor();
        t.len() as u64 * u64::from(den) <= u64::from(num) << t.size_class
    }

    /// Invariant: a growth never ends with the table idle and over the load
    /// factor, even when an update of an existing key is what finishes it.
    #[test]
    fn same_size_growth_that_ends_overloaded_starts_doubling() {
        let mut t = identity_table();
        // 25 keys spread over four buckets; 26 is the limit at size class 2.
        for k in 10..35u64 {
            put(&mut t, k, k);
        }
        assert_eq!(t.size_class, 2);
        assert!(!t.is_growing());
        assert!(within_load_factor(&t));

        t.start_growth();
        assert_eq!(t.growth, Some(GrowthMode::SameSize));

        // New keys land while the growth runs; no trigger is checked then.
        put(&mut t, 2, 2);
        put(&mut t, 6, 6);
        assert_eq!(t.len(), 27);
        assert!(!within_load_factor(&t));

        // Updates of an existing key pay off the rest of the growth.
        while t.growth == Some(GrowthMode::SameSize) {
            put(&mut t, 2, 20);
        }
        assert!(t.is_growing(), "overloaded table must not be left idle");
        assert_eq!(t.growth, Some(GrowthMode::Doubling));
        assert_eq!(t.size_class, 3);

        while t.is_growing() {
            put(&mut t, 2, 20);
        }
        assert!(within_load_factor(&t));
        assert_eq!(get(&t, 2), Some(20));
        assert_eq!(get(&t, 6), Some(6));
        for k in 10..35u64 {
            assert_eq!(get(&t, k), Some(k));
        }
    }

    #[test]
    fn removal_that_finishes_growth_rechecks_load_factor() {
        let mut t = identity_table();
        for k in 10..35u64 {
            put(&mut t, k, k);
        }
        t.start_growth();
        for k in [2u64, 6] {
            put(&mut t, k, k);
        }
        assert!(!within_load_factor(&t));
        // Removing an absent key still pays growth work.
        while t.growth == Some(GrowthMode::SameSize) {
            let h = t.make_hash(&999u64);
            assert!(t.remove(h, &999).is_none());
        }
        assert_eq!(t.growth, Some(GrowthMode::Doubling));
        while t.is_growing() {
            let h = t.make_hash(&999u64);
            t.remove(h, &999);
        }
        assert!(within_load_factor(&t));
        for k in (10..35u64).chain([2, 6]) {
            assert_eq!(get(&t, k), Some(k));
        }
    }

    /// Invariant: iterating mid-growth yields migrated entries from the new
    /// generation and unmigrated ones from the old, each exactly once.
    #[test]
    fn iteration_after_partial_evacuation_sees_each_entry_once() {
        let mut t = two_bucket_table();
        t.policy = t.policy.with_load_factor(5, 1);
        t.start_growth();
        t.evacuate(1);
        assert!(t.is_growing());

        let prev = t.previous.as_ref().unwrap();
        assert!(prev.is_evacuated(1) && !prev.is_evacuated(0));

        let it = Iter::new(t.current.as_ref(), t.previous.as_ref(), t.count);
        assert_eq!(it.len(), 10);
        let mut keys: Vec<u64> = it
            .map(|(k, v)| {
                assert_eq!(k, v);
                *k
            })
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..10).collect::<Vec<_>>());
    }
}
