use evac_hashmap::{EvacMap, GrowthMode, MapBuilder};
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasherDefault, Hasher};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Hashes a `u64` key to itself, so bucket placement is chosen by the test.
#[derive(Default)]
struct IdentityHasher(u64);
impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}
type Identity = BuildHasherDefault<IdentityHasher>;

/// Smallest `b` with `n <= 6.5 * 2^b`.
fn expected_size_class(n: usize) -> u8 {
    let mut b = 0;
    while n * 2 > 13 << b {
        b += 1;
    }
    b
}

/// Invariant: doubling starts exactly when the count would cross 6.5 x 2^B,
/// and every entry survives the growths.
#[test]
fn sequential_inserts_double_on_load_factor() {
    init_logger();
    let mut m: EvacMap<u64, u64> = EvacMap::new();
    assert_eq!(m.size_class(), 0);

    for k in 0..100u64 {
        let before = m.size_class();
        m.insert(k, k * 3);
        let n = k as usize + 1;
        assert_eq!(m.size_class(), expected_size_class(n), "after {n} inserts");
        if n == 7 {
            assert_eq!((before, m.size_class()), (0, 1), "first growth on the 7th insert");
        }
    }
    let stats = m.stats();
    assert_eq!(stats.doublings(), 4);
    assert_eq!(stats.same_size_growths(), 0);
    assert_eq!(m.len(), 100);
    for k in 0..100u64 {
        assert_eq!(m.get(&k), Some(&(k * 3)));
    }
}

/// Invariant: deletions that leave sparse chains eventually trigger a
/// same-size growth that keeps B and restores the load factor.
#[test]
fn sparse_chains_trigger_same_size_growth() {
    init_logger();
    let mut m: EvacMap<u64, u64, Identity> = EvacMap::with_hasher(Identity::default());
    // Multiples of 4 share bucket 0 at size classes up to 2.
    for i in 0..20u64 {
        m.insert(i * 4, i);
    }
    assert_eq!(m.size_class(), 2);
    for i in 0..15u64 {
        assert_eq!(m.remove(&(i * 4)), Some(i));
    }
    let mut seen_same_size = false;
    for i in 20..40u64 {
        m.insert(i * 4 + 1, i);
        seen_same_size |= m.growth_mode() == Some(GrowthMode::SameSize);
    }
    let stats = m.stats();
    assert!(seen_same_size || stats.same_size_growths() > 0);
    assert_eq!(stats.same_size_growths(), 1);
    assert_eq!(m.size_class(), 2, "same-size growth keeps B");

    // Drain the growth with lookups-by-update, then check the load factor.
    let mut i = 20;
    while m.growth_mode().is_some() {
        m.insert(i * 4 + 1, i);
        i = if i == 39 { 20 } else { i + 1 };
    }
    let (num, den) = m.policy().load_factor();
    assert!(m.len() as u64 * u64::from(den) <= u64::from(num) << m.size_class());

    assert_eq!(m.len(), 25);
    for i in 15..20u64 {
        assert_eq!(m.get(&(i * 4)), Some(&i));
    }
    for i in 20..40u64 {
        assert_eq!(m.get(&(i * 4 + 1)), Some(&i));
    }
}

/// Invariant: iteration during a growth yields every live key exactly once.
#[test]
fn iteration_mid_growth_is_exact() {
    let mut m: EvacMap<u64, u64> = MapBuilder::new().evacuation_scan_limit(1).build();
    let mut k = 0u64;
    while !(m.growth_mode().is_some() && m.size_class() >= 5) {
        m.insert(k, k);
        k += 1;
    }
    // Two removals pay for at most four more of the 16 old buckets.
    let removed = [0u64, 1];
    for j in &removed {
        assert_eq!(m.remove(j), Some(*j));
    }
    let stats = m.stats();
    assert!(stats.is_growing(), "iteration must run against two generations");
    assert!(stats.evacuation_cursor() > 0 && stats.evacuation_cursor() < 16);

    let keys: Vec<u64> = m.keys().copied().collect();
    let unique: BTreeSet<u64> = keys.iter().copied().collect();
    assert_eq!(keys.len(), unique.len(), "no key is yielded twice");
    let expected: BTreeSet<u64> = (0..k).filter(|j| !removed.contains(j)).collect();
    assert_eq!(unique, expected);
    assert_eq!(m.iter().len(), expected.len());

    for v in m.values_mut() {
        *v += 1;
    }
    assert!(m.growth_mode().is_some());
    for j in &expected {
        assert_eq!(m.get(j), Some(&(j + 1)));
    }
}

/// Invariant: removing an absent key is a no-op; a removed key reads as
/// absent immediately.
#[test]
fn remove_semantics() {
    let mut m = EvacMap::new();
    assert_eq!(m.remove(&1), None);
    m.insert(1, "one");
    m.insert(2, "two");
    assert_eq!(m.remove(&3), None);
    assert_eq!(m.len(), 2);
    assert_eq!(m.remove(&1), Some("one"));
    assert_eq!(m.get(&1), None);
    assert!(!m.contains_key(&1));
    assert_eq!(m.remove(&1), None);
    assert_eq!(m.len(), 1);
}

/// Invariant: keys and values above the inline size limit behave like any
/// other, across growth and removal.
#[test]
fn large_keys_and_values() {
    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    struct BigKey([u8; 200], u32);

    let big = |i: u32| BigKey([i as u8; 200], i);
    let mut m: EvacMap<BigKey, [u64; 40]> = EvacMap::new();
    for i in 0..300u32 {
        m.insert(big(i), [u64::from(i); 40]);
    }
    for i in (0..300u32).step_by(2) {
        assert_eq!(m.remove(&big(i)).map(|v| v[39]), Some(u64::from(i)));
    }
    assert_eq!(m.len(), 150);
    for i in 0..300u32 {
        let got = m.get(&big(i)).map(|v| v[0]);
        let want = (i % 2 == 1).then_some(u64::from(i));
        assert_eq!(got, want);
    }
}

/// Invariant: for every key, `get` returns the value of its latest insert
/// not followed by a removal.
#[test]
fn latest_write_wins_against_model() {
    let mut m: EvacMap<u32, u32> = EvacMap::new();
    let mut model = HashMap::new();
    let mut state = 0x2545_f491_u64;
    for step in 0..20_000u32 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let k = ((state >> 33) % 2_000) as u32;
        if (state >> 20) % 4 == 0 {
            assert_eq!(m.remove(&k), model.remove(&k));
        } else {
            assert_eq!(m.insert(k, step), model.insert(k, step));
        }
        assert_eq!(m.len(), model.len());
    }
    for (k, v) in &model {
        assert_eq!(m.get(k), Some(v));
    }
    let collected: HashMap<u32, u32> = m.into_iter().collect();
    assert_eq!(collected, model);
}

#[test]
fn builder_capacity_preallocates() {
    let m: EvacMap<String, u8> = MapBuilder::new().initial_capacity(1_000).build();
    let stats = m.stats();
    assert_eq!(stats.size_class(), 8);
    assert_eq!(stats.bucket_count(), 256);
    assert!(stats.is_empty());
    assert!(!stats.is_growing());
}

#[test]
fn extend_and_collect() {
    let mut m: EvacMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
    m.extend((5..20).map(|i| (i, i * 10)));
    assert_eq!(m.len(), 20);
    assert_eq!(m.get(&4), Some(&4));
    assert_eq!(m.get(&5), Some(&50));
    let total: u32 = (&m).into_iter().map(|(_, v)| *v).sum();
    assert_eq!(total, (0..5).sum::<u32>() + (5..20).map(|i| i * 10).sum::<u32>());
    for (_, v) in &mut m {
        *v = 0;
    }
    assert!(m.values().all(|v| *v == 0));
}
