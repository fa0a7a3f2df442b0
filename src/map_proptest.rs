#![cfg(test)]

// Property tests for EvacMap kept inside the crate so they can inspect the
// raw table's growth state between operations.

use crate::entry::Entry;
use crate::map::EvacMap;
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys and
// shorter pools.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertWith(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

// Pools of up to 200 keys push the map through several doublings; removals
// leave holes that later inserts refill.
fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,6}", 1..=200).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertWith(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,6}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
        ];
        let ops = prop_oneof![
            50 => op,
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(ops, 1..400).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `insert` returns the previous value exactly when the model had one.
// - `entry(..).or_insert_with` runs its default only for absent keys.
// - `get`/`contains_key` parity, including borrowed `&str` lookups, while a
//   growth is in flight.
// - `remove` returns the model's value and absent keys are a no-op.
// - `iter` yields each live entry exactly once; `len` matches the model.
// - Once no growth is in flight there is no previous generation.
fn run_state_machine<S: BuildHasher>(
    mut sut: EvacMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let default_calls = Cell::new(0);

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.insert(k.clone(), v), model.insert(k, v));
            }
            OpI::InsertWith(i, v) => {
                let k = key_from(pool, i);
                let already = model.get(&k).copied();
                let before = default_calls.get();
                let got = *sut.entry(k.clone()).or_insert_with(|| {
                    default_calls.set(default_calls.get() + 1);
                    v
                });
                match already {
                    Some(old) => {
                        prop_assert_eq!(got, old);
                        prop_assert_eq!(default_calls.get(), before, "default must not run on present key");
                    }
                    None => {
                        prop_assert_eq!(got, v);
                        prop_assert_eq!(default_calls.get(), before + 1, "default must run exactly once");
                        model.insert(k, v);
                    }
                }
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                prop_assert!(sut.get(&k).is_none());
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                if let Some((sk, _)) = sut.get_key_value(&k) {
                    prop_assert_eq!(sk, &k);
                }
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                match (sut.get_mut(&k), model.get_mut(&k)) {
                    (Some(sv), Some(mv)) => {
                        *sv = sv.saturating_add(d);
                        *mv = mv.saturating_add(d);
                    }
                    (None, None) => {}
                    (s, m) => prop_assert!(false, "presence mismatch: {:?} vs {:?}", s, m),
                }
            }
            OpI::Iterate => {
                let s_keys: Vec<_> = sut.keys().cloned().collect();
                let unique: BTreeSet<_> = s_keys.iter().cloned().collect();
                prop_assert_eq!(s_keys.len(), unique.len(), "iteration repeated a key");
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(unique, m_keys);
                for (k, v) in sut.iter() {
                    prop_assert_eq!(Some(v), model.get(k));
                }
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.growth_mode().is_some(), sut.table.previous.is_some());
        if sut.growth_mode().is_none() {
            let (num, den) = sut.policy().load_factor();
            prop_assert!(
                sut.len() as u64 * u64::from(den) <= u64::from(num) << sut.size_class(),
                "idle map over its load factor: {} entries at B={}",
                sut.len(),
                sut.size_class()
            );
        }
    }

    // Drain through the owning iterator as a final cross-check.
    let drained: HashMap<Key, i32> = sut.into_iter().collect();
    prop_assert_eq!(drained, model);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(EvacMap::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key shares one chain and
// one tag, so lookups fall back to key equality throughout.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(EvacMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}

// Entry handles stay usable across the growth they may have triggered.
proptest! {
    #[test]
    fn prop_entry_insert_survives_growth(n in 1usize..300) {
        let mut m: EvacMap<usize, usize> = EvacMap::new();
        for i in 0..n {
            match m.entry(i) {
                Entry::Vacant(e) => { *e.insert(i) += 1; }
                Entry::Occupied(_) => prop_assert!(false, "{} inserted twice", i),
            }
        }
        for i in 0..n {
            prop_assert_eq!(m.get(&i), Some(&(i + 1)));
        }
        prop_assert_eq!(m.len(), n);
    }
}
