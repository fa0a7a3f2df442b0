use crate::error::ConfigError;
use crate::map::EvacMap;
use crate::policy::GrowthPolicy;

use std::{
    collections::hash_map::RandomState,
    hash::{BuildHasher, Hash},
    marker::PhantomData,
};

/// Builds an [`EvacMap`] with non-default growth tuning.
///
/// # Examples
///
/// ```rust
/// use evac_hashmap::{EvacMap, MapBuilder};
///
/// let mut map: EvacMap<u64, &str> = MapBuilder::new()
///     // Room for 1,000 entries before the first growth.
///     .initial_capacity(1_000)
///     // Double once the table averages 4 entries per bucket.
///     .load_factor(4, 1)
///     .build();
///
/// map.insert(0, "zero");
/// assert_eq!(map.get(&0), Some(&"zero"));
/// ```
///
pub struct MapBuilder<C> {
    initial_capacity: usize,
    policy: GrowthPolicy,
    map_type: PhantomData<C>,
}

impl<K, V> Default for MapBuilder<EvacMap<K, V, RandomState>>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MapBuilder<EvacMap<K, V, RandomState>>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            initial_capacity: 0,
            policy: GrowthPolicy::default(),
            map_type: PhantomData,
        }
    }

    /// Builds an `EvacMap<K, V>`.
    ///
    /// # Panics
    ///
    /// Panics if the configured growth policy is invalid. See
    /// [`GrowthPolicy::validate`] for the rules; use
    /// [`try_build`][Self::try_build] to get the error instead.
    pub fn build(self) -> EvacMap<K, V, RandomState> {
        self.build_with_hasher(RandomState::default())
    }

    pub fn try_build(self) -> Result<EvacMap<K, V, RandomState>, ConfigError> {
        self.try_build_with_hasher(RandomState::default())
    }

    /// Builds an `EvacMap<K, V, S>` with the given `hasher`.
    ///
    /// # Panics
    ///
    /// Panics if the configured growth policy is invalid.
    pub fn build_with_hasher<S>(self, hasher: S) -> EvacMap<K, V, S>
    where
        S: BuildHasher,
    {
        match self.try_build_with_hasher(hasher) {
            Ok(map) => map,
            Err(e) => panic!("invalid map configuration: {e}"),
        }
    }

    pub fn try_build_with_hasher<S>(self, hasher: S) -> Result<EvacMap<K, V, S>, ConfigError>
    where
        S: BuildHasher,
    {
        self.policy.validate()?;
        Ok(EvacMap::with_policy(
            self.initial_capacity,
            hasher,
            self.policy,
        ))
    }
}

impl<C> MapBuilder<C> {
    /// Sets how many entries the map should hold before its first growth.
    /// A non-zero capacity allocates the bucket array at build time.
    pub fn initial_capacity(self, capacity: usize) -> Self {
        Self {
            initial_capacity: capacity,
            ..self
        }
    }

    /// Sets the average entries per bucket, `num/den`, above which the map
    /// doubles. Must lie between 1 and the bucket capacity.
    pub fn load_factor(self, num: u32, den: u32) -> Self {
        Self {
            policy: self.policy.with_load_factor(num, den),
            ..self
        }
    }

    /// Sets the size class past which the overflow-bucket limit stops
    /// scaling with the table. Must lie in `1..=15`.
    pub fn overflow_cap_shift(self, shift: u8) -> Self {
        Self {
            policy: self.policy.with_overflow_cap_shift(shift),
            ..self
        }
    }

    /// Sets how many already-evacuated buckets one cursor pass may skip.
    pub fn evacuation_scan_limit(self, limit: usize) -> Self {
        Self {
            policy: self.policy.with_evacuation_scan_limit(limit),
            ..self
        }
    }

    /// Replaces every tuning knob at once.
    pub fn growth_policy(self, policy: GrowthPolicy) -> Self {
        Self { policy, ..self }
    }
}
