//! evac-hashmap: an open-hashing map that grows one bucket at a time.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a general-purpose hash map whose worst-case insert never rehashes
//!   the whole table. Growth allocates a new bucket array and migrates
//!   ("evacuates") old buckets incrementally, piggybacked on later writes.
//! - Layers:
//!   - Bucket / Generation: fixed 8-slot buckets with a one-byte tag per
//!     slot, chained through overflow buckets. A generation is one bucket
//!     array of 2^B chains plus the overflow buckets hanging off it, all
//!     held in a `slotmap` arena.
//!   - RawTable<K, V, S>: the table header (count, B, growth state, current
//!     and previous generation) and the lookup, insert, remove and growth
//!     engine. It never guards itself.
//!   - EvacMap<K, V, S>: public API. Wraps the raw table with a write flag
//!     that detects unsynchronized concurrent use.
//!
//! Tags
//! - Each slot carries the top byte of its key's hash, bumped past the
//!   reserved sentinel values. Sentinels describe empty slots and, in a
//!   generation being evacuated, where each migrated entry went (low or high
//!   half after a doubling, or simply "gone").
//! - A lookup compares tags before keys, so most non-matching slots are
//!   rejected without calling `K: Eq`.
//!
//! Growth
//! - Two triggers, checked only when an insert would add a new key:
//!   - load factor: the new count would exceed 6.5 entries per bucket
//!     (configurable); the table doubles.
//!   - overflow bloat: the current generation holds too many overflow
//!     buckets for its size; the table is rebuilt at the same size, which
//!     compacts chains left sparse by deletions.
//! - While growing, every insert or remove first evacuates the old bucket it
//!   maps to, then one more bucket at the evacuation cursor. Growth ends
//!   when the cursor passes the last old bucket, and the old generation is
//!   dropped in one piece.
//! - Reads never migrate. A lookup whose old bucket is not yet evacuated
//!   searches the old generation instead of the new one.
//!
//! Concurrency
//! - No locking. Writes raise a per-map flag; a write that finds the flag
//!   already raised, or a read that observes it raised, aborts the process
//!   (`WriteFlag`). In safe Rust the borrow checker already rules this out
//!   for a single map value; the flag catches misuse through unsafe sharing.
//!
//! Storage
//! - Keys and values larger than 128 bytes are boxed so buckets keep a
//!   bounded footprint; smaller ones are stored inline.
//!
//! Notes and non-goals
//! - Iteration order is unspecified, and there is no iteration-during-
//!   mutation story: the borrow checker forbids it.
//! - The map never shrinks; `clear` keeps the current bucket count.

mod bucket;
mod builder;
mod entry;
mod error;
mod generation;
mod growth;
mod iter;
mod map;
mod map_proptest;
mod overflow;
mod policy;
mod raw;
mod stats;
mod stored;
mod tag;
mod write_flag;

// Public surface
pub use bucket::BUCKET_CAPACITY;
pub use builder::MapBuilder;
pub use entry::{Entry, OccupiedEntry, VacantEntry};
pub use error::ConfigError;
pub use growth::GrowthMode;
pub use iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
pub use map::EvacMap;
pub use policy::GrowthPolicy;
pub use stats::MapStats;
pub use write_flag::{WriteConflict, WriteFlag, WriteGuard};
