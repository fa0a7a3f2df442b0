//! Slot tags: one byte per slot caching the top bits of the key's hash.
//!
//! Values below `MIN_TAG` are reserved sentinels. `EMPTY` marks a free slot
//! in any generation; the three `EVACUATED_*` markers only ever appear in a
//! bucket of the previous generation and record where its entry went.

/// Slot holds no entry.
pub(crate) const EMPTY: u8 = 0;
/// Slot was empty (or was compacted away) when its bucket was evacuated.
pub(crate) const EVACUATED_EMPTY: u8 = 1;
/// Entry moved to the same bucket index in the new generation.
pub(crate) const EVACUATED_LOW: u8 = 2;
/// Entry moved to `index + old_bucket_count` in the new generation.
pub(crate) const EVACUATED_HIGH: u8 = 3;
/// Smallest tag value of a live entry.
pub(crate) const MIN_TAG: u8 = 4;

/// Derive the tag stored next to an entry with hash `hash`.
#[inline]
pub(crate) fn tag_of(hash: u64) -> u8 {
    // Top byte, not the bits above the bucket index: a tag never depends on B.
    let top = (hash >> 56) as u8;
    if top < MIN_TAG {
        top + MIN_TAG
    } else {
        top
    }
}

#[inline]
pub(crate) fn is_live(tag: u8) -> bool {
    tag >= MIN_TAG
}

#[inline]
pub(crate) fn is_evacuated(tag: u8) -> bool {
    (EVACUATED_EMPTY..=EVACUATED_HIGH).contains(&tag)
}
