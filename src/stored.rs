//! Inline or boxed storage for keys and values.
//!
//! A table decides once, at construction, whether its keys (and separately
//! its values) live inline in the bucket or behind a `Box`. Every slot of the
//! table then uses the same representation, so evacuating a large entry only
//! moves a pointer.

use core::mem::size_of;

/// Types larger than this many bytes are boxed.
pub(crate) const MAX_INLINE_SIZE: usize = 128;

#[derive(Clone, Debug)]
pub(crate) enum Stored<T> {
    Inline(T),
    Boxed(Box<T>),
}

impl<T> Stored<T> {
    #[inline]
    pub(crate) fn new(value: T, boxed: bool) -> Self {
        if boxed {
            Stored::Boxed(Box::new(value))
        } else {
            Stored::Inline(value)
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> &T {
        match self {
            Stored::Inline(v) => v,
            Stored::Boxed(b) => b,
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self) -> &mut T {
        match self {
            Stored::Inline(v) => v,
            Stored::Boxed(b) => b,
        }
    }

    #[inline]
    pub(crate) fn into_inner(self) -> T {
        match self {
            Stored::Inline(v) => v,
            Stored::Boxed(b) => *b,
        }
    }
}

/// Per-table choice of representation for keys and values.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct SlotLayout {
    pub(crate) boxed_keys: bool,
    pub(crate) boxed_values: bool,
}

impl SlotLayout {
    pub(crate) fn of<K, V>() -> Self {
        Self {
            boxed_keys: size_of::<K>() > MAX_INLINE_SIZE,
            boxed_values: size_of::<V>() > MAX_INLINE_SIZE,
        }
    }
}
