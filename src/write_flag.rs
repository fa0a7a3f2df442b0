//! Write-in-progress flag.
//!
//! The map does no locking. Every mutating operation raises this flag on
//! entry and lowers it on exit; seeing it already raised, or finding it
//! lowered by someone else at exit, means two threads mutated the map
//! without synchronization. Internal links may already be corrupted at
//! that point, so the process aborts rather than unwinding.

use core::sync::atomic::{AtomicBool, Ordering};

/// Per-map write flag. Guard mutating entry-points with
/// `let _g = self.write_flag.enter();`.
#[derive(Debug, Default)]
pub struct WriteFlag {
    writing: AtomicBool,
}

/// Returned by [`WriteFlag::try_enter`] when a write is already in progress.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WriteConflict;

impl WriteFlag {
    pub const fn new() -> Self {
        Self {
            writing: AtomicBool::new(false),
        }
    }

    /// Raise the flag. Aborts the process if it is already raised.
    #[inline]
    pub fn enter(&self) -> WriteGuard<'_> {
        match self.try_enter() {
            Ok(g) => g,
            Err(WriteConflict) => fatal("concurrent map writes"),
        }
    }

    /// Raise the flag, reporting a conflict instead of aborting.
    #[inline]
    pub fn try_enter(&self) -> Result<WriteGuard<'_>, WriteConflict> {
        if self.writing.swap(true, Ordering::Acquire) {
            return Err(WriteConflict);
        }
        Ok(WriteGuard { owner: self })
    }

    /// Abort if a write is in progress; used on read paths.
    #[inline]
    pub fn check_read(&self) {
        if self.is_writing() {
            fatal("concurrent map read and map write");
        }
    }

    #[inline]
    pub fn is_writing(&self) -> bool {
        self.writing.load(Ordering::Relaxed)
    }
}

/// RAII guard returned by `WriteFlag::enter`.
pub struct WriteGuard<'a> {
    owner: &'a WriteFlag,
}

impl<'a> Drop for WriteGuard<'a> {
    fn drop(&mut self) {
        if !self.owner.writing.swap(false, Ordering::Release) {
            fatal("concurrent map writes");
        }
    }
}

/// Report an unrecoverable map corruption and abort.
#[cold]
pub(crate) fn fatal(msg: &str) -> ! {
    log::error!("fatal error: {msg}");
    eprintln!("fatal error: {msg}");
    std::process::abort()
}
