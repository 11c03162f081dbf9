//! Interpreter-facing synchronization handles.
//!
//! A handle is an opaque capability over a single word of allocator
//! memory holding the primitive's state: `0`/`1` for a lock, the
//! available-unit count for a semaphore. The word is initialized by the
//! factory on [`crate::OsServices`] and viewed through the atomic state
//! machines of `osl-sync`, so every transition is a real
//! read-modify-write rather than a plain store.
//!
//! Handles are deliberately not `Clone`: deletion consumes the handle,
//! which retires the use-after-delete hazard at the type level.

use core::ptr::NonNull;
use osl_sync::{RawFlag, SemCount};

/// Capability over one lock word.
#[derive(Debug)]
pub struct LockHandle {
    word: NonNull<RawFlag>,
}

// Safety: the word is an atomic; the handle is just the address of it.
unsafe impl Send for LockHandle {}
unsafe impl Sync for LockHandle {}

impl LockHandle {
    pub(crate) const fn new(word: NonNull<RawFlag>) -> Self {
        Self { word }
    }

    pub(crate) fn flag(&self) -> &RawFlag {
        // Safety: the word lives until delete_lock consumes the handle.
        unsafe { self.word.as_ref() }
    }

    pub(crate) const fn into_word(self) -> NonNull<RawFlag> {
        self.word
    }
}

/// Capability over one semaphore word, plus the unit ceiling the
/// creating call established.
#[derive(Debug)]
pub struct SemaphoreHandle {
    word: NonNull<SemCount>,
    max_units: usize,
}

// Safety: as for LockHandle.
unsafe impl Send for SemaphoreHandle {}
unsafe impl Sync for SemaphoreHandle {}

impl SemaphoreHandle {
    pub(crate) const fn new(word: NonNull<SemCount>, max_units: usize) -> Self {
        Self { word, max_units }
    }

    pub(crate) fn counter(&self) -> &SemCount {
        // Safety: the word lives until delete_semaphore consumes the handle.
        unsafe { self.word.as_ref() }
    }

    pub(crate) const fn max_units(&self) -> usize {
        self.max_units
    }

    pub(crate) const fn into_word(self) -> NonNull<SemCount> {
        self.word
    }
}
