//! # Synchronization primitives for the services layer
//!
//! The interpreter-facing lock and semaphore services are emulated over
//! single machine words. This crate holds the word-level state machines
//! ([`RawFlag`] for the 0/1 lock word, [`SemCount`] for the
//! available-unit counter) plus a guard-based [`SpinLock`] built over
//! `RawFlag` that the adapters use for their own critical sections.
//!
//! Every transition is an atomic read-modify-write; the words stay
//! sound when the services object is shared across execution contexts,
//! not just under a cooperative single-threaded host.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod raw_flag;
mod sem_count;
mod spin_lock;

pub use raw_flag::RawFlag;
pub use sem_count::SemCount;
pub use spin_lock::{SpinLock, SpinLockGuard};

/// How long a semaphore wait may block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Timeout {
    /// Fail immediately if the units are not available.
    DontWait,
    /// Block up to this many milliseconds.
    Millis(u16),
    /// Block until the units become available.
    Forever,
}

impl Timeout {
    /// Interpreter wire encoding: `0` never waits, `0xFFFF` waits
    /// forever, anything else is a millisecond bound.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Self::DontWait,
            u16::MAX => Self::Forever,
            ms => Self::Millis(ms),
        }
    }
}
