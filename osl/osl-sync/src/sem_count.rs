use core::hint::spin_loop;
use core::sync::atomic::{AtomicUsize, Ordering};

/// One-word counting-semaphore state machine.
///
/// Holds the number of currently available units. Taking units is a
/// compare-and-swap loop that fails without side effect when the count
/// is short; giving units back is bounded by a caller-supplied ceiling.
/// The ceiling lives with the handle, not in the word: the word is
/// exactly the count, as the service contract requires.
#[repr(transparent)]
pub struct SemCount(AtomicUsize);

impl SemCount {
    #[must_use]
    pub const fn new(initial: usize) -> Self {
        Self(AtomicUsize::new(initial))
    }

    /// Currently available units.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Take `units` if they are all available; `false` (and no change)
    /// otherwise.
    pub fn try_take(&self, units: usize) -> bool {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let Some(next) = current.checked_sub(units) else {
                return false;
            };
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Block until `units` are taken or `expired` reports the deadline
    /// has passed. Returns whether the units were taken.
    ///
    /// The deadline predicate is sampled between acquisition attempts;
    /// a predicate that never fires blocks forever.
    pub fn take_until(&self, units: usize, mut expired: impl FnMut() -> bool) -> bool {
        loop {
            if self.try_take(units) {
                return true;
            }
            if expired() {
                return false;
            }
            spin_loop();
        }
    }

    /// Return `units` to the count, refusing to pass `ceiling`.
    ///
    /// On success the new count is returned; `None` means the signal
    /// would overshoot (or overflow) and the count is unchanged.
    pub fn give(&self, units: usize, ceiling: usize) -> Option<usize> {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = current.checked_add(units)?;
            if next > ceiling {
                return None;
            }
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return Some(next),
                Err(observed) => current = observed,
            }
        }
    }
}
