use core::hint::spin_loop;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Lock word value: free.
const UNLOCKED: usize = 0;
/// Lock word value: held.
const LOCKED: usize = 1;

/// One-word lock state machine.
///
/// `#[repr(transparent)]` over a single [`AtomicUsize`], so a word
/// handed out by the allocator can be initialized in place and viewed
/// as a `RawFlag`. The word encoding is part of the service contract:
/// `0` unlocked, `1` locked.
#[repr(transparent)]
pub struct RawFlag(AtomicUsize);

impl Default for RawFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl RawFlag {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicUsize::new(UNLOCKED))
    }

    /// Spin until the flag is taken (TATAS: swap once, then spin on
    /// cheap loads before retrying the swap).
    #[inline]
    pub fn acquire(&self) {
        while self.0.swap(LOCKED, Ordering::Acquire) == LOCKED {
            while self.0.load(Ordering::Relaxed) == LOCKED {
                spin_loop();
            }
        }
    }

    /// Try once; `true` if the flag was free and is now held.
    #[inline]
    pub fn try_acquire(&self) -> bool {
        self.0.swap(LOCKED, Ordering::Acquire) == UNLOCKED
    }

    /// Release the flag.
    ///
    /// # Safety
    /// The caller must hold the flag; releasing a flag held elsewhere
    /// breaks the exclusion every holder relies on.
    #[inline]
    pub unsafe fn release(&self) {
        self.0.store(UNLOCKED, Ordering::Release);
    }

    /// Current state, without synchronization.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.0.load(Ordering::Relaxed) == LOCKED
    }
}
