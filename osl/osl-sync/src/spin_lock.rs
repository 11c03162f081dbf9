use crate::RawFlag;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

/// Guard-based spin lock over a [`RawFlag`].
///
/// The same one-word state machine that backs the interpreter's lock
/// handles also serves the layer's own critical sections; this wrapper
/// adds the data and the RAII guard.
pub struct SpinLock<T> {
    flag: RawFlag,
    inner: UnsafeCell<T>,
}

// Safety: the flag provides mutual exclusion; only T: Send may cross contexts.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            flag: RawFlag::new(),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Spin until acquired, then return a guard.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.flag.acquire();
        SpinLockGuard { lock: self }
    }

    /// Try once; returns immediately.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        if self.flag.try_acquire() {
            Some(SpinLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Closure convenience, built on the guard.
    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        // Safety: the guard's existence proves this context holds the flag.
        unsafe { self.lock.flag.release() };
    }
}
