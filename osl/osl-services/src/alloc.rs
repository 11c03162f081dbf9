//! Allocator adapter.
//!
//! Forwards allocation to the host allocator with the alignment fixed
//! at the platform word width (4 bytes on 32-bit targets, 8 bytes on
//! 64-bit targets) and passes allocation failure through unchanged.
//! The one-word synchronization handles are carved out of the same
//! allocator via [`AllocAdapter::allocate_word`].

use crate::host::HostAlloc;
use core::ptr::NonNull;

/// Alignment applied to every forwarded allocation.
pub const WORD_ALIGN: usize = align_of::<usize>();

pub struct AllocAdapter<A> {
    host: A,
}

impl<A: HostAlloc> AllocAdapter<A> {
    pub const fn new(host: A) -> Self {
        Self { host }
    }

    /// Allocate `size` bytes, word aligned. `None` passes the host's
    /// exhaustion through.
    #[inline]
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.host.allocate(size, WORD_ALIGN)
    }

    /// Allocate backing storage for one `T` and move `value` into it.
    ///
    /// `T` must fit the word alignment this adapter hands out; the
    /// current users are single-word atomics, which do.
    pub fn allocate_word<T>(&self, value: T) -> Option<NonNull<T>> {
        const { assert!(align_of::<T>() <= WORD_ALIGN, "word allocation cannot hold T") }
        let ptr = self.host.allocate(size_of::<T>(), WORD_ALIGN)?.cast::<T>();
        unsafe { ptr.as_ptr().write(value) };
        Some(ptr)
    }

    /// Return a block to the host allocator.
    ///
    /// # Safety
    /// - `ptr` must come from this adapter and not be freed twice.
    #[inline]
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        unsafe { self.host.free(ptr) };
    }

    /// Free a block obtained from [`AllocAdapter::allocate_word`].
    ///
    /// # Safety
    /// - Same as [`AllocAdapter::free`]; additionally `T` must not need
    ///   dropping beyond what the caller already arranged (the word
    ///   types stored here are plain atomics).
    #[inline]
    pub unsafe fn free_word<T>(&self, ptr: NonNull<T>) {
        unsafe { self.host.free(ptr.cast()) };
    }
}
