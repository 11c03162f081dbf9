//! Collaborator seams of the services layer.
//!
//! The layer implements no allocator, pager, vector table or clock of
//! its own; the host kernel supplies each behind one of these traits.
//! Adapters in this crate translate between the interpreter's fixed
//! contract and whatever the host implementation reports.

use core::ffi::c_void;
use core::ptr::NonNull;
use osl_addresses::{LogicalAddress, PageFrame};

/// Host memory allocator.
///
/// The shape mirrors a classic `alloc(size, align)` / `free(ptr)` pair:
/// the allocator remembers its own block metadata, so `free` takes no
/// layout.
pub trait HostAlloc {
    /// Allocate `size` bytes aligned to `align`; `None` when exhausted.
    fn allocate(&self, size: usize, align: usize) -> Option<NonNull<u8>>;

    /// Return a block to the allocator.
    ///
    /// # Safety
    /// - `ptr` must come from [`HostAlloc::allocate`] on this allocator
    ///   and must not have been freed already.
    unsafe fn free(&self, ptr: NonNull<u8>);
}

/// Host page mapper: establishes and tears down page-granularity
/// translations for the mapping adapter.
pub trait PageMapper {
    /// Map `count` contiguous pages of physical memory starting at
    /// `frame` into the current address space.
    ///
    /// Returns the logical base of the new mapping, which must be
    /// page-aligned; the in-page offset of any address inside the
    /// region is therefore preserved across the translation. `None`
    /// when the mapper cannot satisfy the request.
    fn map_pages(&mut self, frame: PageFrame, count: u64) -> Option<LogicalAddress>;

    /// Release one previously mapped page.
    fn unmap_page(&mut self, page: LogicalAddress);
}

/// Whether a service routine consumed its interrupt.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ServiceOutcome {
    Handled,
    NotHandled,
}

/// Interrupt service routine installed on behalf of the interpreter.
///
/// The routine and its context are opaque to this layer; they are
/// stored by the host registry and invoked from interrupt context.
pub type ServiceRoutine = unsafe fn(context: *mut c_void) -> ServiceOutcome;

/// One handler registration: routine + context bound to a vector.
#[derive(Debug, Copy, Clone)]
pub struct InterruptBinding {
    pub vector: u32,
    pub routine: ServiceRoutine,
    pub context: *mut c_void,
}

// Safety: the binding only carries the pointer; the routine itself is
// responsible for whatever the context points at.
unsafe impl Send for InterruptBinding {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    #[error("vector {0} already has a handler installed")]
    VectorBusy(u32),
    #[error("vector {0} is outside the registry's range")]
    InvalidVector(u32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoveError {
    #[error("vector {0} has no handler installed")]
    NotInstalled(u32),
}

/// Host interrupt-vector registry.
///
/// Owns the vector table; this layer keeps no per-vector state of its
/// own and merely forwards, surfacing the registry's verdict.
pub trait InterruptRegistry {
    /// Install `binding` on its vector.
    ///
    /// # Errors
    /// [`InstallError::VectorBusy`] if the vector is taken,
    /// [`InstallError::InvalidVector`] if the registry does not serve it.
    fn install(&mut self, binding: InterruptBinding) -> Result<(), InstallError>;

    /// Remove the handler from `vector`.
    ///
    /// # Errors
    /// [`RemoveError::NotInstalled`] if nothing is installed there.
    fn remove(&mut self, vector: u32) -> Result<(), RemoveError>;
}

/// Host monotonic clock, used for semaphore timeouts and busy-wait
/// delays.
pub trait Clock {
    /// Microseconds since an arbitrary epoch; never decreases.
    fn now_micros(&self) -> u64;
}

/// PCI configuration-space location, carried through the (unimplemented)
/// PCI boundary calls.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PciLocation {
    pub segment: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}
