//! Interrupt registration adapter.
//!
//! Pure forwarding: the host registry owns the vector table and the
//! installed bindings; this layer adds locking around the registry and
//! translates its verdict into the service status taxonomy instead of
//! reporting unconditional success.

use crate::host::{InstallError, InterruptBinding, InterruptRegistry, RemoveError};
use log::trace;
use osl_status::Status;
use osl_sync::SpinLock;

impl From<InstallError> for Status {
    fn from(_: InstallError) -> Self {
        Self::BadParameter
    }
}

impl From<RemoveError> for Status {
    fn from(_: RemoveError) -> Self {
        Self::NotFound
    }
}

pub struct InterruptAdapter<I> {
    registry: SpinLock<I>,
}

impl<I: InterruptRegistry> InterruptAdapter<I> {
    pub const fn new(registry: I) -> Self {
        Self {
            registry: SpinLock::new(registry),
        }
    }

    /// Forward an install request to the host registry.
    ///
    /// # Errors
    /// The registry's [`InstallError`], unaltered.
    pub fn install(&self, binding: InterruptBinding) -> Result<(), InstallError> {
        trace!("installing service routine on vector {}", binding.vector);
        self.registry.with_lock(|registry| registry.install(binding))
    }

    /// Forward a removal request to the host registry.
    ///
    /// # Errors
    /// The registry's [`RemoveError`], unaltered.
    pub fn remove(&self, vector: u32) -> Result<(), RemoveError> {
        trace!("removing service routine from vector {vector}");
        self.registry.with_lock(|registry| registry.remove(vector))
    }
}
