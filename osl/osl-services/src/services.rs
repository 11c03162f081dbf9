use crate::alloc::AllocAdapter;
use crate::host::{Clock, HostAlloc, InterruptBinding, InterruptRegistry, PageMapper, PciLocation};
use crate::interrupts::InterruptAdapter;
use crate::mapping::MappingAdapter;
use crate::ports::{self, PortAccess, PortWidth};
use crate::sync::{LockHandle, SemaphoreHandle};
use core::hint::spin_loop;
use core::ptr::NonNull;
use log::trace;
use osl_addresses::{LogicalAddress, PhysicalAddress};
use osl_status::{Result, Status};
use osl_sync::{RawFlag, SemCount, Timeout};

/// The services object handed to the interpreter.
///
/// Owns one adapter per host collaborator plus the boot-supplied root
/// pointer. Every operation takes `&self`; the adapters lock
/// internally, so one instance may serve interpreter code and
/// interrupt context at the same time.
pub struct OsServices<A, M, I, P, C> {
    alloc: AllocAdapter<A>,
    mapping: MappingAdapter<M>,
    interrupts: InterruptAdapter<I>,
    port_bus: P,
    clock: C,
    root: PhysicalAddress,
}

impl<A, M, I, P, C> OsServices<A, M, I, P, C>
where
    A: HostAlloc,
    M: PageMapper,
    I: InterruptRegistry,
    P: PortAccess,
    C: Clock,
{
    /// Assemble the layer from its collaborators and the root table
    /// address discovered by the boot environment.
    pub const fn new(
        alloc: A,
        mapper: M,
        registry: I,
        port_bus: P,
        clock: C,
        root: PhysicalAddress,
    ) -> Self {
        Self {
            alloc: AllocAdapter::new(alloc),
            mapping: MappingAdapter::new(mapper),
            interrupts: InterruptAdapter::new(registry),
            port_bus,
            clock,
            root,
        }
    }

    /// Physical address of the first firmware description table, as
    /// supplied by the boot environment.
    #[must_use]
    pub const fn root_pointer(&self) -> PhysicalAddress {
        self.root
    }

    // ---- allocation ----------------------------------------------------

    /// Allocate `size` bytes of word-aligned memory; `None` passes the
    /// host allocator's exhaustion through.
    #[must_use]
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.alloc.allocate(size)
    }

    /// Return a block obtained from [`OsServices::allocate`].
    ///
    /// # Safety
    /// - `ptr` must come from this instance's `allocate` and must not
    ///   be freed twice.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        unsafe { self.alloc.free(ptr) };
    }

    // ---- locks ---------------------------------------------------------

    /// Create a lock backed by one freshly allocated word, initially
    /// unlocked.
    ///
    /// # Errors
    /// [`Status::OutOfMemory`] when the word cannot be allocated.
    pub fn create_lock(&self) -> Result<LockHandle> {
        let word = self
            .alloc
            .allocate_word(RawFlag::new())
            .ok_or(Status::OutOfMemory)?;
        trace!("created lock {word:p}");
        Ok(LockHandle::new(word))
    }

    /// Acquire the lock, spinning until it is free.
    pub fn acquire_lock(&self, handle: &LockHandle) {
        handle.flag().acquire();
    }

    /// Release the lock.
    ///
    /// Releasing a lock this context does not hold violates the
    /// interpreter contract; the word transition itself stays sound.
    pub fn release_lock(&self, handle: &LockHandle) {
        // Safety: holding the lock is the caller's contract obligation.
        unsafe { handle.flag().release() };
    }

    /// Destroy the lock and return its word to the allocator. Consuming
    /// the handle makes use-after-delete unrepresentable.
    pub fn delete_lock(&self, handle: LockHandle) {
        let word = handle.into_word();
        trace!("deleting lock {word:p}");
        // Safety: the word came from allocate_word and the consumed
        // handle was the only capability over it.
        unsafe { self.alloc.free_word(word) };
    }

    // ---- semaphores ----------------------------------------------------

    /// Create a counting semaphore with `initial_units` available and
    /// `max_units` as an enforced ceiling.
    ///
    /// # Errors
    /// [`Status::BadParameter`] if `initial_units > max_units`;
    /// [`Status::OutOfMemory`] when the word cannot be allocated.
    pub fn create_semaphore(
        &self,
        max_units: usize,
        initial_units: usize,
    ) -> Result<SemaphoreHandle> {
        if initial_units > max_units {
            return Err(Status::BadParameter);
        }
        let word = self
            .alloc
            .allocate_word(SemCount::new(initial_units))
            .ok_or(Status::OutOfMemory)?;
        trace!("created semaphore {word:p} ({initial_units}/{max_units} units)");
        Ok(SemaphoreHandle::new(word, max_units))
    }

    /// Take `units` from the semaphore, blocking per `timeout`.
    ///
    /// # Errors
    /// [`Status::BadParameter`] when the units did not become available
    /// within the timeout: immediately for [`Timeout::DontWait`], after
    /// the deadline for [`Timeout::Millis`]. The count is left
    /// unchanged on failure.
    pub fn wait_semaphore(
        &self,
        handle: &SemaphoreHandle,
        units: usize,
        timeout: Timeout,
    ) -> Result<()> {
        let sem = handle.counter();
        let taken = match timeout {
            Timeout::DontWait => sem.try_take(units),
            Timeout::Forever => sem.take_until(units, || false),
            Timeout::Millis(ms) => {
                let deadline = self
                    .clock
                    .now_micros()
                    .saturating_add(u64::from(ms) * 1_000);
                sem.take_until(units, || self.clock.now_micros() >= deadline)
            }
        };
        if taken { Ok(()) } else { Err(Status::BadParameter) }
    }

    /// Return `units` to the semaphore.
    ///
    /// # Errors
    /// [`Status::BadParameter`] when the signal would push the count
    /// past the ceiling established at creation; the count is left
    /// unchanged.
    pub fn signal_semaphore(&self, handle: &SemaphoreHandle, units: usize) -> Result<()> {
        handle
            .counter()
            .give(units, handle.max_units())
            .map(|_| ())
            .ok_or(Status::BadParameter)
    }

    /// Destroy the semaphore and return its word to the allocator.
    pub fn delete_semaphore(&self, handle: SemaphoreHandle) {
        let word = handle.into_word();
        trace!("deleting semaphore {word:p}");
        // Safety: as for delete_lock.
        unsafe { self.alloc.free_word(word) };
    }

    // ---- memory mapping ------------------------------------------------

    /// Map `length` bytes of physical memory at `phys` into the current
    /// address space.
    ///
    /// # Errors
    /// [`Status::BadParameter`] for a zero-length request,
    /// [`Status::OutOfMemory`] when the pager or the accounting table
    /// is exhausted.
    pub fn map_memory(&self, phys: PhysicalAddress, length: u64) -> Result<LogicalAddress> {
        Ok(self.mapping.map(phys, length)?)
    }

    /// Unmap the mapping containing `logical`, releasing the page count
    /// recorded when it was mapped.
    ///
    /// # Errors
    /// [`Status::NotFound`] when no outstanding mapping contains the
    /// address (double unmap, or never mapped).
    pub fn unmap_memory(&self, logical: LogicalAddress, size: u64) -> Result<()> {
        Ok(self.mapping.unmap(logical, size)?)
    }

    /// Number of mappings currently outstanding.
    #[must_use]
    pub fn outstanding_mappings(&self) -> usize {
        self.mapping.outstanding()
    }

    // ---- interrupts ----------------------------------------------------

    /// Install an interrupt service routine via the host registry.
    ///
    /// # Errors
    /// [`Status::BadParameter`] when the registry refuses the vector
    /// (busy or out of range).
    pub fn install_interrupt_handler(&self, binding: InterruptBinding) -> Result<()> {
        Ok(self.interrupts.install(binding)?)
    }

    /// Remove the service routine from `vector`.
    ///
    /// # Errors
    /// [`Status::NotFound`] when the vector has no handler installed.
    pub fn remove_interrupt_handler(&self, vector: u32) -> Result<()> {
        Ok(self.interrupts.remove(vector)?)
    }

    // ---- port I/O ------------------------------------------------------

    /// Read from I/O port `address` at the given width (8, 16 or 32);
    /// narrower results zero-extend.
    ///
    /// # Errors
    /// [`Status::BadParameter`] for an unrecognized width; the bus is
    /// not touched.
    ///
    /// # Safety
    /// As [`PortAccess::read8`]: the port must belong to a present
    /// device and the context must be privileged for port I/O.
    pub unsafe fn read_port(&self, address: u16, width: u32) -> Result<u32> {
        let width = PortWidth::try_from(width)?;
        trace!("port read {address:#06X} ({width:?})");
        Ok(unsafe { ports::read_with(&self.port_bus, address, width) })
    }

    /// Write `value` to I/O port `address` at the given width; narrower
    /// widths truncate.
    ///
    /// # Errors
    /// [`Status::BadParameter`] for an unrecognized width; the bus is
    /// not touched.
    ///
    /// # Safety
    /// As [`PortAccess::write8`].
    pub unsafe fn write_port(&self, address: u16, value: u32, width: u32) -> Result<()> {
        let width = PortWidth::try_from(width)?;
        trace!("port write {address:#06X} ({width:?})");
        unsafe { ports::write_with(&self.port_bus, address, value, width) };
        Ok(())
    }

    // ---- delays --------------------------------------------------------

    /// Busy-wait for `micros` microseconds on the host clock.
    pub fn stall(&self, micros: u64) {
        let deadline = self.clock.now_micros().saturating_add(micros);
        while self.clock.now_micros() < deadline {
            spin_loop();
        }
    }

    /// Busy-wait for `millis` milliseconds. The host is cooperative;
    /// there is no scheduler to yield to.
    pub fn sleep(&self, millis: u64) {
        self.stall(millis.saturating_mul(1_000));
    }

    // ---- unimplemented boundary ---------------------------------------

    /// Replace a firmware table with a host-supplied one.
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn table_override(&self, _existing: PhysicalAddress) -> Result<Option<PhysicalAddress>> {
        Err(Status::NotImplemented)
    }

    /// Replace a firmware table at a new physical location.
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn physical_table_override(
        &self,
        _existing: PhysicalAddress,
    ) -> Result<Option<(PhysicalAddress, u32)>> {
        Err(Status::NotImplemented)
    }

    /// Translate a logical address back to its physical address.
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn physical_address_of(&self, _logical: LogicalAddress) -> Result<PhysicalAddress> {
        Err(Status::NotImplemented)
    }

    /// Read PCI configuration space.
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn read_pci_config(
        &self,
        _location: PciLocation,
        _register: u32,
        _width: u32,
    ) -> Result<u64> {
        Err(Status::NotImplemented)
    }

    /// Write PCI configuration space.
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn write_pci_config(
        &self,
        _location: PciLocation,
        _register: u32,
        _value: u64,
        _width: u32,
    ) -> Result<()> {
        Err(Status::NotImplemented)
    }

    /// Enter a platform sleep state.
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn enter_sleep_state(&self, _state: u8) -> Result<()> {
        Err(Status::NotImplemented)
    }

    /// Read physical memory at a fixed width (MMIO path).
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn read_memory(&self, _address: PhysicalAddress, _width: u32) -> Result<u64> {
        Err(Status::NotImplemented)
    }

    /// Write physical memory at a fixed width (MMIO path).
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn write_memory(&self, _address: PhysicalAddress, _value: u64, _width: u32) -> Result<()> {
        Err(Status::NotImplemented)
    }

    /// Attach the interpreter's interactive debugger.
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn initialize_debugger(&self) -> Result<()> {
        Err(Status::NotImplemented)
    }

    /// Begin enumerating host files matching a wildcard under a path.
    ///
    /// # Errors
    /// Always [`Status::NotImplemented`].
    pub fn open_directory(&self, _path: &str, _wildcard: &str) -> Result<()> {
        Err(Status::NotImplemented)
    }
}
