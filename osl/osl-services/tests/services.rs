//! End-to-end exercises of the services facade against mock host
//! collaborators.

use osl_services::host::{
    Clock, HostAlloc, InterruptBinding, InterruptRegistry, PageMapper, PciLocation, RemoveError,
    ServiceOutcome,
};
use osl_services::ports::PortAccess;
use osl_services::{
    LogicalAddress, OsServices, PAGE_SIZE, PageFrame, PhysicalAddress, Status, Timeout,
};
use std::alloc::Layout;
use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

// ---- mock collaborators ------------------------------------------------

/// Host allocator over the std heap, with a kill switch and a ledger of
/// live blocks (free without a matching allocate panics the test).
#[derive(Default, Clone)]
struct MockAlloc(Arc<MockAllocInner>);

#[derive(Default)]
struct MockAllocInner {
    live: Mutex<HashMap<usize, Layout>>,
    fail: AtomicBool,
}

impl MockAlloc {
    fn fail_all(&self) {
        self.0.fail.store(true, Ordering::SeqCst);
    }

    fn live_blocks(&self) -> usize {
        self.0.live.lock().unwrap().len()
    }
}

impl HostAlloc for MockAlloc {
    fn allocate(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        if self.0.fail.load(Ordering::SeqCst) {
            return None;
        }
        let layout = Layout::from_size_align(size.max(1), align).ok()?;
        let ptr = NonNull::new(unsafe { std::alloc::alloc(layout) })?;
        self.0
            .live
            .lock()
            .unwrap()
            .insert(ptr.as_ptr() as usize, layout);
        Some(ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        let layout = self
            .0
            .live
            .lock()
            .unwrap()
            .remove(&(ptr.as_ptr() as usize))
            .expect("free of a pointer this allocator never handed out");
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

/// Pager that records every request and synthesizes page-aligned bases.
#[derive(Default, Clone)]
struct MapperLog(Arc<MapperLogInner>);

#[derive(Default)]
struct MapperLogInner {
    mapped: Mutex<Vec<(u64, u64)>>, // (frame base, page count)
    unmapped: Mutex<Vec<u64>>,      // released page bases
    fail: AtomicBool,
}

impl MapperLog {
    fn mapped(&self) -> Vec<(u64, u64)> {
        self.0.mapped.lock().unwrap().clone()
    }

    fn unmapped(&self) -> Vec<u64> {
        self.0.unmapped.lock().unwrap().clone()
    }
}

struct RecordingMapper {
    log: MapperLog,
    next_base: u64,
}

impl PageMapper for RecordingMapper {
    fn map_pages(&mut self, frame: PageFrame, count: u64) -> Option<LogicalAddress> {
        if self.log.0.fail.load(Ordering::SeqCst) {
            return None;
        }
        self.log
            .0
            .mapped
            .lock()
            .unwrap()
            .push((frame.base().as_u64(), count));
        let base = self.next_base;
        self.next_base += count * PAGE_SIZE;
        Some(LogicalAddress::new(base))
    }

    fn unmap_page(&mut self, page: LogicalAddress) {
        self.log.0.unmapped.lock().unwrap().push(page.as_u64());
    }
}

/// Registry serving vectors 0..=255, one handler per vector.
#[derive(Default)]
struct TestRegistry {
    installed: HashSet<u32>,
}

impl InterruptRegistry for TestRegistry {
    fn install(
        &mut self,
        binding: InterruptBinding,
    ) -> Result<(), osl_services::host::InstallError> {
        use osl_services::host::InstallError;
        if binding.vector > 255 {
            return Err(InstallError::InvalidVector(binding.vector));
        }
        if !self.installed.insert(binding.vector) {
            return Err(InstallError::VectorBusy(binding.vector));
        }
        Ok(())
    }

    fn remove(&mut self, vector: u32) -> Result<(), RemoveError> {
        if self.installed.remove(&vector) {
            Ok(())
        } else {
            Err(RemoveError::NotInstalled(vector))
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
enum Access {
    R8(u16),
    R32(u16),
    W16(u16, u16),
}

#[derive(Default, Clone)]
struct BusLog(Arc<Mutex<Vec<Access>>>);

struct FakeBus {
    log: BusLog,
}

impl PortAccess for FakeBus {
    unsafe fn read8(&self, port: u16) -> u8 {
        self.log.0.lock().unwrap().push(Access::R8(port));
        0x5A
    }
    unsafe fn read16(&self, _port: u16) -> u16 {
        unreachable!("no 16-bit read expected");
    }
    unsafe fn read32(&self, port: u16) -> u32 {
        self.log.0.lock().unwrap().push(Access::R32(port));
        0x8000_0001
    }
    unsafe fn write8(&self, _port: u16, _value: u8) {
        unreachable!("no 8-bit write expected");
    }
    unsafe fn write16(&self, port: u16, value: u16) {
        self.log.0.lock().unwrap().push(Access::W16(port, value));
    }
    unsafe fn write32(&self, _port: u16, _value: u32) {
        unreachable!("no 32-bit write expected");
    }
}

/// Monotonic clock that advances 100 µs on every observation, so
/// deadline-bounded spins terminate deterministically.
#[derive(Default)]
struct SteppingClock {
    now: AtomicU64,
}

impl Clock for SteppingClock {
    fn now_micros(&self) -> u64 {
        self.now.fetch_add(100, Ordering::Relaxed)
    }
}

type TestServices = OsServices<MockAlloc, RecordingMapper, TestRegistry, FakeBus, SteppingClock>;

const ROOT: u64 = 0x000E_0000;

fn services() -> (TestServices, MockAlloc, MapperLog, BusLog) {
    let alloc = MockAlloc::default();
    let mapper_log = MapperLog::default();
    let bus_log = BusLog::default();
    let services = OsServices::new(
        alloc.clone(),
        RecordingMapper {
            log: mapper_log.clone(),
            next_base: 0x5000_0000,
        },
        TestRegistry::default(),
        FakeBus {
            log: bus_log.clone(),
        },
        SteppingClock::default(),
        PhysicalAddress::new(ROOT),
    );
    (services, alloc, mapper_log, bus_log)
}

unsafe fn noop_routine(_context: *mut c_void) -> ServiceOutcome {
    ServiceOutcome::Handled
}

fn binding(vector: u32) -> InterruptBinding {
    InterruptBinding {
        vector,
        routine: noop_routine,
        context: std::ptr::null_mut(),
    }
}

// ---- root pointer & allocation ----------------------------------------

#[test]
fn root_pointer_is_the_boot_supplied_address() {
    let (services, ..) = services();
    assert_eq!(services.root_pointer().as_u64(), ROOT);
}

#[test]
fn allocations_are_word_aligned_and_freed() {
    let (services, alloc, ..) = services();

    let ptr = services.allocate(10).expect("allocation");
    assert_eq!(ptr.as_ptr() as usize % align_of::<usize>(), 0);
    assert_eq!(alloc.live_blocks(), 1);

    unsafe { services.free(ptr) };
    assert_eq!(alloc.live_blocks(), 0);
}

#[test]
fn allocation_failure_passes_through() {
    let (services, alloc, ..) = services();
    alloc.fail_all();
    assert!(services.allocate(16).is_none());
}

// ---- locks -------------------------------------------------------------

#[test]
fn lock_lifecycle_releases_backing_storage() {
    let (services, alloc, ..) = services();

    let lock = services.create_lock().expect("create");
    assert_eq!(alloc.live_blocks(), 1);

    services.acquire_lock(&lock);
    services.release_lock(&lock);
    services.acquire_lock(&lock);
    services.release_lock(&lock);

    services.delete_lock(lock);
    assert_eq!(alloc.live_blocks(), 0);
}

#[test]
fn create_lock_reports_allocation_failure() {
    let (services, alloc, ..) = services();
    alloc.fail_all();
    assert_eq!(services.create_lock().unwrap_err(), Status::OutOfMemory);
}

#[test]
fn lock_excludes_across_contexts() {
    let (services, ..) = services();
    let lock = services.create_lock().expect("create");

    let in_cs = AtomicUsize::new(0);
    let total = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..1_000 {
                    services.acquire_lock(&lock);
                    assert_eq!(in_cs.fetch_add(1, Ordering::SeqCst), 0, "exclusion violated");
                    total.fetch_add(1, Ordering::SeqCst);
                    in_cs.fetch_sub(1, Ordering::SeqCst);
                    services.release_lock(&lock);
                }
            });
        }
    });

    assert_eq!(total.load(Ordering::SeqCst), 4_000);
    services.delete_lock(lock);
}

// ---- semaphores --------------------------------------------------------

#[test]
fn semaphore_units_follow_the_contract() {
    let (services, ..) = services();
    let sem = services.create_semaphore(10, 5).expect("create");

    // 5 available: taking 3 succeeds, leaving 2
    assert!(services.wait_semaphore(&sem, 3, Timeout::DontWait).is_ok());
    // 2 available: taking 3 must fail without side effect
    assert_eq!(
        services.wait_semaphore(&sem, 3, Timeout::DontWait),
        Err(Status::BadParameter)
    );
    // give 7 back: 9 available
    assert!(services.signal_semaphore(&sem, 7).is_ok());
    assert!(services.wait_semaphore(&sem, 9, Timeout::DontWait).is_ok());
    // and now the well is dry
    assert_eq!(
        services.wait_semaphore(&sem, 1, Timeout::DontWait),
        Err(Status::BadParameter)
    );

    services.delete_semaphore(sem);
}

#[test]
fn semaphore_ceiling_is_enforced() {
    let (services, ..) = services();
    let sem = services.create_semaphore(10, 5).expect("create");

    // 5 + 6 would overshoot the ceiling of 10
    assert_eq!(
        services.signal_semaphore(&sem, 6),
        Err(Status::BadParameter)
    );
    // the failed signal must not have changed the count
    assert_eq!(
        services.wait_semaphore(&sem, 6, Timeout::DontWait),
        Err(Status::BadParameter)
    );
    assert!(services.wait_semaphore(&sem, 5, Timeout::DontWait).is_ok());

    services.delete_semaphore(sem);
}

#[test]
fn semaphore_creation_validates_and_reports_exhaustion() {
    let (services, alloc, ..) = services();
    assert_eq!(
        services.create_semaphore(2, 3).unwrap_err(),
        Status::BadParameter
    );

    alloc.fail_all();
    assert_eq!(
        services.create_semaphore(4, 4).unwrap_err(),
        Status::OutOfMemory
    );
}

#[test]
fn bounded_wait_expires_on_the_host_clock() {
    let (services, ..) = services();
    let sem = services.create_semaphore(1, 0).expect("create");

    assert_eq!(
        services.wait_semaphore(&sem, 1, Timeout::Millis(5)),
        Err(Status::BadParameter)
    );

    services.delete_semaphore(sem);
}

#[test]
fn bounded_wait_succeeds_when_units_are_there() {
    let (services, ..) = services();
    let sem = services.create_semaphore(5, 5).expect("create");
    assert!(services.wait_semaphore(&sem, 5, Timeout::Millis(1)).is_ok());
    services.delete_semaphore(sem);
}

#[test]
fn unbounded_wait_blocks_until_signalled() {
    let (services, ..) = services();
    let sem = services.create_semaphore(3, 0).expect("create");

    thread::scope(|s| {
        let waiter = s.spawn(|| services.wait_semaphore(&sem, 3, Timeout::Forever));

        thread::sleep(std::time::Duration::from_millis(5));
        services.signal_semaphore(&sem, 1).unwrap();
        services.signal_semaphore(&sem, 2).unwrap();

        assert!(waiter.join().unwrap().is_ok());
    });

    services.delete_semaphore(sem);
}

// ---- memory mapping ----------------------------------------------------

#[test]
fn map_requests_one_page_and_preserves_the_offset() {
    let (services, _, mapper, _) = services();

    let la = services
        .map_memory(PhysicalAddress::new(0x1234), 100)
        .expect("map");

    assert_eq!(mapper.mapped(), vec![(0x1000, 1)]);
    assert_eq!(la.as_u64(), 0x5000_0000 + 0x234);
}

#[test]
fn exact_page_multiple_requests_no_extra_page() {
    let (services, _, mapper, _) = services();

    services
        .map_memory(PhysicalAddress::new(0x1000), 4096)
        .expect("map");
    services
        .map_memory(PhysicalAddress::new(0x1000), 4097)
        .expect("map");

    assert_eq!(mapper.mapped(), vec![(0x1000, 1), (0x1000, 2)]);
}

#[test]
fn unmap_releases_the_recorded_pages_one_at_a_time() {
    let (services, _, mapper, _) = services();

    let la = services
        .map_memory(PhysicalAddress::new(0x2000), 8192)
        .expect("map");
    assert_eq!(services.outstanding_mappings(), 1);

    services.unmap_memory(la, 8192).expect("unmap");
    assert_eq!(
        mapper.unmapped(),
        vec![0x5000_0000, 0x5000_0000 + PAGE_SIZE]
    );
    assert_eq!(services.outstanding_mappings(), 0);
}

#[test]
fn double_unmap_is_rejected() {
    let (services, ..) = services();

    let la = services
        .map_memory(PhysicalAddress::new(0x3000), 64)
        .expect("map");
    services.unmap_memory(la, 64).expect("first unmap");
    assert_eq!(services.unmap_memory(la, 64), Err(Status::NotFound));
}

#[test]
fn unmap_trusts_its_records_over_the_caller_size() {
    let (services, _, mapper, _) = services();

    let la = services
        .map_memory(PhysicalAddress::new(0x4000), 8192)
        .expect("map");

    // wrong size: the recorded two pages are still what gets released
    services.unmap_memory(la, 4096).expect("unmap");
    assert_eq!(mapper.unmapped().len(), 2);
}

#[test]
fn unmap_resolves_interior_addresses() {
    let (services, _, mapper, _) = services();

    let la = services
        .map_memory(PhysicalAddress::new(0x6000), 2 * 4096)
        .expect("map");

    // an address inside the second page still identifies the mapping
    services
        .unmap_memory(la + PAGE_SIZE + 0x10, 2 * 4096)
        .expect("unmap");
    assert_eq!(mapper.unmapped().len(), 2);
}

#[test]
fn zero_length_map_is_a_bad_parameter() {
    let (services, ..) = services();
    assert_eq!(
        services.map_memory(PhysicalAddress::new(0x1000), 0),
        Err(Status::BadParameter)
    );
}

#[test]
fn pager_exhaustion_is_out_of_memory() {
    let (services, _, mapper, _) = services();
    mapper.0.fail.store(true, Ordering::SeqCst);
    assert_eq!(
        services.map_memory(PhysicalAddress::new(0x1000), 64),
        Err(Status::OutOfMemory)
    );
}

#[test]
fn full_accounting_table_rolls_the_fresh_mapping_back() {
    let (services, _, mapper, _) = services();

    // capacity of the accounting table
    for i in 0..32_u64 {
        services
            .map_memory(PhysicalAddress::new(0x10_0000 + i * 0x1000), 16)
            .expect("map");
    }
    assert_eq!(
        services.map_memory(PhysicalAddress::new(0x90_0000), 16),
        Err(Status::OutOfMemory)
    );
    // the unaccountable page was handed back to the pager
    assert_eq!(mapper.unmapped().len(), 1);
    assert_eq!(services.outstanding_mappings(), 32);
}

// ---- interrupts --------------------------------------------------------

#[test]
fn interrupt_registration_propagates_the_registry_verdict() {
    let (services, ..) = services();

    assert!(services.install_interrupt_handler(binding(9)).is_ok());
    assert_eq!(
        services.install_interrupt_handler(binding(9)),
        Err(Status::BadParameter)
    );
    assert_eq!(
        services.install_interrupt_handler(binding(4096)),
        Err(Status::BadParameter)
    );

    assert!(services.remove_interrupt_handler(9).is_ok());
    assert_eq!(services.remove_interrupt_handler(9), Err(Status::NotFound));
}

// ---- port I/O ----------------------------------------------------------

#[test]
fn port_access_dispatches_exactly_one_bus_access() {
    let (services, _, _, bus) = services();

    assert_eq!(unsafe { services.read_port(0x60, 8) }, Ok(0x5A));
    assert_eq!(unsafe { services.read_port(0xCF8, 32) }, Ok(0x8000_0001));
    assert!(unsafe { services.write_port(0xCFC, 0xBEEF, 16) }.is_ok());

    assert_eq!(
        *bus.0.lock().unwrap(),
        vec![
            Access::R8(0x60),
            Access::R32(0xCF8),
            Access::W16(0xCFC, 0xBEEF)
        ]
    );
}

#[test]
fn unknown_port_width_never_touches_the_bus() {
    let (services, _, _, bus) = services();

    assert_eq!(
        unsafe { services.read_port(0x60, 64) },
        Err(Status::BadParameter)
    );
    assert_eq!(
        unsafe { services.write_port(0x60, 1, 0) },
        Err(Status::BadParameter)
    );
    assert!(bus.0.lock().unwrap().is_empty());
}

// ---- boundary stubs ----------------------------------------------------

#[test]
fn boundary_stubs_uniformly_report_not_implemented() {
    let (services, ..) = services();
    let pa = PhysicalAddress::new(0x1000);
    let location = PciLocation {
        segment: 0,
        bus: 0,
        device: 3,
        function: 0,
    };

    assert_eq!(services.table_override(pa), Err(Status::NotImplemented));
    assert_eq!(
        services.physical_table_override(pa),
        Err(Status::NotImplemented)
    );
    assert_eq!(
        services.physical_address_of(LogicalAddress::new(0x5000_0000)),
        Err(Status::NotImplemented)
    );
    assert_eq!(
        services.read_pci_config(location, 0, 32),
        Err(Status::NotImplemented)
    );
    assert_eq!(
        services.write_pci_config(location, 0, 1, 32),
        Err(Status::NotImplemented)
    );
    assert_eq!(services.enter_sleep_state(5), Err(Status::NotImplemented));
    assert_eq!(services.read_memory(pa, 32), Err(Status::NotImplemented));
    assert_eq!(
        services.write_memory(pa, 0, 32),
        Err(Status::NotImplemented)
    );
    assert_eq!(services.initialize_debugger(), Err(Status::NotImplemented));
    assert_eq!(
        services.open_directory("/", "*.aml"),
        Err(Status::NotImplemented)
    );
}

// ---- primitive re-export ----------------------------------------------

#[test]
fn memory_primitives_are_reachable_through_the_facade() {
    let mut buf = [0_u8; 8];
    unsafe { osl_services::mem::fill(buf.as_mut_ptr(), 0x241, buf.len()) };
    assert_eq!(buf, [0x41; 8]);
}
