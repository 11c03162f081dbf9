//! # Host OS services layer for a firmware-table interpreter
//!
//! This crate is the boundary between an embedded firmware-table
//! interpreter (an external component executing a hardware
//! description/control language) and the host kernel it runs inside.
//! The interpreter calls down synchronously for every OS facility it
//! needs; this layer either serves the call itself or forwards it to a
//! host collaborator, and reports the outcome in the interpreter's
//! fixed status taxonomy.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Firmware-table interpreter             │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ fixed service contract
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 OsServices (this crate)             │
//! │   locks/semaphores · mapping · allocation ·         │
//! │   interrupts · port I/O · delays · root pointer     │
//! └──┬─────────┬───────────┬──────────┬─────────┬───────┘
//!    │         │           │          │         │
//!  HostAlloc PageMapper  Interrupt  PortAccess Clock
//!    │         │          Registry     │         │
//! ┌──▼─────────▼───────────▼──────────▼─────────▼───────┐
//! │                     Host kernel                     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key pieces
//!
//! * **Synchronization services**: lock and counting-semaphore
//!   handles, each backed by a single word obtained from the host
//!   allocator and driven by the atomic state machines of `osl-sync`.
//!   Waits genuinely block (spinning on the word, bounded by the host
//!   clock when a timeout is given) and the semaphore ceiling is
//!   enforced.
//! * **Memory mapping adapter**: converts arbitrary physical
//!   address + length requests into page-granularity pager work and
//!   accounts for every outstanding mapping, so unmap is resolved from
//!   the layer's own records (see [`mapping`]).
//! * **Allocator adapter**: forwards to the host allocator with
//!   alignment fixed at the platform word width (see [`alloc`]).
//! * **Interrupt registration**: forwards install/remove to the host
//!   vector registry and surfaces its real verdict (see [`interrupts`]).
//! * **Port I/O**: width-validated `in`/`out` access to the legacy
//!   x86 port space (see [`ports`]).
//! * **Primitive memory routines**: re-exported from `osl-mem` as
//!   [`mem`]; the fixed-width fill/compare/copy/length the interpreter
//!   links against.
//!
//! Boundary calls with no backing implementation on this host (table
//! overrides, PCI configuration, sleep states, MMIO reads/writes,
//! logical-to-physical lookup) uniformly report
//! [`Status::NotImplemented`].
//!
//! ## Observability
//!
//! Operations log through the `log` facade at `trace` level, with
//! `warn`s on contract anomalies (an unmap whose size disagrees with
//! the recorded mapping). The host installs its own logger; this layer
//! never prints.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod alloc;
pub mod host;
pub mod interrupts;
pub mod mapping;
pub mod ports;
mod services;
mod sync;

pub use osl_addresses::{LogicalAddress, PAGE_SIZE, PageFrame, PhysicalAddress, page_span};
pub use osl_mem as mem;
pub use osl_status::{Result, Status};
pub use osl_sync::Timeout;
pub use services::OsServices;
pub use sync::{LockHandle, SemaphoreHandle};
