//! Memory mapping adapter.
//!
//! Translates the interpreter's byte-granularity requests into
//! page-granularity work for the host pager: the physical address is
//! split into a page frame and an in-page offset, the page count is
//! derived from the requested length, and the returned logical pointer
//! is the pager's base plus the preserved offset.
//!
//! Every outstanding mapping is recorded in a fixed-capacity table, so
//! unmap resolves the page range from its own records rather than
//! trusting the caller to reproduce the original request. A double
//! unmap, or an unmap of an address that was never mapped, is a
//! rejected lookup instead of a stray page release. No mapping is ever
//! reused or cached; each map call issues a fresh pager request.

mod table;

use crate::host::PageMapper;
use log::{trace, warn};
use osl_addresses::{LogicalAddress, PAGE_SIZE, PhysicalAddress, page_span};
use osl_status::Status;
use osl_sync::SpinLock;
use table::{Mapping, MappingTable};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("zero-length mapping request")]
    EmptyRequest,
    #[error("page mapper could not satisfy the request")]
    MapperExhausted,
    #[error("mapping table full")]
    TableFull,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnmapError {
    #[error("no outstanding mapping contains {0}")]
    UnknownAddress(LogicalAddress),
}

impl From<MapError> for Status {
    fn from(value: MapError) -> Self {
        match value {
            MapError::EmptyRequest => Self::BadParameter,
            MapError::MapperExhausted | MapError::TableFull => Self::OutOfMemory,
        }
    }
}

impl From<UnmapError> for Status {
    fn from(_: UnmapError) -> Self {
        Self::NotFound
    }
}

struct Inner<M> {
    mapper: M,
    table: MappingTable,
}

/// Physical-to-logical translation with page accounting.
pub struct MappingAdapter<M> {
    inner: SpinLock<Inner<M>>,
}

impl<M: PageMapper> MappingAdapter<M> {
    pub const fn new(mapper: M) -> Self {
        Self {
            inner: SpinLock::new(Inner {
                mapper,
                table: MappingTable::new(),
            }),
        }
    }

    /// Map `length` bytes of physical memory starting at `phys`.
    ///
    /// Requests `page_span(length)` pages at the containing page frame
    /// and returns the pager's base adjusted by the intra-page offset.
    ///
    /// # Errors
    /// [`MapError::EmptyRequest`] for `length == 0`,
    /// [`MapError::MapperExhausted`] when the pager fails,
    /// [`MapError::TableFull`] when the mapping cannot be accounted
    /// (the fresh pages are released again before failing).
    pub fn map(&self, phys: PhysicalAddress, length: u64) -> Result<LogicalAddress, MapError> {
        if length == 0 {
            return Err(MapError::EmptyRequest);
        }
        let (frame, offset) = phys.split();
        let pages = page_span(length);

        self.inner.with_lock(|inner| {
            let base = inner
                .mapper
                .map_pages(frame, pages)
                .ok_or(MapError::MapperExhausted)?;
            debug_assert_eq!(
                base.offset_in_page(),
                0,
                "pager must hand out page-aligned bases"
            );

            if !inner.table.insert(Mapping {
                base,
                frame,
                pages,
                length,
            }) {
                for i in 0..pages {
                    inner.mapper.unmap_page(base + i * PAGE_SIZE);
                }
                return Err(MapError::TableFull);
            }

            trace!("mapped {pages} page(s) at {base} covering {phys}+{length}");
            Ok(base + offset)
        })
    }

    /// Release the mapping containing `logical`.
    ///
    /// The recorded page count drives the release, one page at a time;
    /// `size` is only cross-checked against the recorded length.
    ///
    /// # Errors
    /// [`UnmapError::UnknownAddress`] when no outstanding mapping
    /// contains `logical`.
    pub fn unmap(&self, logical: LogicalAddress, size: u64) -> Result<(), UnmapError> {
        self.inner.with_lock(|inner| {
            let mapping = inner
                .table
                .take_containing(logical)
                .ok_or(UnmapError::UnknownAddress(logical))?;

            if mapping.length != size {
                warn!(
                    "unmap of {logical} passed size {size}, mapping of {} recorded length {}",
                    mapping.frame, mapping.length
                );
            }

            for i in 0..mapping.pages {
                inner.mapper.unmap_page(mapping.base + i * PAGE_SIZE);
            }
            trace!("unmapped {} page(s) at {}", mapping.pages, mapping.base);
            Ok(())
        })
    }

    /// Number of mappings currently outstanding.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.inner.with_lock(|inner| inner.table.outstanding())
    }
}
