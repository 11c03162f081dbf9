use osl_addresses::{LogicalAddress, PAGE_SIZE, PageFrame};

/// Maximum number of outstanding mappings the layer will account for.
///
/// The interpreter maps firmware tables briefly and in small numbers;
/// a fixed arena keeps the accounting heap-free.
pub(crate) const MAX_MAPPINGS: usize = 32;

/// One outstanding translation: what was requested and what the pager
/// handed back.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Mapping {
    /// Page-aligned logical base returned by the pager.
    pub base: LogicalAddress,
    /// Page-aligned physical base of the request.
    pub frame: PageFrame,
    /// Pages mapped.
    pub pages: u64,
    /// Byte length originally requested (for cross-checking unmap).
    pub length: u64,
}

impl Mapping {
    /// Whether `addr` falls inside the mapped page range.
    fn contains(&self, addr: LogicalAddress) -> bool {
        let start = self.base.as_u64();
        let end = start + self.pages * PAGE_SIZE;
        (start..end).contains(&addr.as_u64())
    }
}

/// Fixed-capacity record of outstanding mappings.
///
/// Unmap is resolved against this table, so releasing a mapping does
/// not depend on the caller reproducing the original request exactly.
pub(crate) struct MappingTable {
    slots: [Option<Mapping>; MAX_MAPPINGS],
}

impl MappingTable {
    pub(crate) const fn new() -> Self {
        Self {
            slots: [None; MAX_MAPPINGS],
        }
    }

    /// Record a fresh mapping; `false` when every slot is taken.
    pub(crate) fn insert(&mut self, mapping: Mapping) -> bool {
        for slot in &mut self.slots {
            if slot.is_none() {
                *slot = Some(mapping);
                return true;
            }
        }
        false
    }

    /// Remove and return the mapping whose page range contains `addr`.
    pub(crate) fn take_containing(&mut self, addr: LogicalAddress) -> Option<Mapping> {
        self.slots
            .iter_mut()
            .find(|slot| slot.is_some_and(|m| m.contains(addr)))
            .and_then(Option::take)
    }

    /// Number of mappings currently recorded.
    pub(crate) fn outstanding(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
