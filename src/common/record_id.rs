//! Record identifier type.

use std::fmt;

use super::PageId;

/// Locates a tuple: the page it lives on and its slot within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    page_id: PageId,
    slot: u32,
}

impl RecordId {
    #[inline]
    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Slot number within the page.
    #[inline]
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Record({}:{}:{})",
            self.page_id.table_id().0,
            self.page_id.page_number(),
            self.slot
        )
    }
}
