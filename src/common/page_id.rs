//! Table and page identifier types.

use std::fmt;

/// Identifies a table (and therefore its backing heap file).
///
/// Heap files derive their id from a CRC32 of their absolute path, so the
/// same file always maps to the same id within and across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.0)
    }
}

/// Identifies a page within a table.
///
/// Page `n` of a table lives at byte offset `n × page_size` of the table's
/// file. `PageId` is the key of both the buffer pool cache and the lock
/// table, so it is `Copy + Eq + Hash`.
///
/// # Example
/// ```
/// use heapstore::{PageId, TableId};
///
/// let pid = PageId::new(TableId(1), 42);
/// assert_eq!(pid.table_id(), TableId(1));
/// assert_eq!(pid.page_number(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    table_id: TableId,
    page_number: u32,
}

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(table_id: TableId, page_number: u32) -> Self {
        Self {
            table_id,
            page_number,
        }
    }

    #[inline]
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    #[inline]
    pub fn page_number(&self) -> u32 {
        self.page_number
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}:{})", self.table_id.0, self.page_number)
    }
}
