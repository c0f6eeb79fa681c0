//! Sequential scan over a heap file.

use std::vec;

use crate::buffer::BufferPool;
use crate::common::{PageId, Permissions, Result, TransactionId};
use crate::storage::HeapFile;
use crate::tuple::Tuple;

/// Yields every tuple of a table, page by page in ascending order.
///
/// Each page is fetched through the buffer pool with a shared lock held by
/// `tid`, so the scan sees committed data only. The tuples of one page are
/// copied out before the next page is requested. After the first error the
/// iterator is exhausted until [`HeapFileIterator::rewind`].
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tid: TransactionId,
    next_page: u32,
    current: vec::IntoIter<Tuple>,
    failed: bool,
}

impl<'a> HeapFileIterator<'a> {
    pub(crate) fn new(file: &'a HeapFile, pool: &'a BufferPool, tid: TransactionId) -> Self {
        Self {
            file,
            pool,
            tid,
            next_page: 0,
            current: Vec::new().into_iter(),
            failed: false,
        }
    }

    /// Restart from the first page.
    pub fn rewind(&mut self) {
        self.next_page = 0;
        self.current = Vec::new().into_iter();
        self.failed = false;
    }

    fn load_next_page(&mut self) -> Result<bool> {
        if self.next_page >= self.file.num_pages()? {
            return Ok(false);
        }
        let pid = PageId::new(self.file.id(), self.next_page);
        let page = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
        let tuples: Vec<Tuple> = page.read().as_heap().tuples().cloned().collect();
        self.current = tuples.into_iter();
        self.next_page += 1;
        Ok(true)
    }
}

impl Iterator for HeapFileIterator<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(tuple) = self.current.next() {
                return Some(Ok(tuple));
            }
            match self.load_next_page() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl std::fmt::Debug for HeapFileIterator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFileIterator")
            .field("table_id", &self.file.id())
            .field("tid", &self.tid)
            .field("next_page", &self.next_page)
            .finish()
    }
}
