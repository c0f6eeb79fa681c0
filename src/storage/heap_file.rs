//! Heap file - one table stored as a flat sequence of heap pages.
//!
//! The [`HeapFile`] handles:
//! - Reading and writing page images at their offsets
//! - Appending empty pages
//! - Choosing the page a new tuple lands on (through the buffer pool)

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{Error, PageId, Permissions, Result, TableId, TransactionId};
use crate::storage::page::HeapPage;
use crate::storage::HeapFileIterator;
use crate::tuple::{Tuple, TupleDesc};

/// A table's pages on disk.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0   page_size   ...   N×page_size
/// ```
/// No file header. A trailing partial page is ignored.
///
/// # Thread Safety
/// The file handle sits behind a mutex; every seek+read/write pair and every
/// append happens under it.
pub struct HeapFile {
    path: PathBuf,
    file: Mutex<File>,
    table_id: TableId,
    desc: Arc<TupleDesc>,
    page_size: usize,
}

impl HeapFile {
    /// Open a table file, creating it if it does not exist.
    ///
    /// The table id is the CRC32 of the absolute path, so reopening the same
    /// file yields the same id.
    ///
    /// # Errors
    /// - `Error::InvalidSchema` if not even one tuple fits on a page
    /// - I/O errors from opening or resolving the path
    pub fn open<P: AsRef<Path>>(path: P, desc: Arc<TupleDesc>, page_size: usize) -> Result<Self> {
        let file = Self::open_file(path.as_ref())?;
        let absolute = std::fs::canonicalize(path.as_ref())?;
        let table_id = TableId(crc32fast::hash(absolute.to_string_lossy().as_bytes()));
        Self::from_parts(absolute, file, table_id, desc, page_size)
    }

    /// Open a table file under a caller-chosen id.
    ///
    /// # Errors
    /// Same as [`HeapFile::open`].
    pub fn open_with_id<P: AsRef<Path>>(
        path: P,
        table_id: TableId,
        desc: Arc<TupleDesc>,
        page_size: usize,
    ) -> Result<Self> {
        let file = Self::open_file(path.as_ref())?;
        Self::from_parts(path.as_ref().to_path_buf(), file, table_id, desc, page_size)
    }

    fn open_file(path: &Path) -> Result<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }

    fn from_parts(
        path: PathBuf,
        file: File,
        table_id: TableId,
        desc: Arc<TupleDesc>,
        page_size: usize,
    ) -> Result<Self> {
        if HeapPage::slots_per_page(page_size, desc.byte_size()) == 0 {
            return Err(Error::InvalidSchema("tuple does not fit on a page"));
        }
        Ok(Self {
            path,
            file: Mutex::new(file),
            table_id,
            desc,
            page_size,
        })
    }

    #[inline]
    pub fn id(&self) -> TableId {
        self.table_id
    }

    #[inline]
    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    // ========================================================================
    // Page I/O
    // ========================================================================

    /// Number of whole pages in the file.
    pub fn num_pages(&self) -> Result<u32> {
        let file = self.file.lock();
        self.pages_in(&file)
    }

    fn pages_in(&self, file: &File) -> Result<u32> {
        Ok((file.metadata()?.len() / self.page_size as u64) as u32)
    }

    fn offset(&self, pid: PageId) -> u64 {
        pid.page_number() as u64 * self.page_size as u64
    }

    /// Read and decode a page.
    ///
    /// Returns `None` if the page lies past the end of the file or belongs
    /// to another table.
    pub fn read_page(&self, pid: PageId) -> Result<Option<HeapPage>> {
        if pid.table_id() != self.table_id {
            return Ok(None);
        }

        let mut data = vec![0u8; self.page_size];
        {
            let mut file = self.file.lock();
            if pid.page_number() >= self.pages_in(&file)? {
                return Ok(None);
            }
            file.seek(SeekFrom::Start(self.offset(pid)))?;
            file.read_exact(&mut data)?;
        }

        HeapPage::new(pid, self.desc.clone(), &data).map(Some)
    }

    /// Write a page's current image at its offset.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        self.write_page_data(page.id(), &page.page_data())
    }

    /// Write a raw page image. Extends the file when `pid` is the page just
    /// past the end.
    ///
    /// # Durability
    /// Calls `sync_data()` after the write.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if `data` is not exactly one page
    pub fn write_page_data(&self, pid: PageId, data: &[u8]) -> Result<()> {
        if data.len() != self.page_size {
            return Err(Error::SchemaMismatch(format!(
                "page image is {} bytes, expected {}",
                data.len(),
                self.page_size
            )));
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset(pid)))?;
        file.write_all(data)?;
        file.sync_data()?;
        Ok(())
    }

    /// Append one empty page and return its id.
    ///
    /// The length check and the write happen under the file lock, so two
    /// concurrent appenders get different pages.
    pub fn append_empty_page(&self) -> Result<PageId> {
        let mut file = self.file.lock();
        let pid = PageId::new(self.table_id, self.pages_in(&file)?);
        file.seek(SeekFrom::Start(self.offset(pid)))?;
        file.write_all(&HeapPage::empty_page_data(self.page_size))?;
        file.sync_data()?;
        log::debug!("{}: appended {}", self.table_id, pid);
        Ok(pid)
    }

    // ========================================================================
    // Tuple placement (through the buffer pool)
    // ========================================================================

    /// Insert `tuple` on the first page with a free slot, appending a page
    /// when every existing page is full. Sets the tuple's record id.
    ///
    /// Pages are scanned under shared locks. The page that takes the tuple
    /// is upgraded to exclusive; full pages the transaction did not already
    /// hold are released again.
    ///
    /// Returns the modified pages; the caller marks them dirty.
    ///
    /// Two transactions that both hold the shared lock on the same page with
    /// room cannot upgrade: each waits for the other and both run into the
    /// lock timeout. Callers abort on `TransactionAborted` and retry; no
    /// waits-for detection picks a single victim.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if the tuple's schema differs from the table's
    /// - `Error::TransactionAborted` if a lock wait times out
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>> {
        if **tuple.desc() != *self.desc {
            return Err(Error::SchemaMismatch(format!(
                "tuple [{}] does not match table [{}]",
                tuple.desc(),
                self.desc
            )));
        }

        for page_number in 0..self.num_pages()? {
            let pid = PageId::new(self.table_id, page_number);
            let held_before = pool.holds_lock(tid, pid);

            let page = pool.get_page(tid, pid, Permissions::ReadOnly)?;
            let has_room = page.read().as_heap().num_empty_slots() > 0;
            if has_room {
                let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
                page.write().as_heap_mut().insert_tuple(tuple)?;
                return Ok(vec![page]);
            }

            if !held_before {
                pool.unsafe_release_page(tid, pid);
            }
        }

        loop {
            let pid = self.append_empty_page()?;
            let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            let inserted = page.write().as_heap_mut().insert_tuple(tuple);
            match inserted {
                Ok(_) => return Ok(vec![page]),
                // Another inserter filled the fresh page first.
                Err(Error::PageFull(_)) => pool.unsafe_release_page(tid, pid),
                Err(e) => return Err(e),
            }
        }
    }

    /// Remove `tuple` from the page its record id names.
    ///
    /// # Errors
    /// - `Error::MissingRecordId` if the tuple was never placed
    /// - `Error::InvalidRecord` if the record id names another table or an
    ///   empty slot
    /// - `Error::PageNotFound` if the page does not exist
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        if rid.page_id().table_id() != self.table_id {
            return Err(Error::InvalidRecord {
                rid,
                reason: "tuple is in another table",
            });
        }

        let page = pool.get_page(tid, rid.page_id(), Permissions::ReadWrite)?;
        page.write().as_heap_mut().delete_tuple(tuple)?;
        Ok(vec![page])
    }

    /// Iterate over every tuple of the table on behalf of `tid`.
    pub fn iter<'a>(&'a self, pool: &'a BufferPool, tid: TransactionId) -> HeapFileIterator<'a> {
        HeapFileIterator::new(self, pool, tid)
    }
}

impl std::fmt::Debug for HeapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFile")
            .field("table_id", &self.table_id)
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .finish()
    }
}
