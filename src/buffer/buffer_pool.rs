//! Buffer Pool - the transactional page cache.
//!
//! The [`BufferPool`] provides:
//! - Page caching between table files and memory, bounded by a page count
//! - Page locking on every access, through the [`LockManager`]
//! - NO STEAL: dirty pages stay in memory until their transaction commits
//! - FORCE: commit logs and writes every page the transaction dirtied

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::BufferPoolStats;
use crate::catalog::Catalog;
use crate::common::{Config, Error, PageId, Permissions, Result, TableId, TransactionId};
use crate::concurrency::LockManager;
use crate::recovery::LogManager;
use crate::storage::page::Page;
use crate::tuple::Tuple;

/// Shared handle to a cached page.
pub type PageRef = Arc<RwLock<Page>>;

/// Cache membership and arrival order, guarded together.
struct PoolState {
    pages: HashMap<PageId, PageRef>,
    replacer: FifoReplacer,
}

/// Caches pages of every table and mediates all access to them.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                          BufferPool                          │
/// │  ┌──────────────────────────────┐   ┌──────────────────────┐ │
/// │  │ state: Mutex<PoolState>      │   │ lock_manager         │ │
/// │  │  pages: PageId → PageRef     │   │ Mutex + Condvar      │ │
/// │  │  replacer: FifoReplacer      │   └──────────────────────┘ │
/// │  └──────────────────────────────┘   ┌──────────────────────┐ │
/// │  ┌──────────────┐ ┌─────────────┐   │ stats (atomics)      │ │
/// │  │ catalog      │ │ log         │   └──────────────────────┘ │
/// │  │ TableId→File │ │ LogManager  │                            │
/// │  └──────────────┘ └─────────────┘                            │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `state`: one `Mutex` so check-then-insert and evict-then-insert are
///   atomic. It is not held across the disk read of a miss; the map is
///   checked again before the loaded page is inserted
/// - pages: each behind its own `RwLock`; the pool mutex may be held while
///   taking a page lock, never the other way round
/// - `lock_manager`: its own mutex, never taken while holding `state`
/// - `stats`: atomic counters
pub struct BufferPool {
    state: Mutex<PoolState>,

    /// Maximum number of cached pages.
    capacity: usize,

    lock_manager: LockManager,

    catalog: Arc<Catalog>,

    log: Arc<dyn LogManager>,

    /// How long `get_page` waits for a lock before aborting the caller.
    lock_timeout: Duration,

    stats: BufferPoolStats,
}

impl BufferPool {
    /// Create a buffer pool holding at most `capacity` pages.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(
        capacity: usize,
        catalog: Arc<Catalog>,
        log: Arc<dyn LogManager>,
        lock_timeout: Duration,
    ) -> Self {
        assert!(capacity > 0, "capacity must be > 0");

        Self {
            state: Mutex::new(PoolState {
                pages: HashMap::with_capacity(capacity),
                replacer: FifoReplacer::new(),
            }),
            capacity,
            lock_manager: LockManager::new(),
            catalog,
            log,
            lock_timeout,
            stats: BufferPoolStats::new(),
        }
    }

    pub fn from_config(config: &Config, catalog: Arc<Catalog>, log: Arc<dyn LogManager>) -> Self {
        Self::new(config.pool_pages, catalog, log, config.lock_timeout)
    }

    // ========================================================================
    // Public API: Page access
    // ========================================================================

    /// Lock `pid` for `tid` and return the cached page, loading it on a miss.
    ///
    /// Blocks until the lock is granted or the lock timeout elapses.
    ///
    /// # Errors
    /// - `Error::TransactionAborted` if the lock wait timed out
    /// - `Error::TableNotFound` if the page's table is not in the catalog
    /// - `Error::PageNotFound` if the page lies past the end of its file
    /// - `Error::NoEvictablePage` if the pool is full of dirty pages
    pub fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permissions) -> Result<PageRef> {
        if let Err(e) = self.lock_manager.lock(pid, tid, perm, self.lock_timeout) {
            BufferPoolStats::bump(&self.stats.lock_timeouts);
            return Err(e);
        }

        if let Some(page) = self.state.lock().pages.get(&pid) {
            BufferPoolStats::bump(&self.stats.cache_hits);
            return Ok(page.clone());
        }
        BufferPoolStats::bump(&self.stats.cache_misses);

        // Disk read without the pool mutex. Our page lock keeps writers
        // out, so the on-disk image cannot change underneath us.
        let file = self.catalog.database_file(pid.table_id())?;
        let page = file.read_page(pid)?.ok_or(Error::PageNotFound(pid))?;
        BufferPoolStats::bump(&self.stats.pages_read);

        let mut state = self.state.lock();
        // Another shared holder may have loaded it meanwhile.
        if let Some(cached) = state.pages.get(&pid) {
            return Ok(cached.clone());
        }
        if state.pages.len() >= self.capacity {
            self.evict_page(&mut state)?;
        }
        let page: PageRef = Arc::new(RwLock::new(Page::from(page)));
        state.pages.insert(pid, page.clone());
        state.replacer.record_access(pid);
        Ok(page)
    }

    /// Release `tid`'s lock on `pid` before the transaction ends.
    ///
    /// Breaks two-phase locking; only for pages the transaction merely
    /// inspected.
    pub fn unsafe_release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release_lock(pid, tid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.is_holding(pid, tid)
    }

    // ========================================================================
    // Public API: Tuple mutation
    // ========================================================================

    /// Insert `tuple` into `table_id` on behalf of `tid` and set its record
    /// id. Every page touched is marked dirty and kept in the cache.
    ///
    /// # Errors
    /// - `Error::TableNotFound` if the table is not in the catalog
    /// - `Error::SchemaMismatch` if the tuple does not fit the table
    /// - `Error::TransactionAborted` if a lock wait timed out
    /// - `Error::NoEvictablePage` if the pool is full of dirty pages
    pub fn insert_tuple(&self, tid: TransactionId, table_id: TableId, tuple: &mut Tuple) -> Result<()> {
        let file = self.catalog.database_file(table_id)?;
        let pages = file.insert_tuple(self, tid, tuple)?;
        self.mark_dirty_pages(tid, pages)
    }

    /// Delete `tuple` (located by its record id) on behalf of `tid`.
    ///
    /// # Errors
    /// - `Error::MissingRecordId` if the tuple was never placed
    /// - `Error::InvalidRecord` if its slot is empty or out of range
    /// - `Error::TransactionAborted` if a lock wait timed out
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        let file = self.catalog.database_file(rid.page_id().table_id())?;
        let pages = file.delete_tuple(self, tid, tuple)?;
        self.mark_dirty_pages(tid, pages)
    }

    fn mark_dirty_pages(&self, tid: TransactionId, pages: Vec<PageRef>) -> Result<()> {
        for page in pages {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(tid);
                guard.id()
            };

            let mut state = self.state.lock();
            if !state.pages.contains_key(&pid) && state.pages.len() >= self.capacity {
                self.evict_page(&mut state)?;
            }
            state.pages.insert(pid, page);
            state.replacer.record_access(pid);
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Transaction completion
    // ========================================================================

    /// Commit or abort `tid`, then release all of its locks.
    ///
    /// Commit flushes every page `tid` dirtied. Abort restores those pages
    /// from their before-images in memory; nothing is written.
    ///
    /// # Errors
    /// - I/O and log errors from a commit flush. The locks stay held so the
    ///   caller can still abort.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.flush_pages(tid)?;
            self.lock_manager.release_all_locks(tid);
            log::debug!("{} committed", tid);
            Ok(())
        } else {
            let restored = self.rollback_pages(tid);
            self.lock_manager.release_all_locks(tid);
            log::debug!("{} aborted", tid);
            restored
        }
    }

    /// Write every page dirtied by `tid` to its table file, logging first.
    ///
    /// # Errors
    /// - I/O errors from the log or the table file
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        for page in self.pages_touched_by(tid) {
            let mut guard = page.write();
            if guard.dirtier() == Some(tid) {
                self.flush_locked(&mut guard)?;
            }
        }
        Ok(())
    }

    fn rollback_pages(&self, tid: TransactionId) -> Result<()> {
        let mut first_err = None;
        for page in self.pages_touched_by(tid) {
            let mut guard = page.write();
            let pid = guard.id();
            if let Err(e) = guard.rollback() {
                log::warn!("rollback of {} for {} failed: {}", pid, tid, e);
                first_err.get_or_insert(e);
                continue;
            }
            BufferPoolStats::bump(&self.stats.rollbacks);
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Cached pages dirtied by `tid`, plus pages it holds that were mutated
    /// without being marked yet.
    fn pages_touched_by(&self, tid: TransactionId) -> Vec<PageRef> {
        let held = self.lock_manager.held_pages(tid);
        let state = self.state.lock();
        state
            .pages
            .iter()
            .filter(|(pid, page)| {
                let page = page.read();
                match page.dirtier() {
                    Some(owner) => owner == tid,
                    None => !page.is_clean() && held.contains(pid),
                }
            })
            .map(|(_, page)| page.clone())
            .collect()
    }

    // ========================================================================
    // Public API: Flush and discard
    // ========================================================================

    /// Flush one cached page if it is dirty.
    ///
    /// # Errors
    /// - I/O errors from the log or the table file
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let page = self.state.lock().pages.get(&pid).cloned();
        match page {
            Some(page) => self.flush_locked(&mut page.write()),
            None => Ok(()),
        }
    }

    /// Flush every dirty page, committed or not.
    ///
    /// Uncommitted data reaches disk and its before-image is dropped, so
    /// those transactions can no longer be rolled back. Test and shutdown
    /// use only.
    ///
    /// # Errors
    /// - I/O errors from the log or the table file
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<PageRef> = self.state.lock().pages.values().cloned().collect();
        for page in pages {
            self.flush_locked(&mut page.write())?;
        }
        Ok(())
    }

    /// Drop a page from the cache without writing it.
    pub fn discard_page(&self, pid: PageId) {
        let mut state = self.state.lock();
        if state.pages.remove(&pid).is_some() {
            state.replacer.remove(pid);
            log::debug!("discarded {}", pid);
        }
    }

    /// Log, force and write one page, then accept it as clean.
    fn flush_locked(&self, page: &mut Page) -> Result<()> {
        let Some(tid) = page.dirtier() else {
            return Ok(());
        };
        let pid = page.id();
        let file = self.catalog.database_file(pid.table_id())?;

        let after = page.page_data();
        self.log.log_write(tid, pid, &page.before_image_data(), &after)?;
        self.log.force()?;
        file.write_page_data(pid, &after)?;
        BufferPoolStats::bump(&self.stats.pages_written);

        page.mark_clean();
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_cached(&self, pid: PageId) -> bool {
        self.state.lock().pages.contains_key(&pid)
    }

    /// Cached page ids, oldest first.
    pub fn cached_pages(&self) -> Vec<PageId> {
        self.state.lock().replacer.iter().collect()
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    // ========================================================================
    // Internal: Eviction
    // ========================================================================

    /// Drop the oldest clean page. Clean pages match their on-disk image, so
    /// nothing is written.
    fn evict_page(&self, state: &mut PoolState) -> Result<()> {
        let PoolState { pages, replacer } = state;
        // A page someone is writing right now is not clean.
        let victim = replacer.evict_where(|pid| {
            pages
                .get(&pid)
                .and_then(|page| page.try_read().map(|page| page.is_clean()))
                .unwrap_or(false)
        });

        match victim {
            Some(pid) => {
                pages.remove(&pid);
                BufferPoolStats::bump(&self.stats.evictions);
                log::debug!("evicted {}", pid);
                Ok(())
            }
            None => {
                log::warn!("no evictable page among {} cached pages", pages.len());
                Err(Error::NoEvictablePage)
            }
        }
    }
}
