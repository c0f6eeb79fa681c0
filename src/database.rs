//! Database - the execution context.
//!
//! Bundles the catalog, the durability log and the buffer pool that every
//! operation needs. Several independent databases can live in one process.

use std::path::Path;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{Config, Result};
use crate::concurrency::Transaction;
use crate::recovery::{LogManager, NullLog};
use crate::storage::HeapFile;
use crate::tuple::TupleDesc;

pub struct Database {
    config: Config,
    catalog: Arc<Catalog>,
    log: Arc<dyn LogManager>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    /// A database that discards its log.
    pub fn new(config: Config) -> Self {
        Self::with_log(config, Arc::new(NullLog))
    }

    pub fn with_log(config: Config, log: Arc<dyn LogManager>) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::from_config(&config, catalog.clone(), log.clone()));
        Self {
            config,
            catalog,
            log,
            buffer_pool,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    #[inline]
    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    #[inline]
    pub fn log(&self) -> &Arc<dyn LogManager> {
        &self.log
    }

    /// Start a transaction against this database's buffer pool.
    pub fn begin(&self) -> Transaction {
        Transaction::new(self.buffer_pool.clone())
    }

    /// Open (or create) a table file and register it under `name`.
    ///
    /// # Errors
    /// - `Error::InvalidSchema` if a tuple does not fit on a page
    /// - I/O errors from opening the file
    pub fn open_table<P: AsRef<Path>>(
        &self,
        path: P,
        desc: Arc<TupleDesc>,
        name: &str,
    ) -> Result<Arc<HeapFile>> {
        let file = Arc::new(HeapFile::open(path, desc, self.config.page_size)?);
        self.catalog.add_table(file.clone(), name);
        Ok(file)
    }

    /// Replace the buffer pool with an empty one of `pool_pages` pages.
    ///
    /// Cached pages and lock state are dropped; outstanding transactions
    /// keep the old pool.
    pub fn reset_buffer_pool(&mut self, pool_pages: usize) -> &Arc<BufferPool> {
        self.config = self.config.with_pool_pages(pool_pages);
        self.buffer_pool = Arc::new(BufferPool::from_config(
            &self.config,
            self.catalog.clone(),
            self.log.clone(),
        ));
        &self.buffer_pool
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
