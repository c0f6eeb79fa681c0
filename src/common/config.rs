//! Configuration constants and the per-database [`Config`].

use std::time::Duration;

/// Default size of a page in bytes (4KB).
///
/// Every table file is a flat sequence of pages of this size unless the
/// database is configured otherwise. Tests use much smaller pages so that a
/// handful of tuples fills a page.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages the buffer pool may cache.
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Default bound on a single lock wait before the waiter is aborted.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Maximum number of bytes stored for a string field.
///
/// On disk a string occupies a 4-byte length prefix followed by exactly
/// this many bytes, zero-padded.
pub const STRING_LEN: usize = 128;

/// Runtime settings for a [`Database`](crate::Database).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use heapstore::Config;
///
/// let config = Config::default()
///     .with_page_size(1024)
///     .with_pool_pages(8)
///     .with_lock_timeout(Duration::from_millis(200));
/// assert_eq!(config.page_size, 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Bytes per page for every table opened through this database.
    pub page_size: usize,
    /// Maximum number of pages held by the buffer pool.
    pub pool_pages: usize,
    /// How long `get_page` waits for a lock before aborting.
    pub lock_timeout: Duration,
}

impl Config {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_pool_pages(mut self, pool_pages: usize) -> Self {
        self.pool_pages = pool_pages;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            pool_pages: DEFAULT_POOL_PAGES,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}
