//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between transactions and table
//! files. Every page access goes through it and takes a page lock.
//!
//! # Components
//! - [`BufferPool`] - The transactional page cache
//! - [`PageRef`] - Shared handle to a cached page
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction order

mod buffer_pool;
pub mod replacer;
mod stats;

pub use buffer_pool::{BufferPool, PageRef};
pub use stats::{BufferPoolStats, StatsSnapshot};
