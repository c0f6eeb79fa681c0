//! heapstore - heap-file storage with a transactional buffer pool.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Database (database.rs)                     │
//! │           Config + Catalog + LogManager + BufferPool            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Transaction Layer (concurrency/)               │   │
//! │  │   Transaction handle + LockManager (strict 2PL, pages)   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Buffer Pool (buffer/)                       │   │
//! │  │   page cache + FIFO eviction of clean pages + stats      │   │
//! │  │   commit: log → force → write;  abort: before-image      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌──────────────────────────────┐  ┌────────────────────────┐  │
//! │  │   Storage Layer (storage/)   │  │  Recovery (recovery/)  │  │
//! │  │ HeapFile + HeapPage + scan   │  │  LogFile / NullLog     │  │
//! │  └──────────────────────────────┘  └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Identifiers, errors, permissions and configuration
//! - [`tuple`] - Field types, schemas and tuples
//! - [`storage`] - Table files and page formats
//! - [`buffer`] - The page cache and its eviction order
//! - [`concurrency`] - Page locks and transaction handles
//! - [`recovery`] - The durability log
//! - [`catalog`] - Table registry
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use heapstore::{Config, Database, Field, Tuple, TupleDesc, Type};
//!
//! let db = Database::new(Config::default());
//! let desc = Arc::new(TupleDesc::from_types(vec![Type::Int, Type::Int]).unwrap());
//! let table = db.open_table("accounts.dat", desc.clone(), "accounts").unwrap();
//!
//! let txn = db.begin();
//! let mut row = Tuple::new(desc, vec![Field::Int(1), Field::Int(100)]).unwrap();
//! db.buffer_pool().insert_tuple(txn.id(), table.id(), &mut row).unwrap();
//! txn.commit().unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
mod database;
pub mod recovery;
pub mod storage;
pub mod tuple;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DEFAULT_LOCK_TIMEOUT, DEFAULT_PAGE_SIZE, DEFAULT_POOL_PAGES, STRING_LEN};
pub use common::{
    Config, Error, PageId, Permissions, RecordId, Result, TableId, TransactionId,
};

pub use buffer::{BufferPool, BufferPoolStats, PageRef, StatsSnapshot};
pub use catalog::Catalog;
pub use concurrency::{LockManager, LockMode, Transaction};
pub use database::Database;
pub use recovery::{LogFile, LogManager, NullLog};
pub use storage::page::{HeapPage, Page};
pub use storage::{HeapFile, HeapFileIterator};
pub use tuple::{Field, Tuple, TupleDesc, Type};
