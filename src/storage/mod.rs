//! Storage layer - table files and page formats.
//!
//! This module handles persistent storage:
//! - [`HeapFile`] - One table as a flat file of heap pages
//! - [`HeapFileIterator`] - Page-by-page scan through the buffer pool
//! - [`page`] - Page types and layouts

mod heap_file;
mod heap_file_iterator;
pub mod page;

pub use heap_file::HeapFile;
pub use heap_file_iterator::HeapFileIterator;
