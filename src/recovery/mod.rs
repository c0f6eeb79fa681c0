//! Durability logging.
//!
//! - [`LogManager`] - What the buffer pool calls before writing a page
//! - [`LogFile`] - Checksummed append-only log of page images
//! - [`NullLog`] - Discards everything

mod log_file;

pub use log_file::{LogFile, LogManager, LogRecord, NullLog};
