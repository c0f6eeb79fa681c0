//! Error types for heapstore.

use thiserror::Error;

use super::{PageId, RecordId, TableId, TransactionId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in heapstore.
///
/// Expected control flow ("lock not granted yet", "no free slot on this
/// page", "no field with that name") is expressed with `bool`/`Option` and
/// never reaches this enum.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a table file or the log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The page lies beyond the end of its table file.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// A lock could not be granted before the wait timeout.
    ///
    /// The caller must abort the whole transaction.
    #[error("{tid} aborted while waiting for a lock on {pid}")]
    TransactionAborted { tid: TransactionId, pid: PageId },

    /// The buffer pool is full and every cached page is dirty.
    #[error("no evictable page: every cached page is dirty")]
    NoEvictablePage,

    /// No table is registered under this id.
    #[error("table {0} not found")]
    TableNotFound(TableId),

    /// A tuple's record id does not name an occupied slot of its table.
    #[error("invalid record {rid}: {reason}")]
    InvalidRecord { rid: RecordId, reason: &'static str },

    /// A tuple without a record id was handed to a delete.
    #[error("tuple has no record id")]
    MissingRecordId,

    /// The page has no empty slot left.
    #[error("{0} has no empty slot")]
    PageFull(PageId),

    /// A tuple or field does not fit the schema it is used with.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A schema could not be constructed.
    #[error("invalid schema: {0}")]
    InvalidSchema(&'static str),

    /// A log record failed its checksum or was truncated.
    #[error("corrupt log record at offset {offset}")]
    CorruptLog { offset: u64 },
}
