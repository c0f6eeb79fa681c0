//! Common types and utilities shared across heapstore.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`Config`]
//! - Error types
//! - Identifiers (TableId, PageId, RecordId, TransactionId)
//! - [`Permissions`]

pub mod config;
pub mod error;
mod page_id;
mod permissions;
mod record_id;
mod transaction_id;

pub use config::Config;
pub use error::{Error, Result};
pub use page_id::{PageId, TableId};
pub use permissions::Permissions;
pub use record_id::RecordId;
pub use transaction_id::TransactionId;
