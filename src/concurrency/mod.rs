//! Concurrency control.
//!
//! # Components
//! - [`LockManager`] - Page-level shared/exclusive locks with bounded waits
//! - [`Transaction`] - Handle that commits or aborts a [`TransactionId`]

mod lock_manager;
mod transaction;

pub use lock_manager::{LockManager, LockMode};
pub use transaction::Transaction;
