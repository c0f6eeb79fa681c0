use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Result, TransactionId};

/// A running transaction.
///
/// Completing it consumes the handle. A handle dropped without completion
/// aborts, so locks are never leaked by an early return.
pub struct Transaction {
    tid: TransactionId,
    pool: Arc<BufferPool>,
    completed: bool,
}

impl Transaction {
    pub fn new(pool: Arc<BufferPool>) -> Self {
        let tid = TransactionId::next();
        log::debug!("{} started", tid);
        Self {
            tid,
            pool,
            completed: false,
        }
    }

    #[inline]
    pub fn id(&self) -> TransactionId {
        self.tid
    }

    /// Flush this transaction's pages and release its locks.
    ///
    /// # Errors
    /// A failed flush is returned; the handle is then dropped, which aborts.
    pub fn commit(mut self) -> Result<()> {
        self.pool.transaction_complete(self.tid, true)?;
        self.completed = true;
        Ok(())
    }

    /// Roll back this transaction's pages and release its locks.
    pub fn abort(mut self) -> Result<()> {
        self.completed = true;
        self.pool.transaction_complete(self.tid, false)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.completed {
            if let Err(e) = self.pool.transaction_complete(self.tid, false) {
                log::warn!("abort of {} on drop failed: {}", self.tid, e);
            }
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("tid", &self.tid)
            .field("completed", &self.completed)
            .finish()
    }
}
