//! FIFO (First-In-First-Out) replacement policy.
//!
//! Pages are evicted in the order they entered the pool. Re-access does not
//! reorder. The pool decides which pages are eligible at eviction time, so
//! the replacer only keeps the order.

use std::collections::{HashSet, VecDeque};

use crate::common::PageId;

/// Insertion-ordered set of cached page ids.
#[derive(Debug, Default)]
pub struct FifoReplacer {
    /// Front = oldest.
    queue: VecDeque<PageId>,

    /// Set for O(1) membership check.
    in_queue: HashSet<PageId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a page entered the pool.
    ///
    /// For FIFO, only adds to the queue if not already present.
    pub fn record_access(&mut self, pid: PageId) {
        if self.in_queue.insert(pid) {
            self.queue.push_back(pid);
        }
    }

    /// Remove and return the oldest page accepted by `evictable`.
    ///
    /// Pages the predicate rejects keep their position.
    pub fn evict_where<F>(&mut self, mut evictable: F) -> Option<PageId>
    where
        F: FnMut(PageId) -> bool,
    {
        let idx = self.queue.iter().position(|&pid| evictable(pid))?;
        let pid = self.queue.remove(idx)?;
        self.in_queue.remove(&pid);
        Some(pid)
    }

    /// Forget a page that left the pool by other means (discard).
    pub fn remove(&mut self, pid: PageId) {
        if self.in_queue.remove(&pid) {
            self.queue.retain(|&p| p != pid);
        }
    }

    /// Pages in eviction order.
    pub fn iter(&self) -> impl Iterator<Item = PageId> + '_ {
        self.queue.iter().copied()
    }

    /// Number of tracked pages.
    pub fn size(&self) -> usize {
        self.queue.len()
    }
}
