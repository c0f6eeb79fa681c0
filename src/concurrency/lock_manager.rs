//! Lock Manager - page-granularity shared/exclusive locks.
//!
//! The [`LockManager`] provides:
//! - Shared and exclusive page locks with upgrade from a sole shared holder
//! - A FIFO queue of outstanding requests per page
//! - Bounded waits: a request not granted before its deadline is cancelled
//!   and reported as [`Error::TransactionAborted`]
//!
//! There is no deadlock detection; the wait timeout is what breaks cycles.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::common::{Error, PageId, Permissions, Result, TransactionId};

/// Current lock mode of a page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    #[default]
    Unlocked,
    Shared,
    Exclusive,
}

impl From<Permissions> for LockMode {
    fn from(perm: Permissions) -> Self {
        match perm {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        }
    }
}

/// An outstanding (not yet granted) request.
#[derive(Debug, Clone, Copy)]
struct LockRequest {
    seq: u64,
    tid: TransactionId,
    mode: LockMode,
}

/// Lock state of one page.
#[derive(Debug, Default)]
struct LockState {
    mode: LockMode,
    /// Every shared holder, or the single exclusive holder.
    holders: HashSet<TransactionId>,
    /// Outstanding requests in arrival order.
    queue: VecDeque<LockRequest>,
}

impl LockState {
    fn can_grant(&self, tid: TransactionId, mode: LockMode) -> bool {
        match (self.mode, mode) {
            (LockMode::Unlocked, _) => true,
            (LockMode::Shared, LockMode::Shared) => true,
            // Upgrade only for the sole shared holder.
            (LockMode::Shared, _) => self.holders.len() == 1 && self.holders.contains(&tid),
            // Re-entrant for the holder, denied to everyone else.
            (LockMode::Exclusive, _) => self.holders.contains(&tid),
        }
    }

    fn grant(&mut self, tid: TransactionId, mode: LockMode) {
        match mode {
            LockMode::Exclusive => {
                self.mode = LockMode::Exclusive;
                self.holders.clear();
                self.holders.insert(tid);
            }
            _ => {
                if self.mode == LockMode::Unlocked {
                    self.mode = LockMode::Shared;
                }
                self.holders.insert(tid);
            }
        }
    }

    /// Drop every trace of `tid`. Returns whether it held the lock.
    fn release(&mut self, tid: TransactionId) -> bool {
        self.queue.retain(|req| req.tid != tid);
        let held = self.holders.remove(&tid);
        if self.holders.is_empty() {
            self.mode = LockMode::Unlocked;
        }
        held
    }

    fn is_idle(&self) -> bool {
        self.holders.is_empty() && self.queue.is_empty()
    }
}

#[derive(Debug, Default)]
struct LockTable {
    pages: HashMap<PageId, LockState>,
    /// Pages on which each transaction holds a lock.
    held: HashMap<TransactionId, HashSet<PageId>>,
    next_seq: u64,
}

impl LockTable {
    fn enqueue(&mut self, pid: PageId, tid: TransactionId, mode: LockMode) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.pages
            .entry(pid)
            .or_default()
            .queue
            .push_back(LockRequest { seq, tid, mode });
        seq
    }

    fn try_grant(&mut self, pid: PageId, tid: TransactionId, mode: LockMode, seq: u64) -> bool {
        // Only requests issued by `enqueue` and still outstanding.
        let Some(state) = self.pages.get_mut(&pid) else {
            return false;
        };
        if !state.queue.iter().any(|req| req.seq == seq && req.tid == tid) {
            return false;
        }
        if !state.can_grant(tid, mode) {
            return false;
        }
        state.grant(tid, mode);
        state.queue.retain(|req| req.seq != seq);
        self.held.entry(tid).or_default().insert(pid);
        log::trace!("granted {:?} on {} to {}", mode, pid, tid);
        true
    }

    fn cancel(&mut self, pid: PageId, seq: u64) {
        if let Some(state) = self.pages.get_mut(&pid) {
            state.queue.retain(|req| req.seq != seq);
            if state.is_idle() {
                self.pages.remove(&pid);
            }
        }
    }

    fn release(&mut self, pid: PageId, tid: TransactionId) {
        if let Some(state) = self.pages.get_mut(&pid) {
            state.release(tid);
            if state.is_idle() {
                self.pages.remove(&pid);
            }
        }
        if let Some(pages) = self.held.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.held.remove(&tid);
            }
        }
    }
}

/// Grants page locks to transactions under strict two-phase locking.
///
/// # Thread Safety
/// All state sits behind one `Mutex`; waiters park on a `Condvar` that is
/// notified whenever a lock is released or a request is withdrawn.
///
/// # Usage
/// ```
/// use std::time::Duration;
/// use heapstore::concurrency::LockManager;
/// use heapstore::{PageId, Permissions, TableId, TransactionId};
///
/// let lm = LockManager::new();
/// let pid = PageId::new(TableId(1), 0);
/// let (t1, t2) = (TransactionId::next(), TransactionId::next());
///
/// lm.lock(pid, t1, Permissions::ReadOnly, Duration::from_millis(10)).unwrap();
/// lm.lock(pid, t2, Permissions::ReadOnly, Duration::from_millis(10)).unwrap();
/// assert!(lm.lock(pid, t2, Permissions::ReadWrite, Duration::from_millis(10)).is_err());
/// ```
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the intent to lock `pid`. Returns the request's sequence
    /// number, to be passed to [`acquire_lock`](Self::acquire_lock).
    pub fn add_request(&self, pid: PageId, tid: TransactionId, perm: Permissions) -> u64 {
        self.table.lock().enqueue(pid, tid, perm.into())
    }

    /// Try once to grant request `seq`; never blocks.
    ///
    /// Returns `false` for a `seq` that was never issued to `tid` on `pid`,
    /// or whose request was already granted or withdrawn.
    pub fn acquire_lock(
        &self,
        pid: PageId,
        tid: TransactionId,
        perm: Permissions,
        seq: u64,
    ) -> bool {
        self.table.lock().try_grant(pid, tid, perm.into(), seq)
    }

    /// Block until the lock is granted or `timeout` elapses.
    ///
    /// # Errors
    /// - `Error::TransactionAborted` on timeout; the request is withdrawn
    pub fn lock(
        &self,
        pid: PageId,
        tid: TransactionId,
        perm: Permissions,
        timeout: Duration,
    ) -> Result<()> {
        let mode = LockMode::from(perm);
        let deadline = Instant::now() + timeout;

        let mut table = self.table.lock();
        let seq = table.enqueue(pid, tid, mode);
        loop {
            if table.try_grant(pid, tid, mode, seq) {
                return Ok(());
            }
            if self.released.wait_until(&mut table, deadline).timed_out() {
                if table.try_grant(pid, tid, mode, seq) {
                    return Ok(());
                }
                table.cancel(pid, seq);
                log::warn!("{} timed out waiting for {:?} on {}", tid, mode, pid);
                return Err(Error::TransactionAborted { tid, pid });
            }
        }
    }

    /// Drop `tid`'s lock and queued requests on one page.
    pub fn release_lock(&self, pid: PageId, tid: TransactionId) {
        self.table.lock().release(pid, tid);
        self.released.notify_all();
    }

    /// Drop every lock and queued request of `tid`.
    pub fn release_all_locks(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let pages: Vec<PageId> = table
            .held
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        for pid in pages {
            table.release(pid, tid);
        }
        // Requests that were never granted do not show up in `held`.
        let waiting: Vec<PageId> = table
            .pages
            .iter()
            .filter(|(_, state)| state.queue.iter().any(|req| req.tid == tid))
            .map(|(&pid, _)| pid)
            .collect();
        for pid in waiting {
            table.release(pid, tid);
        }
        drop(table);
        self.released.notify_all();
    }

    /// Whether `tid` holds a lock of any mode on `pid`.
    pub fn is_holding(&self, pid: PageId, tid: TransactionId) -> bool {
        self.table
            .lock()
            .pages
            .get(&pid)
            .is_some_and(|state| state.holders.contains(&tid))
    }

    /// Pages on which `tid` currently holds a lock.
    pub fn held_pages(&self, tid: TransactionId) -> Vec<PageId> {
        let mut pages: Vec<PageId> = self
            .table
            .lock()
            .held
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }

    pub fn lock_mode(&self, pid: PageId) -> LockMode {
        self.table
            .lock()
            .pages
            .get(&pid)
            .map_or(LockMode::Unlocked, |state| state.mode)
    }

    /// Number of outstanding (ungranted) requests on `pid`.
    pub fn queued_requests(&self, pid: PageId) -> usize {
        self.table
            .lock()
            .pages
            .get(&pid)
            .map_or(0, |state| state.queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;

    const SHORT: Duration = Duration::from_millis(20);
    const LONG: Duration = Duration::from_secs(5);

    fn pid(n: u32) -> PageId {
        PageId::new(TableId(1), n)
    }

    #[test]
    fn test_shared_locks_coexist() {
        let lm = LockManager::new();
        let (t1, t2, t3) = (TransactionId::next(), TransactionId::next(), TransactionId::next());

        lm.lock(pid(0), t1, Permissions::ReadOnly, SHORT).unwrap();
        lm.lock(pid(0), t2, Permissions::ReadOnly, SHORT).unwrap();
        assert_eq!(lm.lock_mode(pid(0)), LockMode::Shared);

        // A third transaction cannot take it exclusively.
        let err = lm.lock(pid(0), t3, Permissions::ReadWrite, SHORT);
        assert!(matches!(err, Err(Error::TransactionAborted { .. })));
        assert!(!lm.is_holding(pid(0), t3));
    }

    #[test]
    fn test_exclusive_excludes_everyone_else() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::next(), TransactionId::next());

        lm.lock(pid(0), t1, Permissions::ReadWrite, SHORT).unwrap();
        assert!(lm.lock(pid(0), t2, Permissions::ReadOnly, SHORT).is_err());
        assert!(lm.lock(pid(0), t2, Permissions::ReadWrite, SHORT).is_err());
    }

    #[test]
    fn test_exclusive_is_reentrant() {
        let lm = LockManager::new();
        let t1 = TransactionId::next();

        lm.lock(pid(0), t1, Permissions::ReadWrite, SHORT).unwrap();
        lm.lock(pid(0), t1, Permissions::ReadWrite, SHORT).unwrap();
        lm.lock(pid(0), t1, Permissions::ReadOnly, SHORT).unwrap();
        assert_eq!(lm.lock_mode(pid(0)), LockMode::Exclusive);
    }

    #[test]
    fn test_sole_shared_holder_upgrades() {
        let lm = LockManager::new();
        let t1 = TransactionId::next();

        lm.lock(pid(0), t1, Permissions::ReadOnly, SHORT).unwrap();
        lm.lock(pid(0), t1, Permissions::ReadWrite, SHORT).unwrap();
        assert_eq!(lm.lock_mode(pid(0)), LockMode::Exclusive);
    }

    #[test]
    fn test_one_of_two_shared_holders_cannot_upgrade() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::next(), TransactionId::next());

        lm.lock(pid(0), t1, Permissions::ReadOnly, SHORT).unwrap();
        lm.lock(pid(0), t2, Permissions::ReadOnly, SHORT).unwrap();
        assert!(lm.lock(pid(0), t1, Permissions::ReadWrite, SHORT).is_err());

        // Once t2 leaves, t1 is the sole holder again.
        lm.release_lock(pid(0), t2);
        lm.lock(pid(0), t1, Permissions::ReadWrite, SHORT).unwrap();
    }

    #[test]
    fn test_poll_protocol() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::next(), TransactionId::next());

        let s1 = lm.add_request(pid(0), t1, Permissions::ReadWrite);
        assert!(lm.acquire_lock(pid(0), t1, Permissions::ReadWrite, s1));

        let s2 = lm.add_request(pid(0), t2, Permissions::ReadOnly);
        assert_eq!(lm.queued_requests(pid(0)), 1);
        assert!(!lm.acquire_lock(pid(0), t2, Permissions::ReadOnly, s2));

        lm.release_lock(pid(0), t1);
        assert!(lm.acquire_lock(pid(0), t2, Permissions::ReadOnly, s2));
        assert_eq!(lm.queued_requests(pid(0)), 0);
    }

    #[test]
    fn test_poll_requires_issued_request() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::next(), TransactionId::next());

        assert!(!lm.acquire_lock(pid(0), t1, Permissions::ReadWrite, 999_999));
        assert_eq!(lm.lock_mode(pid(0)), LockMode::Unlocked);

        // Another transaction's token is not ours to redeem.
        let s2 = lm.add_request(pid(0), t2, Permissions::ReadOnly);
        assert!(!lm.acquire_lock(pid(0), t1, Permissions::ReadOnly, s2));

        // A granted token cannot be redeemed twice.
        assert!(lm.acquire_lock(pid(0), t2, Permissions::ReadOnly, s2));
        assert!(!lm.acquire_lock(pid(0), t2, Permissions::ReadOnly, s2));
        assert!(!lm.is_holding(pid(0), t1));
    }

    #[test]
    fn test_release_resets_mode() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::next(), TransactionId::next());

        lm.lock(pid(0), t1, Permissions::ReadOnly, SHORT).unwrap();
        lm.lock(pid(0), t2, Permissions::ReadOnly, SHORT).unwrap();

        lm.release_lock(pid(0), t1);
        assert_eq!(lm.lock_mode(pid(0)), LockMode::Shared);
        assert!(!lm.is_holding(pid(0), t1));

        lm.release_lock(pid(0), t2);
        assert_eq!(lm.lock_mode(pid(0)), LockMode::Unlocked);
    }

    #[test]
    fn test_release_by_non_holder_is_harmless() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::next(), TransactionId::next());

        lm.lock(pid(0), t1, Permissions::ReadOnly, SHORT).unwrap();
        lm.release_lock(pid(0), t2);
        assert!(lm.is_holding(pid(0), t1));
        assert_eq!(lm.lock_mode(pid(0)), LockMode::Shared);
    }

    #[test]
    fn test_release_all_locks() {
        let lm = LockManager::new();
        let t1 = TransactionId::next();

        for n in 0..4 {
            lm.lock(pid(n), t1, Permissions::ReadWrite, SHORT).unwrap();
        }
        assert_eq!(lm.held_pages(t1), (0..4).map(pid).collect::<Vec<_>>());

        lm.release_all_locks(t1);
        assert!(lm.held_pages(t1).is_empty());
        for n in 0..4 {
            assert_eq!(lm.lock_mode(pid(n)), LockMode::Unlocked);
        }
    }

    #[test]
    fn test_timeout_withdraws_request() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::next(), TransactionId::next());

        lm.lock(pid(0), t1, Permissions::ReadWrite, SHORT).unwrap();
        let err = lm.lock(pid(0), t2, Permissions::ReadOnly, SHORT).unwrap_err();
        match err {
            Error::TransactionAborted { tid, pid: p } => {
                assert_eq!(tid, t2);
                assert_eq!(p, pid(0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(lm.queued_requests(pid(0)), 0);
    }

    #[test]
    fn test_waiter_wakes_on_release() {
        let lm = Arc::new(LockManager::new());
        let (t1, t2) = (TransactionId::next(), TransactionId::next());
        lm.lock(pid(0), t1, Permissions::ReadWrite, SHORT).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let lm = Arc::clone(&lm);
            thread::spawn(move || {
                tx.send(()).unwrap();
                lm.lock(pid(0), t2, Permissions::ReadOnly, LONG)
            })
        };

        rx.recv().unwrap();
        thread::sleep(Duration::from_millis(20));
        lm.release_all_locks(t1);

        waiter.join().unwrap().unwrap();
        assert!(lm.is_holding(pid(0), t2));
    }

    #[test]
    fn test_concurrent_exclusive_requests_are_serialized() {
        let lm = Arc::new(LockManager::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lm = Arc::clone(&lm);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    let tid = TransactionId::next();
                    lm.lock(pid(0), tid, Permissions::ReadWrite, LONG).unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                    lm.release_all_locks(tid);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
