//! Transaction manager for coordinating commit operations
//!
//! Owns everything an engine instance shares between transactions:
//! the global version clock, the cell registry, the commit lock and the
//! wake-up channel used by blocked transactions.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Surface any failure recorded during the attempt (conflict, foreign cell)
//! 2. Read-only attempt: commit at its start version, no lock needed
//! 3. Acquire commit lock
//! 4. validate_read_set() - every read cell still at its observed version
//! 5. IF conflicts: mark Retried and return StmError::Conflict
//! 6. Apply all staged writes stamped with commit_version = clock + 1
//! 7. Publish commit_version to the global clock
//! 8. Release commit lock, wake blocked transactions
//! 9. Run post-commit hooks; a panicking hook is logged and counted
//! ```
//!
//! The clock is published only after every write is applied. An attempt that
//! starts while step 6 is in progress reads the old clock, so any cell it
//! finds already rewritten looks "too new" and invalidates it. No reader can
//! see a partially applied commit.

use crate::cell::{TCell, VersionedCell};
use crate::transaction::{RetryReason, TransactionContext, TransactionStatus};
use crate::validation::validate_read_set;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tinsel_core::{CellId, StmError, StmId, TxnId, Version};
use tracing::{debug, error, trace, warn};

/// Transaction counters
///
/// Snapshot of the manager's counters; see [`TransactionManager::metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Attempts started
    pub total_started: u64,
    /// Attempts committed
    pub total_committed: u64,
    /// Attempts discarded because of a concurrent commit
    pub total_conflicts: u64,
    /// Attempts discarded by a voluntary block
    pub total_retries: u64,
    /// Attempts that ended in an explicit abort
    pub total_aborted: u64,
    /// Attempts that ended in a panic
    pub total_panicked: u64,
    /// Commit hooks that panicked after their commit was applied
    pub total_hook_panics: u64,
    /// Attempts currently executing
    pub active_count: u64,
}

impl TransactionMetrics {
    /// Fraction of finished attempts that committed (0.0 - 1.0)
    pub fn commit_rate(&self) -> f64 {
        let finished = self.total_committed
            + self.total_conflicts
            + self.total_retries
            + self.total_aborted
            + self.total_panicked;
        if finished == 0 {
            return 0.0;
        }
        self.total_committed as f64 / finished as f64
    }
}

#[derive(Default)]
struct Counters {
    started: AtomicU64,
    committed: AtomicU64,
    conflicts: AtomicU64,
    retries: AtomicU64,
    aborted: AtomicU64,
    panicked: AtomicU64,
    hook_panics: AtomicU64,
    active: AtomicU64,
}

/// Manages cells, versions and atomic commits for one engine instance
///
/// # Thread Safety
///
/// Reads never take the commit lock. Commits that write are serialized by
/// the commit lock, which keeps validation and application atomic with
/// respect to each other.
pub struct TransactionManager {
    stm_id: StmId,

    /// Global version clock
    ///
    /// Advanced once per committed writer, after its writes are applied.
    version: AtomicU64,

    next_txn_id: AtomicU64,

    next_cell_id: AtomicU64,

    /// Commit serialization lock
    ///
    /// Prevents a race between validation and apply:
    /// 1. T1 validates (succeeds)
    /// 2. T2 validates (succeeds, T1 not yet applied)
    /// 3. T1 applies
    /// 4. T2 applies over a read set T1 just invalidated
    commit_lock: Mutex<()>,

    /// Held while a blocked transaction checks its read set and while a
    /// committer signals, so a wake-up can never slip between the two
    wake_lock: Mutex<()>,
    wake: Condvar,

    /// Every cell ever allocated; cells live as long as the engine
    cells: DashMap<CellId, Arc<dyn VersionedCell>>,

    counters: Counters,
}

impl TransactionManager {
    /// Create a manager for the engine instance `stm_id`
    pub fn new(stm_id: StmId) -> Self {
        TransactionManager {
            stm_id,
            version: AtomicU64::new(0),
            next_txn_id: AtomicU64::new(1),
            next_cell_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
            cells: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Engine instance this manager belongs to
    pub fn stm_id(&self) -> StmId {
        self.stm_id
    }

    /// Get current global version
    pub fn current_version(&self) -> Version {
        Version::new(self.version.load(Ordering::Acquire))
    }

    /// Number of cells allocated so far
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Committed version of a cell, if it belongs to this manager
    pub fn cell_version(&self, id: CellId) -> Option<Version> {
        self.cells.get(&id).map(|cell| cell.version())
    }

    /// Allocate a new cell holding `value`
    pub fn allocate<T>(&self, value: T) -> TCell<T>
    where
        T: Send + Sync + 'static,
    {
        let id = CellId::new(self.next_cell_id.fetch_add(1, Ordering::Relaxed));
        let cell = TCell::new(self.stm_id, id, value);
        self.cells.insert(id, cell.erased());
        trace!(cell = %id, "allocated cell");
        cell
    }

    /// Start a new attempt
    pub fn begin(&self) -> TransactionContext<'_> {
        let txn_id = TxnId::new(self.next_txn_id.fetch_add(1, Ordering::Relaxed));
        self.counters.started.fetch_add(1, Ordering::Relaxed);
        self.counters.active.fetch_add(1, Ordering::Relaxed);
        let txn = TransactionContext::new(self, txn_id, self.current_version());
        trace!(txn_id = %txn_id, start_version = %txn.start_version(), "begin attempt");
        txn
    }

    pub(crate) fn end_attempt(&self) {
        self.counters.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Commit an attempt atomically
    ///
    /// Returns the commit version on success. On failure the attempt is
    /// discarded with none of its writes applied:
    /// - [`StmError::Conflict`] means the body should simply be re-run
    /// - [`StmError::ForeignCell`] reports caller misuse
    pub fn commit(&self, mut txn: TransactionContext<'_>) -> Result<Version, StmError> {
        if let Some(err) = txn.take_failure() {
            if let StmError::Conflict { cell } = err {
                self.discard(&mut txn, RetryReason::Conflict { cell });
            }
            return Err(err);
        }

        let hooks = txn.take_commit_hooks();
        let wrote = !txn.is_read_only();

        let commit_version = if !wrote {
            // Every read was checked against the start version, so the
            // attempt saw a consistent snapshot as of that version.
            txn.start_version()
        } else {
            let write_set = txn.take_write_set();

            let _commit_guard = self.commit_lock.lock();

            let validation = validate_read_set(txn.read_set());
            if let Some(cell) = validation.first_conflict() {
                drop(_commit_guard);
                self.discard(&mut txn, RetryReason::Conflict { cell });
                return Err(StmError::Conflict { cell });
            }

            let commit_version = self.current_version().next();
            for (id, entry) in write_set {
                if !entry.cell.install(entry.value, commit_version) {
                    error!(
                        txn_id = %txn.txn_id(),
                        cell = %id,
                        "staged payload does not match cell type; write dropped"
                    );
                }
            }
            self.version
                .store(commit_version.as_u64(), Ordering::Release);
            commit_version
        };

        txn.set_status(TransactionStatus::Committed {
            version: commit_version,
        });
        self.counters.committed.fetch_add(1, Ordering::Relaxed);
        debug!(
            txn_id = %txn.txn_id(),
            commit_version = %commit_version,
            reads = txn.read_count(),
            "committed"
        );
        drop(txn);

        if wrote {
            self.notify_commit();
        }

        for hook in hooks {
            // The commit is already visible; a panicking hook cannot undo it.
            if panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
                self.counters.hook_panics.fetch_add(1, Ordering::Relaxed);
                warn!(commit_version = %commit_version, "commit hook panicked");
            }
        }
        Ok(commit_version)
    }

    /// Discard an attempt after a read-time conflict
    pub fn abandon(&self, mut txn: TransactionContext<'_>, reason: RetryReason) {
        self.discard(&mut txn, reason);
    }

    /// Discard a blocked attempt and park until one of its reads changes
    ///
    /// Wakes when a commit moves any cell the attempt read. `safety_net`
    /// bounds each individual wait so a missed signal costs at most one
    /// interval. An attempt that read nothing waits for the next commit.
    pub fn wait_for_change(&self, mut txn: TransactionContext<'_>, safety_net: Duration) {
        let watched = txn.wait_set();
        self.discard(&mut txn, RetryReason::Blocked);
        drop(txn);

        let changed = || {
            watched
                .iter()
                .any(|(cell, seen)| cell.version() != *seen)
        };

        let mut guard = self.wake_lock.lock();
        if watched.is_empty() {
            self.wake.wait_for(&mut guard, safety_net);
            return;
        }
        while !changed() {
            self.wake.wait_for(&mut guard, safety_net);
        }
    }

    /// Record an attempt that ended in an explicit abort
    pub fn record_abort(&self) {
        self.counters.aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an attempt that ended in a panic
    pub fn record_panic(&self) {
        self.counters.panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the counters
    pub fn metrics(&self) -> TransactionMetrics {
        let c = &self.counters;
        TransactionMetrics {
            total_started: c.started.load(Ordering::Relaxed),
            total_committed: c.committed.load(Ordering::Relaxed),
            total_conflicts: c.conflicts.load(Ordering::Relaxed),
            total_retries: c.retries.load(Ordering::Relaxed),
            total_aborted: c.aborted.load(Ordering::Relaxed),
            total_panicked: c.panicked.load(Ordering::Relaxed),
            total_hook_panics: c.hook_panics.load(Ordering::Relaxed),
            active_count: c.active.load(Ordering::Relaxed),
        }
    }

    fn discard(&self, txn: &mut TransactionContext<'_>, reason: RetryReason) {
        txn.set_status(TransactionStatus::Retried { reason });
        match reason {
            RetryReason::Blocked => {
                self.counters.retries.fetch_add(1, Ordering::Relaxed);
                trace!(txn_id = %txn.txn_id(), reads = txn.read_count(), "attempt blocked");
            }
            RetryReason::Conflict { cell } => {
                self.counters.conflicts.fetch_add(1, Ordering::Relaxed);
                debug!(txn_id = %txn.txn_id(), cell = %cell, "attempt conflicted");
            }
        }
    }

    fn notify_commit(&self) {
        let _wake_guard = self.wake_lock.lock();
        self.wake.notify_all();
    }
}
