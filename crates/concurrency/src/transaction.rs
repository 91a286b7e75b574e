//! Transaction context: read/write set tracking for one attempt
//!
//! A [`TransactionContext`] is created by
//! [`TransactionManager::begin`](crate::TransactionManager::begin) and lives
//! for exactly one attempt of a transaction body. It records:
//!
//! - the start version (the global clock when the attempt began)
//! - every cell read, with the version observed
//! - every cell written, with the staged value
//! - hooks to run once the attempt commits
//!
//! ## Snapshot reads
//!
//! A read of a cell whose committed version is newer than the start version
//! invalidates the attempt immediately. The body can never observe a mix of
//! states from before and after a concurrent commit, so a body is free to
//! assume the values it read are mutually consistent.

use crate::cell::{TCell, VersionedCell};
use crate::manager::TransactionManager;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::Arc;
use tinsel_core::{guard, CellId, StmError, StmResult, TxnId, Version};

/// Why an attempt was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The body blocked voluntarily (`check` / `retry`)
    Blocked,
    /// A read or the commit-time validation saw a concurrent commit
    Conflict {
        /// Cell whose version moved
        cell: CellId,
    },
}

/// Lifecycle of a transaction
///
/// ```text
/// Pending -> Running -> Committed
///               |
///               +-----> Retried -> (fresh attempt) Running -> ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Built but not yet run
    Pending,
    /// An attempt is executing
    Running,
    /// All writes applied atomically
    Committed {
        /// Version stamped on the written cells (the start version for
        /// read-only attempts)
        version: Version,
    },
    /// The attempt was discarded and will be re-run
    Retried {
        /// Why it was discarded
        reason: RetryReason,
    },
}

impl TransactionStatus {
    /// Check if the transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self, TransactionStatus::Committed { .. })
    }
}

pub(crate) struct ReadEntry {
    pub(crate) version: Version,
    pub(crate) cell: Arc<dyn VersionedCell>,
}

pub(crate) struct WriteEntry {
    pub(crate) value: Box<dyn Any + Send>,
    pub(crate) cell: Arc<dyn VersionedCell>,
}

type CommitHook = Box<dyn FnOnce() + Send>;

/// One attempt of a transaction
///
/// Handed to transaction bodies as `&mut TransactionContext`. All cell
/// access goes through it.
pub struct TransactionContext<'a> {
    manager: &'a TransactionManager,
    txn_id: TxnId,
    start_version: Version,
    status: TransactionStatus,
    /// First failure recorded by a read or write; reported at commit
    failure: Option<StmError>,
    read_set: FxHashMap<CellId, ReadEntry>,
    write_set: FxHashMap<CellId, WriteEntry>,
    commit_hooks: Vec<CommitHook>,
}

impl<'a> TransactionContext<'a> {
    pub(crate) fn new(manager: &'a TransactionManager, txn_id: TxnId, start_version: Version) -> Self {
        Self {
            manager,
            txn_id,
            start_version,
            status: TransactionStatus::Running,
            failure: None,
            read_set: FxHashMap::default(),
            write_set: FxHashMap::default(),
            commit_hooks: Vec::new(),
        }
    }

    /// Identifier of this attempt
    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    /// Global clock when the attempt began
    pub fn start_version(&self) -> Version {
        self.start_version
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Check if a read observed a concurrent commit
    ///
    /// Once invalidated, further reads fail and writes are refused; the
    /// attempt can only be retried.
    pub fn is_invalidated(&self) -> bool {
        self.conflicting_cell().is_some()
    }

    /// Cell whose concurrent commit invalidated this attempt, if any
    pub fn conflicting_cell(&self) -> Option<CellId> {
        match self.failure {
            Some(StmError::Conflict { cell }) => Some(cell),
            _ => None,
        }
    }

    /// Number of distinct cells read
    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }

    /// Number of distinct cells written
    pub fn write_count(&self) -> usize {
        self.write_set.len()
    }

    /// Check if nothing has been written
    pub fn is_read_only(&self) -> bool {
        self.write_set.is_empty()
    }

    /// Read a cell
    ///
    /// Returns the value staged by this attempt if the cell was written,
    /// otherwise the committed value. Fails with [`StmError::Conflict`] if
    /// the cell was committed after this attempt started.
    pub fn read<T>(&mut self, cell: &TCell<T>) -> StmResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.ensure_owned(cell)?;
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let id = cell.id();

        // Read-your-own-writes
        if let Some(entry) = self.write_set.get(&id) {
            return match entry.value.downcast_ref::<T>() {
                Some(value) => Ok(value.clone()),
                None => Err(StmError::Abort(format!("payload type mismatch on {}", id))),
            };
        }

        let (version, value) = cell.load();
        if version > self.start_version {
            let err = StmError::Conflict { cell: id };
            self.failure = Some(err.clone());
            return Err(err);
        }

        self.read_set.entry(id).or_insert_with(|| ReadEntry {
            version,
            cell: cell.erased(),
        });
        Ok(value)
    }

    /// Stage a write
    ///
    /// The value becomes visible to other transactions only if this attempt
    /// commits. Returns `false` if the attempt has already been invalidated
    /// (or the cell belongs to another engine), in which case nothing is
    /// staged.
    pub fn write<T>(&mut self, cell: &TCell<T>, value: T) -> bool
    where
        T: Send + Sync + 'static,
    {
        if let Err(err) = self.ensure_owned(cell) {
            self.failure.get_or_insert(err);
            return false;
        }
        if self.failure.is_some() {
            return false;
        }
        self.write_set.insert(
            cell.id(),
            WriteEntry {
                value: Box::new(value),
                cell: cell.erased(),
            },
        );
        true
    }

    /// Stage a write, propagating a refusal as an error
    ///
    /// Same as [`write`](Self::write) but usable with `?` in step bodies.
    pub fn store<T>(&mut self, cell: &TCell<T>, value: T) -> StmResult<()>
    where
        T: Send + Sync + 'static,
    {
        if self.write(cell, value) {
            return Ok(());
        }
        self.ensure_owned(cell)?;
        Err(self
            .failure
            .clone()
            .unwrap_or(StmError::Conflict { cell: cell.id() }))
    }

    /// Read, transform and write back a cell
    pub fn modify<T, F>(&mut self, cell: &TCell<T>, f: F) -> StmResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> T,
    {
        let updated = f(self.read(cell)?);
        self.store(cell, updated.clone())?;
        Ok(updated)
    }

    /// Block unless `predicate` holds
    ///
    /// When the predicate is false the attempt is abandoned without applying
    /// any staged write, and the whole body is run again once a cell read so
    /// far has been changed by another commit.
    pub fn check<P>(&self, predicate: P) -> StmResult<()>
    where
        P: FnOnce() -> bool,
    {
        guard(predicate())
    }

    /// Allocate a new cell from inside the transaction
    ///
    /// The cell exists immediately but is only reachable through the handle
    /// returned here. If the attempt is discarded, the cell is unreachable.
    pub fn allocate<T>(&mut self, value: T) -> TCell<T>
    where
        T: Send + Sync + 'static,
    {
        self.manager.allocate(value)
    }

    /// Run `hook` after this attempt commits
    ///
    /// Hooks run after the commit lock is released, in registration order.
    /// They never run for discarded attempts, which makes them the place
    /// for side effects such as handing a result to another thread.
    /// A hook that panics is caught and logged; the commit stands and the
    /// remaining hooks still run.
    pub fn on_commit<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.commit_hooks.push(Box::new(hook));
    }

    fn ensure_owned<T: Send + Sync + 'static>(&self, cell: &TCell<T>) -> StmResult<()> {
        if cell.owner() == self.manager.stm_id() {
            Ok(())
        } else {
            Err(StmError::ForeignCell { cell: cell.id() })
        }
    }

    pub(crate) fn take_failure(&mut self) -> Option<StmError> {
        self.failure.take()
    }

    pub(crate) fn read_set(&self) -> &FxHashMap<CellId, ReadEntry> {
        &self.read_set
    }

    pub(crate) fn take_write_set(&mut self) -> FxHashMap<CellId, WriteEntry> {
        std::mem::take(&mut self.write_set)
    }

    pub(crate) fn take_commit_hooks(&mut self) -> Vec<CommitHook> {
        std::mem::take(&mut self.commit_hooks)
    }

    /// Cells read so far with the versions observed
    pub(crate) fn wait_set(&self) -> Vec<(Arc<dyn VersionedCell>, Version)> {
        self.read_set
            .values()
            .map(|entry| (Arc::clone(&entry.cell), entry.version))
            .collect()
    }

    pub(crate) fn set_status(&mut self, status: TransactionStatus) {
        self.status = status;
    }
}

impl Drop for TransactionContext<'_> {
    fn drop(&mut self) {
        self.manager.end_attempt();
    }
}

impl std::fmt::Debug for TransactionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("start_version", &self.start_version)
            .field("status", &self.status)
            .field("reads", &self.read_set.len())
            .field("writes", &self.write_set.len())
            .finish()
    }
}
