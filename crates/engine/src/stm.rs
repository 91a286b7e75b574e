//! The STM coordinator
//!
//! [`Stm`] owns the cells of one engine instance and executes transactions
//! against them. It is an ordinary value: create one, wrap it in an `Arc`,
//! and hand it to every component that allocates cells or runs
//! transactions.
//!
//! ## Retry loop
//!
//! ```text
//! loop:
//!   begin attempt (snapshot = global clock)
//!   run body
//!     Ok            -> commit; conflict? loop again
//!     Conflict      -> loop again immediately
//!     Retry         -> park until a cell the attempt read changes, loop again
//!     Abort/misuse  -> return error
//!     panic         -> discard attempt, return Error::Panicked
//! ```

use crate::config::{StmBuilder, StmConfig, MIN_RETRY_WAIT};
use crate::transaction::{TaskHandle, Transaction};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tinsel_concurrency::{
    RetryReason, TCell, TransactionContext, TransactionManager, TransactionMetrics,
    TransactionStatus,
};
use tinsel_core::{Error, Result, StmError, StmId, StmResult, Version};
use tracing::{debug, warn};

/// A software transactional memory engine instance
pub struct Stm {
    manager: TransactionManager,
    config: StmConfig,
    spawned: AtomicU64,
}

impl Stm {
    /// Create an engine with default settings.
    pub fn new() -> Self {
        Self::with_config(StmConfig::default())
    }

    /// Create a builder for engine configuration.
    pub fn builder() -> StmBuilder {
        StmBuilder::new()
    }

    /// Create an engine with explicit settings.
    ///
    /// A `retry_wait` below [`MIN_RETRY_WAIT`] is raised to it.
    pub fn with_config(mut config: StmConfig) -> Self {
        config.retry_wait = config.retry_wait.max(MIN_RETRY_WAIT);
        Self {
            manager: TransactionManager::new(StmId::new()),
            config,
            spawned: AtomicU64::new(0),
        }
    }

    /// Identity of this engine instance
    pub fn id(&self) -> StmId {
        self.manager.stm_id()
    }

    /// Active settings
    pub fn config(&self) -> &StmConfig {
        &self.config
    }

    /// Underlying transaction manager
    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    /// Allocate a new cell holding `value`
    ///
    /// Never fails. The cell lives as long as the engine.
    pub fn allocate<T>(&self, value: T) -> TCell<T>
    where
        T: Send + Sync + 'static,
    {
        self.manager.allocate(value)
    }

    /// Number of cells allocated so far
    pub fn cell_count(&self) -> usize {
        self.manager.cell_count()
    }

    /// Current value of the global version clock
    pub fn current_version(&self) -> Version {
        self.manager.current_version()
    }

    /// Transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        self.manager.metrics()
    }

    /// Execute a closure atomically.
    ///
    /// Blocks the caller until the body commits. The body may run many
    /// times; keep side effects out of it and register them with
    /// [`TransactionContext::on_commit`] instead.
    ///
    /// # Example
    ///
    /// ```
    /// use tinsel_engine::Stm;
    ///
    /// let stm = Stm::new();
    /// let counter = stm.allocate(10);
    ///
    /// let before = stm
    ///     .atomically(|tx| {
    ///         let n = tx.read(&counter)?;
    ///         tx.store(&counter, n + 1)?;
    ///         Ok(n)
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(before, 10);
    /// assert_eq!(counter.peek(), 11);
    /// ```
    pub fn atomically<T, F>(&self, body: F) -> Result<T>
    where
        F: FnMut(&mut TransactionContext<'_>) -> StmResult<T>,
    {
        self.execute(body, |_| {})
    }

    /// Run a built transaction to completion
    pub fn run<T>(&self, txn: &Transaction<T>) -> Result<T> {
        self.execute(|tx| txn.attempt(tx), |status| txn.set_status(status))
    }

    /// Launch each transaction on its own thread and return immediately
    ///
    /// The handles may be dropped; the transactions keep running. Keep them
    /// to join a transaction and collect its result.
    pub fn run_concurrently<T, I>(self: &Arc<Self>, txns: I) -> Result<Vec<TaskHandle<T>>>
    where
        T: Send + 'static,
        I: IntoIterator<Item = Transaction<T>>,
    {
        txns.into_iter().map(|txn| self.spawn(txn)).collect()
    }

    /// Launch one transaction on its own thread
    pub fn spawn<T>(self: &Arc<Self>, txn: Transaction<T>) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
    {
        let seq = self.spawned.fetch_add(1, Ordering::Relaxed);
        let name = match txn.name() {
            Some(label) => format!("{}-{}-{}", self.config.thread_name_prefix, label, seq),
            None => format!("{}-{}", self.config.thread_name_prefix, seq),
        };

        let stm = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || stm.run(&txn))
            .map_err(|source| Error::Spawn {
                name: name.clone(),
                source,
            })?;
        debug!(task = %name, "spawned transaction task");
        Ok(TaskHandle::new(name, handle))
    }

    fn execute<T, F, S>(&self, mut body: F, mut on_status: S) -> Result<T>
    where
        F: FnMut(&mut TransactionContext<'_>) -> StmResult<T>,
        S: FnMut(TransactionStatus),
    {
        loop {
            let mut txn = self.manager.begin();
            on_status(TransactionStatus::Running);

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut txn)));

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(txn_id = %txn.txn_id(), %message, "transaction step panicked");
                    drop(txn);
                    self.manager.record_panic();
                    return Err(Error::Panicked { message });
                }
            };

            // A body that swallowed a conflict must still be re-run
            if let Some(cell) = txn.conflicting_cell() {
                let reason = RetryReason::Conflict { cell };
                on_status(TransactionStatus::Retried { reason });
                self.manager.abandon(txn, reason);
                continue;
            }

            match outcome {
                Ok(value) => match self.manager.commit(txn) {
                    Ok(version) => {
                        on_status(TransactionStatus::Committed { version });
                        return Ok(value);
                    }
                    Err(StmError::Conflict { cell }) => {
                        on_status(TransactionStatus::Retried {
                            reason: RetryReason::Conflict { cell },
                        });
                    }
                    Err(err) => return Err(self.surface(err)),
                },
                Err(StmError::Retry) => {
                    on_status(TransactionStatus::Retried {
                        reason: RetryReason::Blocked,
                    });
                    self.manager.wait_for_change(txn, self.config.retry_wait);
                }
                Err(StmError::Conflict { cell }) => {
                    let reason = RetryReason::Conflict { cell };
                    on_status(TransactionStatus::Retried { reason });
                    self.manager.abandon(txn, reason);
                }
                Err(err) => {
                    drop(txn);
                    return Err(self.surface(err));
                }
            }
        }
    }

    fn surface(&self, err: StmError) -> Error {
        match err {
            StmError::Abort(reason) => {
                self.manager.record_abort();
                debug!(%reason, "transaction aborted");
                Error::Aborted(reason)
            }
            StmError::ForeignCell { cell } => Error::ForeignCell { cell },
            other => Error::Internal(format!("unhandled control value: {}", other)),
        }
    }
}

impl Default for Stm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Stm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stm")
            .field("id", &self.id())
            .field("cells", &self.cell_count())
            .field("version", &self.current_version())
            .finish()
    }
}

/// Render a panic payload as text
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
