//! Built transactions
//!
//! This module provides:
//! - [`Transaction`]: an ordered list of steps plus a final output step,
//!   cheap to clone and reusable across runs
//! - [`TransactionBuilder`]: assembles the steps
//! - [`TaskHandle`]: joins a transaction launched on its own thread
//! - [`forever`]: re-runs one transaction until a stop flag is raised
//!
//! # Architecture
//!
//! A transaction carries no engine state. Each run creates a fresh
//! [`TransactionContext`] per attempt and feeds it through every step in
//! order. Building allocates no OS resources; threads exist only once a
//! transaction is handed to [`Stm::run_concurrently`](crate::Stm::run_concurrently).

pub mod builder;
pub mod task;

pub use builder::TransactionBuilder;
pub use task::{forever, TaskHandle};

use parking_lot::Mutex;
use std::sync::Arc;
use tinsel_concurrency::{TransactionContext, TransactionStatus};
use tinsel_core::StmResult;

/// One step of a transaction body
pub type Step = Arc<dyn Fn(&mut TransactionContext<'_>) -> StmResult<()> + Send + Sync>;

/// Final step producing the transaction's output
pub type Finish<T> = Arc<dyn Fn(&mut TransactionContext<'_>) -> StmResult<T> + Send + Sync>;

/// An ordered sequence of steps executed atomically
///
/// Clones share the steps and the status slot.
pub struct Transaction<T = ()> {
    name: Option<Arc<str>>,
    steps: Arc<[Step]>,
    finish: Finish<T>,
    status: Arc<Mutex<TransactionStatus>>,
}

impl Transaction<()> {
    /// Start building a transaction
    ///
    /// ```
    /// use tinsel_engine::{Stm, Transaction};
    ///
    /// let stm = Stm::new();
    /// let from = stm.allocate(10i64);
    /// let to = stm.allocate(0i64);
    ///
    /// let (a, b) = (from.clone(), to.clone());
    /// let transfer = Transaction::builder()
    ///     .named("transfer")
    ///     .step(move |tx| {
    ///         let n = tx.read(&a)?;
    ///         tx.store(&a, n - 4)
    ///     })
    ///     .step(move |tx| {
    ///         tx.modify(&b, |n| n + 4)?;
    ///         Ok(())
    ///     })
    ///     .build();
    ///
    /// stm.run(&transfer).unwrap();
    /// assert_eq!((from.peek(), to.peek()), (6, 4));
    /// assert!(transfer.status().is_committed());
    /// ```
    pub fn builder() -> TransactionBuilder {
        TransactionBuilder::new()
    }
}

impl<T> Transaction<T> {
    pub(crate) fn from_parts(name: Option<Arc<str>>, steps: Vec<Step>, finish: Finish<T>) -> Self {
        Self {
            name,
            steps: steps.into(),
            finish,
            status: Arc::new(Mutex::new(TransactionStatus::Pending)),
        }
    }

    /// Label used for logging and thread names
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of steps, excluding the final output step
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Status of the most recent attempt
    pub fn status(&self) -> TransactionStatus {
        *self.status.lock()
    }

    /// Run every step, then the final step, against one attempt
    pub(crate) fn attempt(&self, tx: &mut TransactionContext<'_>) -> StmResult<T> {
        for step in self.steps.iter() {
            step(tx)?;
        }
        (self.finish)(tx)
    }

    pub(crate) fn set_status(&self, status: TransactionStatus) {
        *self.status.lock() = status;
    }
}

impl<T> Clone for Transaction<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            steps: Arc::clone(&self.steps),
            finish: Arc::clone(&self.finish),
            status: Arc::clone(&self.status),
        }
    }
}

impl<T> std::fmt::Debug for Transaction<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("status", &self.status())
            .finish()
    }
}
