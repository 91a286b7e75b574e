//! Transaction builder

use super::{Finish, Step, Transaction};
use std::sync::Arc;
use tinsel_concurrency::TransactionContext;
use tinsel_core::StmResult;

/// Builder for [`Transaction`]
#[derive(Default)]
pub struct TransactionBuilder {
    name: Option<Arc<str>>,
    steps: Vec<Step>,
}

impl TransactionBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Label the transaction for logging and thread names
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a step
    ///
    /// Steps run in the order they were added, all within the same attempt.
    /// A step may run many times; keep its side effects in
    /// [`TransactionContext::on_commit`].
    pub fn step<F>(mut self, step: F) -> Self
    where
        F: Fn(&mut TransactionContext<'_>) -> StmResult<()> + Send + Sync + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    /// Build a transaction with no output
    pub fn build(self) -> Transaction<()> {
        let finish: Finish<()> = Arc::new(|_| Ok(()));
        Transaction::from_parts(self.name, self.steps, finish)
    }

    /// Build a transaction whose output is produced by `finish`
    ///
    /// `finish` runs after every other step, within the same attempt.
    pub fn finish<T, F>(self, finish: F) -> Transaction<T>
    where
        F: Fn(&mut TransactionContext<'_>) -> StmResult<T> + Send + Sync + 'static,
    {
        Transaction::from_parts(self.name, self.steps, Arc::new(finish))
    }
}

impl std::fmt::Debug for TransactionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionBuilder")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .finish()
    }
}
