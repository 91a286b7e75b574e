//! Threads running transactions

use super::Transaction;
use crate::stm::{panic_message, Stm};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tinsel_core::{Error, Result};
use tracing::debug;

/// Handle to a transaction running on its own thread
///
/// Dropping the handle detaches the thread; the transaction keeps running.
#[derive(Debug)]
pub struct TaskHandle<T> {
    name: String,
    handle: JoinHandle<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(name: String, handle: JoinHandle<Result<T>>) -> Self {
        Self { name, handle }
    }

    /// Thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the transaction has finished, successfully or not
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the transaction and return its result
    pub fn join(self) -> Result<T> {
        match self.handle.join() {
            Ok(result) => result,
            // Step panics are caught inside `run`; this is a panic in the
            // engine itself.
            Err(payload) => Err(Error::Panicked {
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

/// Run `txn` over and over until `stop` is raised
///
/// `stop` is checked between runs, never during one. Returns the number of
/// completed runs, or the first error.
pub fn forever<T>(stm: &Stm, txn: &Transaction<T>, stop: &AtomicBool) -> Result<u64> {
    let mut runs = 0u64;
    while !stop.load(Ordering::Acquire) {
        stm.run(txn)?;
        runs += 1;
    }
    debug!(name = ?txn.name(), runs, "stopped repeating transaction");
    Ok(runs)
}
