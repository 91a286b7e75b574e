//! Gate: reusable counting barrier
//!
//! ## Design
//!
//! A Gate is one cell holding the number of passes left, plus the capacity
//! it was created with. It starts closed (`remaining = 0`):
//!
//! ```text
//!            open()                 pass() x capacity
//! closed  ----------->  open  ------------------------->  closed
//! (0)                   (capacity)                        (0)
//! ```
//!
//! - `pass` blocks while the gate is closed, then takes one pass
//! - `open` resets the count to `capacity`, whatever it was
//! - `await_drained` blocks until every pass has been taken
//!
//! All three run inside the caller's transaction, so a pass can be combined
//! atomically with other reads and writes. The `*_now` forms run their own
//! transaction.
//!
//! ## Thread Safety
//!
//! Gate is a cheap handle (`Clone`, `Send + Sync`). Two handles are equal
//! only if they refer to the same gate cell.

use tinsel_concurrency::{TCell, TransactionContext};
use tinsel_core::{CellId, Error, Result, StmResult};
use tinsel_engine::Stm;
use tracing::trace;

/// Reusable counting barrier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gate {
    remaining: TCell<usize>,
    capacity: usize,
}

impl Gate {
    /// Create a closed gate admitting `capacity` passers per opening
    ///
    /// Fails with [`Error::InvalidCapacity`] if `capacity` is 0.
    pub fn new(stm: &Stm, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { capacity });
        }
        Ok(Self {
            remaining: stm.allocate(0),
            capacity,
        })
    }

    /// Create a closed gate from inside a transaction
    ///
    /// Capacity has already been validated by the caller.
    pub(crate) fn allocate(tx: &mut TransactionContext<'_>, capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            remaining: tx.allocate(0),
            capacity,
        }
    }

    /// Number of passers admitted per opening
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Identity of the underlying cell
    pub fn id(&self) -> CellId {
        self.remaining.id()
    }

    /// Passes left, as last committed
    pub fn peek_remaining(&self) -> usize {
        self.remaining.peek()
    }

    /// Passes left, as seen by `tx`
    pub fn remaining(&self, tx: &mut TransactionContext<'_>) -> StmResult<usize> {
        tx.read(&self.remaining)
    }

    /// Take one pass, blocking while the gate is closed
    pub fn pass(&self, tx: &mut TransactionContext<'_>) -> StmResult<()> {
        let remaining = tx.read(&self.remaining)?;
        tx.check(|| remaining > 0)?;
        tx.store(&self.remaining, remaining - 1)
    }

    /// Reset the gate to admit `capacity` more passers
    ///
    /// Idempotent: opening an open gate leaves it at `capacity`.
    pub fn open(&self, tx: &mut TransactionContext<'_>) -> StmResult<()> {
        tx.store(&self.remaining, self.capacity)
    }

    /// Block until every pass of the current opening has been taken
    pub fn await_drained(&self, tx: &mut TransactionContext<'_>) -> StmResult<()> {
        let remaining = tx.read(&self.remaining)?;
        tx.check(|| remaining == 0)
    }

    /// Take one pass in a transaction of its own
    pub fn pass_now(&self, stm: &Stm) -> Result<()> {
        stm.atomically(|tx| self.pass(tx))?;
        trace!(gate = %self.id(), "passed gate");
        Ok(())
    }

    /// Open the gate in a transaction of its own
    pub fn open_now(&self, stm: &Stm) -> Result<()> {
        stm.atomically(|tx| self.open(tx))?;
        trace!(gate = %self.id(), capacity = self.capacity, "opened gate");
        Ok(())
    }

    /// Wait for the gate to drain in a transaction of its own
    pub fn await_drained_now(&self, stm: &Stm) -> Result<()> {
        stm.atomically(|tx| self.await_drained(tx))
    }
}
