//! Group: bounded waiting room with double-buffered gates
//!
//! ## Design
//!
//! A Group is one cell holding the free places and the gate pair of the
//! cohort currently forming. Members `join` until the room is full; the
//! coordinator's `await_full` then, in a single commit:
//!
//! 1. captures the current gate pair
//! 2. resets the free places to `capacity`
//! 3. installs a freshly allocated, closed gate pair
//!
//! and hands the captured pair back. Members of the next cohort join against
//! the new gates, so they can never slip through gates opened for the
//! previous one.

use crate::gate::Gate;
use tinsel_concurrency::{TCell, TransactionContext};
use tinsel_core::{CellId, Error, Result, StmResult};
use tinsel_engine::Stm;
use tracing::{debug, trace};

/// Entry and exit gates of one cohort
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GatePair {
    /// Opened to let the cohort in
    pub entry: Gate,
    /// Opened to let the cohort out
    pub exit: Gate,
}

impl GatePair {
    fn allocate(tx: &mut TransactionContext<'_>, capacity: usize) -> Self {
        Self {
            entry: Gate::allocate(tx, capacity),
            exit: Gate::allocate(tx, capacity),
        }
    }
}

#[derive(Debug, Clone)]
struct GroupState {
    spaces_left: usize,
    gates: GatePair,
}

/// Bounded waiting room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group {
    state: TCell<GroupState>,
    capacity: usize,
}

impl Group {
    /// Create an empty group of `capacity` places with closed gates
    ///
    /// Fails with [`Error::InvalidCapacity`] if `capacity` is 0.
    pub fn new(stm: &Stm, capacity: usize) -> Result<Self> {
        let gates = GatePair {
            entry: Gate::new(stm, capacity)?,
            exit: Gate::new(stm, capacity)?,
        };
        Ok(Self {
            state: stm.allocate(GroupState {
                spaces_left: capacity,
                gates,
            }),
            capacity,
        })
    }

    /// Places per cohort
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Identity of the underlying cell
    pub fn id(&self) -> CellId {
        self.state.id()
    }

    /// Free places, as seen by `tx`
    pub fn spaces_left(&self, tx: &mut TransactionContext<'_>) -> StmResult<usize> {
        Ok(tx.read(&self.state)?.spaces_left)
    }

    /// Gates of the cohort currently forming, as seen by `tx`
    pub fn current_gates(&self, tx: &mut TransactionContext<'_>) -> StmResult<GatePair> {
        Ok(tx.read(&self.state)?.gates)
    }

    /// Take a place, blocking while the group is full
    ///
    /// Returns the gates the member must pass.
    pub fn join(&self, tx: &mut TransactionContext<'_>) -> StmResult<GatePair> {
        let mut state = tx.read(&self.state)?;
        tx.check(|| state.spaces_left > 0)?;
        state.spaces_left -= 1;
        let gates = state.gates.clone();
        tx.store(&self.state, state)?;
        Ok(gates)
    }

    /// Block until the group is full, then start a new cohort
    ///
    /// Returns the full cohort's gates; the group is left empty with a new
    /// pair of closed gates.
    pub fn await_full(&self, tx: &mut TransactionContext<'_>) -> StmResult<GatePair> {
        let state = tx.read(&self.state)?;
        tx.check(|| state.spaces_left == 0)?;
        let fresh = GatePair::allocate(tx, self.capacity);
        tx.store(
            &self.state,
            GroupState {
                spaces_left: self.capacity,
                gates: fresh,
            },
        )?;
        Ok(state.gates)
    }

    /// Join in a transaction of its own
    pub fn join_now(&self, stm: &Stm) -> Result<GatePair> {
        let gates = stm.atomically(|tx| self.join(tx))?;
        trace!(group = %self.id(), entry = %gates.entry.id(), "joined group");
        Ok(gates)
    }

    /// Await a full cohort in a transaction of its own
    pub fn await_full_now(&self, stm: &Stm) -> Result<GatePair> {
        let gates = stm.atomically(|tx| self.await_full(tx))?;
        debug!(group = %self.id(), capacity = self.capacity, "group full");
        Ok(gates)
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group({}, capacity {})", self.id(), self.capacity)
    }
}
