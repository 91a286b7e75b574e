//! Santa: the coordinator that services full groups.
//!
//! Santa watches two pools, each a [`Group`]. For every pool he keeps one
//! await transaction in flight; it blocks in [`Group::await_full`] and, once
//! it commits, reports the full cohort's gates through the pool's handoff.
//!
//! ```text
//! run_cycle:
//!   launch an await transaction for every pool without one in flight
//!   loop:
//!     high pool reported?  -> service it
//!     low pool reported?   -> service it
//!     otherwise            -> sleep on the doorbell
//!
//! service(gates):
//!   open entry, wait until drained    (every member is in)
//!   open exit,  wait until drained    (every member is out)
//! ```
//!
//! The high-priority pool wins only when both reports are on offer in the
//! same cycle. There is no further fairness: a pool that is always full can
//! keep the other waiting.

use crate::error::Result;
use crate::handoff::{rendezvous, Doorbell, Receiver, Sender};
use crate::journal::{Journal, WorkshopEvent};
use serde::Serialize;
use std::sync::Arc;
use tinsel_engine::{Stm, Transaction};
use tinsel_primitives::{GatePair, Group};
use tracing::{debug, info};

/// Which of Santa's two pools a group came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Serviced first when both pools are ready
    High,
    /// Serviced only when the high pool has nothing on offer
    Low,
}

/// Outcome of one arbitration cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serviced {
    /// Pool the group came from
    pub pool: String,
    /// Priority of that pool
    pub priority: Priority,
    /// Gates the group passed
    pub gates: GatePair,
}

struct Pool {
    name: String,
    priority: Priority,
    await_txn: Transaction<GatePair>,
    reports: Receiver<GatePair>,
    in_flight: bool,
}

impl Pool {
    fn new(bell: &Arc<Doorbell>, name: &str, priority: Priority, group: Group) -> Self {
        let (sender, reports) = rendezvous(bell);
        debug!(pool = %name, %group, ?priority, "pool registered");
        Self {
            name: name.to_string(),
            priority,
            await_txn: await_transaction(name, &group, Arc::new(sender)),
            reports,
            in_flight: false,
        }
    }
}

/// Await transaction for one pool
///
/// The report is sent from a commit hook: an attempt that blocks or conflicts
/// never reports.
fn await_transaction(name: &str, group: &Group, sender: Arc<Sender<GatePair>>) -> Transaction<GatePair> {
    let group = group.clone();
    let pool = name.to_string();
    Transaction::builder()
        .named(format!("await-{}", name))
        .finish(move |tx| {
            let gates = group.await_full(tx)?;
            let (sender, report, pool) = (Arc::clone(&sender), gates.clone(), pool.clone());
            tx.on_commit(move || {
                if sender.send(report).is_err() {
                    debug!(%pool, "coordinator gone; report dropped");
                }
            });
            Ok(gates)
        })
}

/// The coordinator
pub struct Santa {
    stm: Arc<Stm>,
    bell: Arc<Doorbell>,
    high: Pool,
    low: Pool,
    journal: Option<Journal>,
    cycles: u64,
}

impl Santa {
    /// Create a coordinator for a high- and a low-priority pool
    pub fn new(stm: Arc<Stm>, high: Group, low: Group) -> Self {
        Self::with_names(stm, ("high", high), ("low", low))
    }

    /// Create a coordinator with named pools
    pub fn with_names(stm: Arc<Stm>, high: (&str, Group), low: (&str, Group)) -> Self {
        let bell = Doorbell::new();
        let high = Pool::new(&bell, high.0, Priority::High, high.1);
        let low = Pool::new(&bell, low.0, Priority::Low, low.1);
        Self {
            stm,
            bell,
            high,
            low,
            journal: None,
            cycles: 0,
        }
    }

    /// Record service start and finish in `journal`
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Cycles completed so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Number of pools whose full group is waiting to be taken
    pub fn pending_reports(&self) -> usize {
        [&self.high, &self.low]
            .iter()
            .filter(|pool| pool.reports.is_offered())
            .count()
    }

    /// Start an await transaction for every pool without one in flight
    pub fn launch(&mut self) -> Result<()> {
        for pool in [&mut self.high, &mut self.low] {
            if pool.in_flight {
                continue;
            }
            // Detached: the handle is not needed, the report arrives
            // through the handoff.
            self.stm.spawn(pool.await_txn.clone())?;
            pool.in_flight = true;
            debug!(pool = %pool.name, "await transaction launched");
        }
        Ok(())
    }

    /// Run one arbitration cycle: pick a full group and service it
    ///
    /// Blocks until some group is full.
    pub fn run_cycle(&mut self) -> Result<Serviced> {
        self.launch()?;

        let (pool, gates) = loop {
            let seen = self.bell.generation();
            if let Some(gates) = self.high.reports.try_recv()? {
                self.high.in_flight = false;
                break (&self.high, gates);
            }
            if let Some(gates) = self.low.reports.try_recv()? {
                self.low.in_flight = false;
                break (&self.low, gates);
            }
            self.bell.wait_past(seen);
        };

        let serviced = Serviced {
            pool: pool.name.clone(),
            priority: pool.priority,
            gates,
        };
        self.service(&serviced)?;
        self.cycles += 1;
        Ok(serviced)
    }

    /// Run `cycles` arbitration cycles
    pub fn run_cycles(&mut self, cycles: usize) -> Result<Vec<Serviced>> {
        (0..cycles).map(|_| self.run_cycle()).collect()
    }

    fn service(&self, serviced: &Serviced) -> Result<()> {
        let Serviced { pool, priority, gates } = serviced;
        info!(%pool, ?priority, cycle = self.cycles, "servicing group");
        self.record(WorkshopEvent::ServiceStarted {
            pool: pool.clone(),
            priority: *priority,
        });

        drain(&self.stm, gates)?;

        self.record(WorkshopEvent::ServiceFinished { pool: pool.clone() });
        debug!(%pool, "group released");
        Ok(())
    }

    fn record(&self, event: WorkshopEvent) {
        if let Some(journal) = &self.journal {
            journal.record(event);
        }
    }
}

/// Let a full cohort in, then out
fn drain(stm: &Stm, gates: &GatePair) -> tinsel_core::Result<()> {
    gates.entry.open_now(stm)?;
    gates.entry.await_drained_now(stm)?;
    gates.exit.open_now(stm)?;
    gates.exit.await_drained_now(stm)
}

impl std::fmt::Debug for Santa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Santa")
            .field("high", &self.high.name)
            .field("low", &self.low.name)
            .field("cycles", &self.cycles)
            .finish()
    }
}
