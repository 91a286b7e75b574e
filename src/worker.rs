//! Helper threads: elves and reindeer.
//!
//! Every helper loops through the same four phases, one transaction each:
//!
//! 1. join its group (blocks while the group is full)
//! 2. pass the cohort's entry gate (blocks until Santa opens it)
//! 3. do its part of the group task, outside any transaction
//! 4. pass the cohort's exit gate
//!
//! then optionally pauses for a random interval before the next cycle.

use crate::journal::{HelperKind, Journal, WorkshopEvent};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tinsel_core::Result;
use tinsel_engine::Stm;
use tinsel_primitives::Group;
use tracing::trace;

/// One elf or reindeer
#[derive(Debug, Clone)]
pub struct Worker {
    kind: HelperKind,
    id: usize,
    stm: Arc<Stm>,
    group: Group,
    journal: Option<Journal>,
    max_delay: Option<Duration>,
}

impl Worker {
    /// Create a helper that joins `group`
    pub fn new(kind: HelperKind, id: usize, stm: Arc<Stm>, group: Group) -> Self {
        Self {
            kind,
            id,
            stm,
            group,
            journal: None,
            max_delay: None,
        }
    }

    /// Record every task performed in `journal`
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Pause for a random interval up to `max` between cycles
    pub fn with_max_delay(mut self, max: Option<Duration>) -> Self {
        self.max_delay = max;
        self
    }

    /// Helper kind
    pub fn kind(&self) -> HelperKind {
        self.kind
    }

    /// Name such as `elf-3`
    pub fn name(&self) -> String {
        format!("{}-{}", self.kind, self.id)
    }

    /// Run one full cycle
    pub fn run_cycle(&self) -> Result<()> {
        let gates = self.group.join_now(&self.stm)?;
        gates.entry.pass_now(&self.stm)?;

        trace!(worker = %self.name(), task = self.kind.task(), "performing task");
        if let Some(journal) = &self.journal {
            journal.record(WorkshopEvent::TaskPerformed {
                kind: self.kind,
                id: self.id,
            });
        }

        gates.exit.pass_now(&self.stm)?;
        self.pause();
        Ok(())
    }

    /// Run cycles until `stop` is raised
    ///
    /// `stop` is checked between cycles. Returns the number of completed
    /// cycles.
    pub fn run_until(&self, stop: &AtomicBool) -> Result<u64> {
        let mut cycles = 0;
        while !stop.load(Ordering::Acquire) {
            self.run_cycle()?;
            cycles += 1;
        }
        Ok(cycles)
    }

    fn pause(&self) {
        let Some(max) = self.max_delay else {
            return;
        };
        let millis = rand::thread_rng().gen_range(0..=delay_bound_millis(max));
        thread::sleep(Duration::from_millis(millis));
    }
}

/// Upper bound of the random pause in whole milliseconds, saturating
fn delay_bound_millis(max: Duration) -> u64 {
    u64::try_from(max.as_millis()).unwrap_or(u64::MAX)
}
