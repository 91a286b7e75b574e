//! Workshop: the whole Santa Claus problem wired together.
//!
//! A workshop owns one engine instance, an elf group and a reindeer group,
//! the helper threads and Santa. Reindeer are Santa's high-priority pool:
//! when the sleigh team and a group of elves are ready at the same time,
//! the toys go out first.
//!
//! ```no_run
//! use tinsel::{Workshop, WorkshopConfig};
//!
//! let workshop = Workshop::new(WorkshopConfig::default().with_cycles(5))?;
//! let report = workshop.run()?;
//! assert_eq!(report.serviced.len(), 5);
//! # Ok::<(), tinsel::Error>(())
//! ```

use crate::config::WorkshopConfig;
use crate::error::{Error, Result};
use crate::journal::{HelperKind, Journal, WorkshopEvent};
use crate::santa::{Santa, Serviced};
use crate::worker::Worker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tinsel_engine::{Stm, StmMetrics};
use tinsel_primitives::Group;
use tracing::{info, warn};

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct WorkshopReport {
    /// Groups Santa serviced, in order
    pub serviced: Vec<Serviced>,
    /// Everything that happened, in order
    pub events: Vec<WorkshopEvent>,
    /// Engine counters at the end of the run
    pub metrics: StmMetrics,
}

impl WorkshopReport {
    /// Number of groups serviced from the pool named `pool`
    pub fn services_of(&self, pool: &str) -> usize {
        self.serviced.iter().filter(|s| s.pool == pool).count()
    }
}

/// The Santa Claus workshop
#[derive(Debug)]
pub struct Workshop {
    config: WorkshopConfig,
    stm: Arc<Stm>,
    journal: Journal,
}

impl Workshop {
    /// Create a workshop after validating `config`
    pub fn new(config: WorkshopConfig) -> Result<Self> {
        config.validate()?;
        let stm = Stm::builder()
            .retry_wait(config.retry_wait())
            .thread_name_prefix("workshop")
            .build();
        Ok(Self {
            config,
            stm: Arc::new(stm),
            journal: Journal::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &WorkshopConfig {
        &self.config
    }

    /// Engine instance the workshop runs on
    pub fn stm(&self) -> &Arc<Stm> {
        &self.stm
    }

    /// Event journal, shared with the running helpers
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Start the helpers and let Santa service groups
    ///
    /// Returns after `cycles` services; with no cycle limit it only returns
    /// on error. Helpers are told to stop when Santa is done but those
    /// already waiting in a group stay parked; their threads are detached.
    pub fn run(&self) -> Result<WorkshopReport> {
        let elves = Group::new(&self.stm, self.config.elf_group_size)?;
        let reindeer = Group::new(&self.stm, self.config.reindeer_group_size)?;
        let stop = Arc::new(AtomicBool::new(false));

        let mut helpers = self.spawn_helpers(HelperKind::Reindeer, self.config.reindeer, &reindeer, &stop)?;
        helpers.extend(self.spawn_helpers(HelperKind::Elf, self.config.elves, &elves, &stop)?);
        info!(
            elves = self.config.elves,
            reindeer = self.config.reindeer,
            cycles = ?self.config.cycles,
            "workshop open"
        );

        let mut santa = Santa::with_names(
            Arc::clone(&self.stm),
            (HelperKind::Reindeer.name(), reindeer),
            (HelperKind::Elf.name(), elves),
        )
        .with_journal(self.journal.clone());

        let serviced = match self.config.cycles {
            Some(cycles) => santa.run_cycles(cycles),
            None => loop {
                if let Err(e) = santa.run_cycle() {
                    break Err(e);
                }
            },
        };
        stop.store(true, Ordering::Release);
        let serviced = serviced?;

        Self::collect_failures(helpers)?;

        let report = WorkshopReport {
            serviced,
            events: self.journal.snapshot(),
            metrics: self.stm.metrics(),
        };
        info!(
            serviced = report.serviced.len(),
            commit_rate = report.metrics.commit_rate(),
            "workshop closed"
        );
        Ok(report)
    }

    fn spawn_helpers(
        &self,
        kind: HelperKind,
        count: usize,
        group: &Group,
        stop: &Arc<AtomicBool>,
    ) -> Result<Vec<(String, JoinHandle<tinsel_core::Result<u64>>)>> {
        (0..count)
            .map(|id| {
                let worker = Worker::new(kind, id, Arc::clone(&self.stm), group.clone())
                    .with_journal(self.journal.clone())
                    .with_max_delay(self.config.max_worker_delay());
                let name = worker.name();
                let stop = Arc::clone(stop);
                let handle = thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || worker.run_until(&stop))
                    .map_err(|source| {
                        Error::from(tinsel_core::Error::Spawn {
                            name: name.clone(),
                            source,
                        })
                    })?;
                Ok::<_, Error>((name, handle))
            })
            .collect()
    }

    /// Report the first helper that already ended in an error
    ///
    /// Helpers still running are detached.
    fn collect_failures(helpers: Vec<(String, JoinHandle<tinsel_core::Result<u64>>)>) -> Result<()> {
        for (name, handle) in helpers {
            if !handle.is_finished() {
                continue;
            }
            let outcome = handle.join().unwrap_or_else(|_| {
                Err(tinsel_core::Error::Internal(format!("{} thread panicked", name)))
            });
            if let Err(source) = outcome {
                warn!(worker = %name, error = %source, "helper failed");
                return Err(Error::WorkerFailed { name, source });
            }
        }
        Ok(())
    }
}
