//! Ordered record of what happened in the workshop.

use crate::santa::Priority;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Kind of helper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperKind {
    /// Builds toys; Santa meets them in groups in his study
    Elf,
    /// Pulls the sleigh; all of them are needed to deliver toys
    Reindeer,
}

impl HelperKind {
    /// Lower-case name used for threads and logs
    pub fn name(&self) -> &'static str {
        match self {
            HelperKind::Elf => "elf",
            HelperKind::Reindeer => "reindeer",
        }
    }

    /// What a group of these helpers does once Santa lets them in
    pub fn task(&self) -> &'static str {
        match self {
            HelperKind::Elf => "meeting in the study",
            HelperKind::Reindeer => "delivering toys",
        }
    }
}

impl std::fmt::Display for HelperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the workshop journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkshopEvent {
    /// Santa picked a full group and is about to open its entry gate
    ServiceStarted {
        /// Pool the group came from
        pool: String,
        /// Priority of that pool
        priority: Priority,
    },
    /// A helper passed the entry gate and did its part of the group task
    TaskPerformed {
        /// Helper kind
        kind: HelperKind,
        /// Helper number within its kind
        id: usize,
    },
    /// Every member of the group has passed the exit gate
    ServiceFinished {
        /// Pool the group came from
        pool: String,
    },
}

/// Shared, append-only event log
///
/// Clones append to the same log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<WorkshopEvent>>>,
}

impl Journal {
    /// Create an empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn record(&self, event: WorkshopEvent) {
        self.events.lock().push(event);
    }

    /// Copy of every event so far, in order
    pub fn snapshot(&self) -> Vec<WorkshopEvent> {
        self.events.lock().clone()
    }

    /// Number of events so far
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
