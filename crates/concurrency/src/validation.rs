//! Commit-time validation
//!
//! An attempt may commit only if every cell it read still carries the
//! version it observed. Validation runs under the manager's commit lock, so
//! the answer cannot go stale before the writes are applied.
//!
//! Write-only cells are not validated: blind writes never conflict.

use crate::transaction::{ReadEntry, TransactionContext};
use rustc_hash::FxHashMap;
use tinsel_core::{CellId, Version};

/// A single reason an attempt may not commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// A cell in the read set was committed by someone else
    ReadWrite {
        /// Cell that moved
        cell: CellId,
        /// Version the attempt observed
        observed: Version,
        /// Version now committed
        current: Version,
    },
}

impl ConflictType {
    /// Cell involved in the conflict
    pub fn cell(&self) -> CellId {
        match self {
            ConflictType::ReadWrite { cell, .. } => *cell,
        }
    }
}

/// Outcome of validating an attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Every conflict found, in no particular order
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// A result without conflicts
    pub fn ok() -> Self {
        Self::default()
    }

    /// Check if the attempt may commit
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// First conflicting cell, if any
    pub fn first_conflict(&self) -> Option<CellId> {
        self.conflicts.first().map(ConflictType::cell)
    }
}

pub(crate) fn validate_read_set(read_set: &FxHashMap<CellId, ReadEntry>) -> ValidationResult {
    let conflicts = read_set
        .iter()
        .filter_map(|(id, entry)| {
            let current = entry.cell.version();
            (current != entry.version).then_some(ConflictType::ReadWrite {
                cell: *id,
                observed: entry.version,
                current,
            })
        })
        .collect();
    ValidationResult { conflicts }
}

/// Validate an attempt against the currently committed versions
///
/// Callers outside the commit lock get an advisory answer only.
pub fn validate_transaction(txn: &TransactionContext<'_>) -> ValidationResult {
    validate_read_set(txn.read_set())
}
