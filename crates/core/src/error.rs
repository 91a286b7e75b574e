//! Error types for the transactional engine
//!
//! Two layers:
//! - [`StmError`] is the control value a transaction body returns. It is
//!   threaded through step code with `?` and interpreted by the engine's
//!   retry loop. Most of its variants never reach a caller.
//! - [`Error`] is what a caller of `run`/`atomically` sees when a
//!   transaction cannot complete.

use crate::types::CellId;
use thiserror::Error;

/// Control result of a transaction body
///
/// `Retry` and `Conflict` both send the engine back around its retry loop.
/// `Retry` is a voluntary block: the engine parks the attempt until one of
/// the cells it read changes. `Conflict` is re-run immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StmError {
    /// The body asked to block until something it read changes
    #[error("transaction retry requested")]
    Retry,

    /// A read observed a commit newer than the attempt's snapshot
    #[error("conflict on {cell}")]
    Conflict {
        /// Cell whose version moved
        cell: CellId,
    },

    /// A cell from another engine instance was used
    #[error("{cell} belongs to a different STM instance")]
    ForeignCell {
        /// Offending cell
        cell: CellId,
    },

    /// The body gave up; the attempt is discarded and the reason returned
    #[error("transaction aborted: {0}")]
    Abort(String),
}

impl StmError {
    /// Check if the engine handles this error by re-running the body
    pub fn is_retryable(&self) -> bool {
        matches!(self, StmError::Retry | StmError::Conflict { .. })
    }

    /// Check if this is a voluntary block
    pub fn is_retry(&self) -> bool {
        matches!(self, StmError::Retry)
    }

    /// Check if this is a snapshot conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, StmError::Conflict { .. })
    }
}

/// Result type for transaction bodies
pub type StmResult<T> = std::result::Result<T, StmError>;

/// Errors surfaced to callers of the engine
#[derive(Debug, Error)]
pub enum Error {
    /// The transaction body aborted explicitly
    #[error("transaction aborted: {0}")]
    Aborted(String),

    /// A step panicked; none of the attempt's writes were applied
    #[error("transaction step panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text
        message: String,
    },

    /// A cell from another engine instance was used
    #[error("{cell} belongs to a different STM instance")]
    ForeignCell {
        /// Offending cell
        cell: CellId,
    },

    /// A Gate or Group was created with zero capacity
    #[error("invalid capacity {capacity}: must be at least 1")]
    InvalidCapacity {
        /// Requested capacity
        capacity: usize,
    },

    /// The other side of a handoff went away
    #[error("handoff disconnected")]
    Disconnected,

    /// A concurrent task could not be started
    #[error("failed to spawn task {name}: {source}")]
    Spawn {
        /// Task name
        name: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error came from a panicking step
    pub fn is_panic(&self) -> bool {
        matches!(self, Error::Panicked { .. })
    }

    /// Check if this is caller misuse rather than a runtime failure
    pub fn is_misuse(&self) -> bool {
        matches!(self, Error::ForeignCell { .. } | Error::InvalidCapacity { .. })
    }

    /// Check if this is a serious/unrecoverable error
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

/// Request a voluntary block
///
/// The engine discards the attempt and re-runs it once any cell read so far
/// has been changed by another commit.
pub fn retry<T>() -> StmResult<T> {
    Err(StmError::Retry)
}

/// Block unless `cond` holds
///
/// ```
/// use tinsel_core::{guard, StmError};
///
/// assert!(guard(true).is_ok());
/// assert_eq!(guard(false), Err(StmError::Retry));
/// ```
pub fn guard(cond: bool) -> StmResult<()> {
    if cond {
        Ok(())
    } else {
        retry()
    }
}

/// Unwrap an `Option`, blocking while it is `None`
pub fn unwrap_or_retry<T>(option: Option<T>) -> StmResult<T> {
    match option {
        Some(value) => Ok(value),
        None => retry(),
    }
}

/// Abort the transaction with a reason
pub fn abort<T>(reason: impl Into<String>) -> StmResult<T> {
    Err(StmError::Abort(reason.into()))
}
