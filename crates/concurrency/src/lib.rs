//! Concurrency layer for tinsel
//!
//! This crate implements optimistic concurrency control over memory cells:
//! - TCell: typed, versioned memory cells
//! - TransactionContext: read/write set tracking for one attempt
//! - Snapshot reads against a global version clock
//! - Conflict detection at commit time
//! - Wake-on-commit for transactions blocked in `check`/`retry`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod manager;
pub mod transaction;
pub mod validation;

pub use cell::TCell;
pub use manager::{TransactionManager, TransactionMetrics};
pub use transaction::{RetryReason, TransactionContext, TransactionStatus};
pub use validation::{validate_transaction, ConflictType, ValidationResult};
