//! Core types for tinsel
//!
//! Shared identifiers, versions, and error types used by every other crate
//! in the workspace. This crate has no knowledge of how transactions are
//! executed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{abort, guard, retry, unwrap_or_retry, Error, Result, StmError, StmResult};
pub use types::{CellId, StmId, TxnId, Version};
