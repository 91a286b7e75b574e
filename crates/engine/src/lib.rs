//! Transaction execution engine for tinsel
//!
//! The engine owns the retry loop: it runs transaction bodies against fresh
//! attempts, commits them, re-runs them after conflicts and parks them while
//! they are blocked. It also launches transactions on their own threads.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use tinsel_engine::{Stm, Transaction};
//!
//! let stm = Arc::new(Stm::new());
//! let counter = stm.allocate(0u32);
//!
//! let bump = {
//!     let counter = counter.clone();
//!     Transaction::builder()
//!         .step(move |tx| {
//!             tx.modify(&counter, |n| n + 1)?;
//!             Ok(())
//!         })
//!         .build()
//! };
//!
//! let handles = stm.run_concurrently(vec![bump.clone(), bump]).unwrap();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(counter.peek(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod stm;
pub mod transaction;

pub use config::{StmBuilder, StmConfig, DEFAULT_RETRY_WAIT, MIN_RETRY_WAIT};
pub use stm::Stm;
pub use transaction::{forever, TaskHandle, Transaction, TransactionBuilder};

pub use tinsel_concurrency::{
    RetryReason, TCell, TransactionContext, TransactionMetrics as StmMetrics, TransactionStatus,
};
