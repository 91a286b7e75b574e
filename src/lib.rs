//! # Tinsel
//!
//! In-process software transactional memory, and the Santa Claus workshop
//! built on top of it.
//!
//! Tinsel provides memory cells that are read and written only inside
//! transactions. A transaction commits all of its writes atomically or none
//! of them, and may block until the cells it read change.
//!
//! ## Quick Start
//!
//! ```
//! use tinsel::prelude::*;
//!
//! let stm = Stm::new();
//! let stock = stm.allocate(3u32);
//!
//! // Take one item, blocking while the shelf is empty
//! stm.atomically(|tx| {
//!     let n = tx.read(&stock)?;
//!     tx.check(|| n > 0)?;
//!     tx.store(&stock, n - 1)
//! })?;
//!
//! assert_eq!(stock.peek(), 2);
//! # Ok::<(), tinsel::Error>(())
//! ```
//!
//! ## Layers
//!
//! 1. **Engine** - [`Stm`], [`Transaction`], [`TCell`]
//! 2. **Barriers** - [`Gate`] and [`Group`], built from cells
//! 3. **Coordination** - [`Santa`] arbitrating two pools of [`Worker`]s,
//!    and [`Workshop`] wiring the classic problem together

#![warn(missing_docs)]

mod config;
mod error;
mod journal;
mod santa;
mod worker;
mod workshop;

pub mod handoff;
pub mod prelude;

// Re-export main entry points
pub use config::WorkshopConfig;
pub use error::{Error, Result};
pub use journal::{HelperKind, Journal, WorkshopEvent};
pub use santa::{Priority, Santa, Serviced};
pub use worker::Worker;
pub use workshop::{Workshop, WorkshopReport};

// Re-export the engine and its primitives
pub use tinsel_core::{abort, guard, retry, unwrap_or_retry, CellId, StmError, StmResult, Version};
pub use tinsel_engine::{
    forever, Stm, StmBuilder, StmConfig, StmMetrics, TCell, TaskHandle, Transaction,
    TransactionContext, TransactionStatus,
};
pub use tinsel_primitives::{Gate, GatePair, Group};
