//! Convenient imports for Tinsel.
//!
//! ```
//! use tinsel::prelude::*;
//!
//! let stm = Stm::new();
//! let gate = Gate::new(&stm, 2)?;
//! gate.open_now(&stm)?;
//! # Ok::<(), tinsel::Error>(())
//! ```

// Engine
pub use crate::{Stm, StmBuilder, TCell, Transaction, TransactionContext};

// Body helpers
pub use crate::{guard, retry, unwrap_or_retry, StmResult};

// Barriers
pub use crate::{Gate, GatePair, Group};

// Workshop
pub use crate::{HelperKind, Santa, Worker, Workshop, WorkshopConfig};

// Error handling
pub use crate::error::{Error, Result};
