//! Engine configuration
//!
//! ```
//! use std::time::Duration;
//! use tinsel_engine::Stm;
//!
//! let stm = Stm::builder()
//!     .retry_wait(Duration::from_millis(10))
//!     .thread_name_prefix("workshop")
//!     .build();
//! assert_eq!(stm.config().retry_wait, Duration::from_millis(10));
//! ```

use crate::stm::Stm;
use std::time::Duration;

/// Default upper bound on a single wait of a blocked transaction
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_millis(50);

/// Smallest accepted retry wait; anything lower would degrade into spinning
pub const MIN_RETRY_WAIT: Duration = Duration::from_millis(1);

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StmConfig {
    /// Upper bound on one wait of a transaction blocked in `check`/`retry`
    ///
    /// Blocked transactions are woken by commits that touch what they read.
    /// This interval only bounds how long a missed signal can delay them.
    pub retry_wait: Duration,

    /// Prefix for threads started by `run_concurrently`
    pub thread_name_prefix: String,
}

impl Default for StmConfig {
    fn default() -> Self {
        Self {
            retry_wait: DEFAULT_RETRY_WAIT,
            thread_name_prefix: "stm-task".to_string(),
        }
    }
}

/// Builder for [`Stm`]
#[derive(Debug, Clone, Default)]
pub struct StmBuilder {
    config: StmConfig,
}

impl StmBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upper bound on a single wait of a blocked transaction.
    ///
    /// Values below [`MIN_RETRY_WAIT`] are raised to it.
    pub fn retry_wait(mut self, wait: Duration) -> Self {
        self.config.retry_wait = wait.max(MIN_RETRY_WAIT);
        self
    }

    /// Set the name prefix for threads started by `run_concurrently`.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Create the engine.
    pub fn build(self) -> Stm {
        Stm::with_config(self.config)
    }
}
