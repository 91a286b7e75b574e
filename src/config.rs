//! Workshop configuration.
//!
//! Every field has a default, so a partial (or empty) JSON document is a
//! valid configuration:
//!
//! ```
//! use tinsel::WorkshopConfig;
//!
//! let config = WorkshopConfig::from_json(r#"{ "elves": 6, "cycles": 4 }"#).unwrap();
//! assert_eq!(config.elves, 6);
//! assert_eq!(config.elf_group_size, 3);
//! assert_eq!(config.cycles, Some(4));
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sizes and pacing of a workshop run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
    /// Number of elf threads
    pub elves: usize,

    /// Elves Santa meets at a time
    pub elf_group_size: usize,

    /// Number of reindeer threads
    pub reindeer: usize,

    /// Reindeer needed to deliver toys
    pub reindeer_group_size: usize,

    /// Groups Santa services before the run ends; `None` runs forever
    pub cycles: Option<usize>,

    /// Upper bound of the random pause a helper takes between cycles
    ///
    /// `None` or 0 means no pause.
    pub max_worker_delay_ms: Option<u64>,

    /// Safety-net wait for transactions blocked on a gate or group
    pub retry_wait_ms: u64,
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            elves: 10,
            elf_group_size: 3,
            reindeer: 9,
            reindeer_group_size: 9,
            cycles: None,
            max_worker_delay_ms: None,
            retry_wait_ms: tinsel_engine::DEFAULT_RETRY_WAIT.as_millis() as u64,
        }
    }
}

impl WorkshopConfig {
    /// Parse a JSON configuration document and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the number of groups serviced before the run ends
    pub fn with_cycles(mut self, cycles: usize) -> Self {
        self.cycles = Some(cycles);
        self
    }

    /// Set the upper bound of the random pause between helper cycles
    pub fn with_max_worker_delay(mut self, delay: Duration) -> Self {
        self.max_worker_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Upper bound of the random pause between helper cycles, if any
    pub fn max_worker_delay(&self) -> Option<Duration> {
        self.max_worker_delay_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Safety-net wait for blocked transactions
    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }

    /// Check the configuration can make progress
    ///
    /// A pool smaller than its group size never fills, so Santa would wait
    /// on it forever.
    pub fn validate(&self) -> Result<()> {
        let pools = [
            ("elves", self.elves, self.elf_group_size),
            ("reindeer", self.reindeer, self.reindeer_group_size),
        ];
        for (name, pool, group) in pools {
            if pool == 0 {
                return Err(Error::InvalidConfig(format!("{} must be at least 1", name)));
            }
            if group == 0 {
                return Err(Error::InvalidConfig(format!(
                    "{} group size must be at least 1",
                    name
                )));
            }
            if group > pool {
                return Err(Error::InvalidConfig(format!(
                    "{} group size {} exceeds pool of {}",
                    name, group, pool
                )));
            }
        }
        Ok(())
    }
}
