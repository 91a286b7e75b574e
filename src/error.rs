//! Unified error types for Tinsel.
//!
//! This module wraps the engine's errors and adds the failures of the
//! workshop layer, presenting one error type to users.

use thiserror::Error;

/// All Tinsel errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Error raised by the STM engine or its primitives
    #[error(transparent)]
    Stm(#[from] tinsel_core::Error),

    /// Workshop configuration rejected by validation
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A helper thread ended with an error
    #[error("worker {name} failed: {source}")]
    WorkerFailed {
        /// Worker name, e.g. `elf-3`
        name: String,
        /// What went wrong
        #[source]
        source: tinsel_core::Error,
    },

    /// Configuration could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type for Tinsel operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::ConfigParse(_))
    }

    /// Check if this error came from a panicking transaction step.
    pub fn is_panic(&self) -> bool {
        match self {
            Error::Stm(e) | Error::WorkerFailed { source: e, .. } => e.is_panic(),
            _ => false,
        }
    }

    /// Check if a handoff partner went away.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Error::Stm(tinsel_core::Error::Disconnected))
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        match self {
            Error::Stm(e) | Error::WorkerFailed { source: e, .. } => e.is_serious(),
            _ => false,
        }
    }
}
