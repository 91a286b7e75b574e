//! Core types for the transactional engine
//!
//! This module defines the identifiers used throughout the system:
//! - [`StmId`]: Identity of one engine instance
//! - [`CellId`]: Identity of a memory cell within an engine
//! - [`TxnId`]: Identity of a single transaction attempt
//! - [`Version`]: Commit version stamped on every cell write

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an STM engine instance
///
/// Every cell remembers the engine that allocated it. The engine uses this
/// to reject cells that were handed to it from a different instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StmId(Uuid);

impl StmId {
    /// Create a new random StmId using UUID v4
    ///
    /// # Examples
    ///
    /// ```
    /// use tinsel_core::StmId;
    ///
    /// let a = StmId::new();
    /// let b = StmId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        StmId(Uuid::new_v4())
    }

    /// Get raw bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for StmId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a memory cell
///
/// Allocated from a per-engine counter, stable for the lifetime of the
/// process. Two cells of the same engine never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(u64);

impl CellId {
    /// Wrap a raw counter value
    pub const fn new(raw: u64) -> Self {
        CellId(raw)
    }

    /// Raw counter value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Identifier of one transaction attempt
///
/// Each attempt gets a fresh id, so a transaction that retries three times
/// shows up under four ids in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxnId(u64);

impl TxnId {
    /// Wrap a raw counter value
    pub const fn new(raw: u64) -> Self {
        TxnId(raw)
    }

    /// Raw counter value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn#{}", self.0)
    }
}

/// Commit version
///
/// The engine keeps a global clock of versions. Every commit that writes
/// anything takes the next version and stamps it on each cell it writes.
/// Freshly allocated cells carry [`Version::ZERO`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Version(u64);

impl Version {
    /// Version of a cell that has never been written by a commit
    pub const ZERO: Version = Version(0);

    /// Wrap a raw clock value
    pub const fn new(raw: u64) -> Self {
        Version(raw)
    }

    /// Raw clock value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The version immediately after this one
    pub const fn next(&self) -> Version {
        Version(self.0 + 1)
    }
}

impl From<u64> for Version {
    fn from(raw: u64) -> Self {
        Version(raw)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}
