//! Engine Tests
//!
//! Commit atomicity, snapshot reads and blocking retry.

mod atomicity;
mod blocking;
mod read_your_writes;
