//! STM Comprehensive Test Suite
//!
//! This test suite drives the engine, the barrier primitives and the
//! coordinator through the public `tinsel` API only.
//!
//! ## Key Verification Points
//!
//! 1. Commits are atomic under concurrent writers on overlapping cells
//! 2. Reads within an attempt see the attempt's own writes
//! 3. Gates never go below zero or above capacity
//! 4. Groups admit exactly `capacity` members per cohort
//! 5. A cohort's members keep their gates; the next cohort cannot overtake
//! 6. The high-priority pool is serviced first when both are full
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all tests
//! cargo test --test stm_comprehensive
//!
//! # Run barrier tests only
//! cargo test --test stm_comprehensive barriers::
//! ```

use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

use tinsel::{Group, Stm};

// Test modules
pub mod barriers;
pub mod engine;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .try_init();
    });
}

/// Create a shared engine with a short safety-net wait
pub fn create_stm() -> Arc<Stm> {
    init_tracing();
    Arc::new(Stm::builder().retry_wait(Duration::from_millis(10)).build())
}

/// Poll `condition` until it holds, panicking after 10 seconds
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(std::time::Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}

/// Free places of `group`, as last committed
pub fn spaces_left(stm: &Stm, group: &Group) -> usize {
    stm.atomically(|tx| group.spaces_left(tx)).unwrap()
}
