//! Barrier Tests
//!
//! Gate and Group invariants, admission and ordering.

mod admission;
mod gate_invariants;
