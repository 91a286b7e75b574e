//! Barrier primitives for tinsel
//!
//! This crate provides two coordination primitives built entirely from STM
//! cells:
//! - **Gate**: reusable counting barrier, opened by a coordinator and passed
//!   by up to `capacity` members per opening
//! - **Group**: bounded waiting room that hands each full cohort its own pair
//!   of gates
//!
//! Every operation comes in two forms: one that runs inside the caller's
//! transaction (`pass`, `join`, ...) and one that runs its own (`pass_now`,
//! `join_now`, ...).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gate;
pub mod group;

pub use gate::Gate;
pub use group::{GatePair, Group};
