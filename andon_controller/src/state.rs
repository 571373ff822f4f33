//! Safety state machine and the state it owns.
//!
//! - [`machine`] - Per-cycle decision: fault, host stop, danger, warning
//! - [`fault`] - Single-value fault latch
//! - [`cache`] - Staleness-bounded sensor frame cache

pub mod cache;
pub mod fault;
pub mod machine;

pub use machine::{ControllerParams, CycleInputs, CycleOutcome, Decision, SafetyController};
