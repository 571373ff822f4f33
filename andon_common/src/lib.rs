//! Andon Common Library
//!
//! Shared data model, state enums, channels and configuration loading for
//! the Andon workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Capacities, timing defaults and parameter bounds
//! - [`state`] - System state, fault latch value, host machine states
//! - [`types`] - Detection frames, ToF depth frames, depth estimates
//! - [`channel`] - Latest-value slots and the bounded host event queue
//! - [`config`] - Configuration loading traits and the controller file layout
//! - [`runtime`] - Runtime-tunable parameters shared with the host link
//! - [`telemetry`] - Per-cycle telemetry record
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use andon_common::prelude::*;
//!
//! let bucket = HostMachineState::Execute.bucket();
//! assert_eq!(bucket, StateBucket::Run);
//! ```

pub mod channel;
pub mod config;
pub mod consts;
pub mod prelude;
pub mod runtime;
pub mod state;
pub mod telemetry;
pub mod types;
