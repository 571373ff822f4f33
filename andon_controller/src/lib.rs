//! # Andon Safety Controller Library
//!
//! Fuses camera detections, ToF depth frames and host link events into one
//! authoritative [`SystemState`](andon_common::state::SystemState) per
//! fixed-period cycle, and drives the Andon light from it.
//!
//! ## Decision Priority
//!
//! 1. **Latched fault**: `EStopped` or `ProgramError` → `Stopped`
//! 2. **Host stop bucket**: connected host in a stop state → latch, `Stopped`
//! 3. **Danger distance**: any valid estimate ≤ threshold → latch, `Stopped`
//! 4. **Person in view**: `Warning`
//! 5. **Nobody in view**: `HostActiveState` (connected) or `Scanning`
//!
//! ## Allocation-Free Cycle
//!
//! Detection lists, ToF cells, cell sets and event batches are fixed-capacity
//! `heapless` containers. Channels copy whole values under one short lock.

pub mod clock;
pub mod config;
pub mod cycle;
pub mod depth;
pub mod error;
pub mod output;
pub mod rpc;
pub mod sim;
pub mod state;
pub mod tracker;
