//! Host machine state tracker.
//!
//! Stores the last reported [`HostMachineState`] (last-write-wins) and owns
//! the only path that clears an E-stop: a received update whose bucket is not
//! `Stop`. Re-sending the same non-stop state still clears a latched fault.

use andon_common::state::{HostMachineState, StateBucket};
use tracing::{debug, info};

use crate::state::fault::FaultLatch;

#[derive(Debug, Clone, Default)]
pub struct HostStateTracker {
    state: HostMachineState,
    updates: u64,
}

impl HostStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a host-state update. Returns the new bucket.
    pub fn on_host_state(&mut self, state: HostMachineState, fault: &mut FaultLatch) -> StateBucket {
        let bucket = state.bucket();
        if state != self.state {
            debug!(from = ?self.state, to = ?state, ?bucket, "host state update");
        }
        self.state = state;
        self.updates += 1;

        if bucket != StateBucket::Stop && fault.clear_estop() {
            info!(host_state = ?state, "E-stop acknowledged by host, fault cleared");
        }
        bucket
    }

    #[inline]
    pub fn current(&self) -> HostMachineState {
        self.state
    }

    #[inline]
    pub fn current_bucket(&self) -> StateBucket {
        self.state.bucket()
    }

    /// Number of updates received since start.
    #[inline]
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// True when the host currently demands a stop.
    #[inline]
    pub fn demands_stop(&self) -> bool {
        self.current_bucket() == StateBucket::Stop
    }
}
