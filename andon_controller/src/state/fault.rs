//! Single-value fault latch.
//!
//! At most one [`SystemFault`] is active. A second fault replaces the first
//! only if it is more severe. `EStopped` clears only through
//! [`FaultLatch::clear_estop`] (host acknowledgement); `ProgramError` never
//! clears.

use andon_common::state::SystemFault;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct FaultLatch {
    fault: SystemFault,
    latched_at_ms: Option<u64>,
    /// Times a fault was latched since start.
    latch_count: u64,
}

impl FaultLatch {
    pub const fn new() -> Self {
        Self {
            fault: SystemFault::None,
            latched_at_ms: None,
            latch_count: 0,
        }
    }

    #[inline]
    pub const fn current(&self) -> SystemFault {
        self.fault
    }

    #[inline]
    pub const fn is_active(&self) -> bool {
        self.fault.is_active()
    }

    /// Tick at which the current fault was latched.
    #[inline]
    pub const fn latched_at_ms(&self) -> Option<u64> {
        self.latched_at_ms
    }

    #[inline]
    pub const fn latch_count(&self) -> u64 {
        self.latch_count
    }

    /// Latch `fault`. Returns true if the latched value changed.
    ///
    /// `SystemFault::None` is ignored; use the clear path instead.
    pub fn latch(&mut self, fault: SystemFault, now_ms: u64) -> bool {
        if fault.severity() <= self.fault.severity() {
            return false;
        }
        warn!(?fault, previous = ?self.fault, at_ms = now_ms, "fault latched");
        self.fault = fault;
        self.latched_at_ms = Some(now_ms);
        self.latch_count += 1;
        true
    }

    /// Clear an `EStopped` fault. Returns true if it was cleared.
    pub fn clear_estop(&mut self) -> bool {
        if self.fault != SystemFault::EStopped {
            return false;
        }
        self.fault = SystemFault::None;
        self.latched_at_ms = None;
        true
    }
}
