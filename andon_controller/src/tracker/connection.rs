//! Host heartbeat tracker.
//!
//! The last heartbeat tick lives in one `AtomicU64`, so heartbeats recorded
//! on the host-link context and liveness checks on the control context never
//! see a torn value. There is no explicit disconnect: a host is disconnected
//! once `now - last_heartbeat > timeout`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel for "no heartbeat yet". Stored ticks are offset by one.
const NEVER: u64 = 0;

#[derive(Debug)]
pub struct ConnectionTracker {
    /// `last_heartbeat_ms + 1`, or [`NEVER`].
    last: AtomicU64,
    timeout_ms: u64,
}

impl ConnectionTracker {
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            last: AtomicU64::new(NEVER),
            timeout_ms,
        }
    }

    /// Record a heartbeat at `now_ms`.
    ///
    /// Monotonic: a heartbeat stamped earlier than one already recorded
    /// does not move the tick back.
    pub fn on_heartbeat(&self, now_ms: u64) {
        self.last
            .fetch_max(now_ms.saturating_add(1), Ordering::AcqRel);
    }

    /// True iff a heartbeat arrived and at most `timeout_ms` elapsed since.
    pub fn is_connected(&self, now_ms: u64) -> bool {
        self.last_heartbeat_ms()
            .is_some_and(|t| now_ms.saturating_sub(t) <= self.timeout_ms)
    }

    pub fn last_heartbeat_ms(&self) -> Option<u64> {
        match self.last.load(Ordering::Acquire) {
            NEVER => None,
            t => Some(t - 1),
        }
    }

    #[inline]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
}
