//! Staleness-bounded cache for the latest sensor frame.
//!
//! Holds the last received frame and its receive tick. A frame older than
//! the window is dropped on the next refresh and never handed out again.

/// Where this cycle's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Received this cycle.
    Fresh,
    /// Reused from an earlier cycle, still inside the window.
    Cached,
    /// Nothing usable.
    Absent,
}

#[derive(Debug, Clone)]
pub struct StaleCache<T> {
    value: Option<T>,
    received_at_ms: u64,
    window_ms: u64,
}

impl<T> StaleCache<T> {
    pub const fn new(window_ms: u64) -> Self {
        Self {
            value: None,
            received_at_ms: 0,
            window_ms,
        }
    }

    /// Store `incoming` if present, otherwise age out the held value.
    pub fn refresh(&mut self, incoming: Option<T>, now_ms: u64) -> Freshness {
        if let Some(v) = incoming {
            self.value = Some(v);
            self.received_at_ms = now_ms;
            return Freshness::Fresh;
        }
        if self.value.is_some() && self.expired(now_ms) {
            self.value = None;
        }
        if self.value.is_some() {
            Freshness::Cached
        } else {
            Freshness::Absent
        }
    }

    /// The held value if it is within the window at `now_ms`.
    pub fn current(&self, now_ms: u64) -> Option<&T> {
        self.value.as_ref().filter(|_| !self.expired(now_ms))
    }

    /// Age of the held value, if any.
    pub fn age_ms(&self, now_ms: u64) -> Option<u64> {
        self.value
            .as_ref()
            .map(|_| now_ms.saturating_sub(self.received_at_ms))
    }

    #[inline]
    pub const fn window_ms(&self) -> u64 {
        self.window_ms
    }

    #[inline]
    fn expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.received_at_ms) > self.window_ms
    }
}
