//! In-process channels between pipeline stages.
//!
//! Two shapes only:
//!
//! - [`LatestSlot`]: single-slot, last-write-wins. Producers overwrite, readers
//!   sample whatever is newest and never block. Each [`SlotReader`] tracks the
//!   sequence number it last saw, so "no new value" is distinguishable from
//!   "same value again".
//! - [`EventQueue`]: bounded FIFO for discrete events. A full queue rejects the
//!   new event instead of overwriting an older one.
//!
//! Values are copied in and out whole under one short lock, so a reader never
//! observes a partially written multi-field struct.

use std::sync::Arc;

use heapless::Deque;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::HOST_EVENT_QUEUE_CAPACITY;
use crate::state::HostMachineState;

/// Channel operation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Event queue at capacity; the event was not enqueued.
    #[error("event queue full (capacity {capacity})")]
    QueueFull { capacity: usize },
}

// ─── Latest-Value Slot ──────────────────────────────────────────────

struct Slot<T> {
    value: Option<T>,
    /// Incremented on every publish. 0 = never published.
    seq: u64,
}

/// Single-slot, last-write-wins channel.
pub struct LatestSlot<T> {
    inner: Mutex<Slot<T>>,
}

impl<T: Clone> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Slot {
                value: None,
                seq: 0,
            }),
        }
    }

    /// Convenience: a shared slot.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Replace the stored value. Never blocks on readers beyond the copy.
    pub fn publish(&self, value: T) {
        let mut slot = self.inner.lock();
        slot.value = Some(value);
        slot.seq = slot.seq.wrapping_add(1);
    }

    /// Copy of the newest value, whether or not it was seen before.
    pub fn latest(&self) -> Option<T> {
        self.inner.lock().value.clone()
    }

    /// Number of publishes so far.
    pub fn seq(&self) -> u64 {
        self.inner.lock().seq
    }

    /// Newest value if its sequence differs from `seen`, with its sequence.
    fn newer_than(&self, seen: u64) -> Option<(T, u64)> {
        let slot = self.inner.lock();
        if slot.seq == seen {
            return None;
        }
        slot.value.clone().map(|v| (v, slot.seq))
    }
}

impl<T: Clone> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader endpoint that yields each published value at most once.
pub struct SlotReader<T> {
    slot: Arc<LatestSlot<T>>,
    seen: u64,
}

impl<T: Clone> SlotReader<T> {
    pub fn new(slot: Arc<LatestSlot<T>>) -> Self {
        Self { slot, seen: 0 }
    }

    /// Non-blocking: the newest value if one was published since the last
    /// successful call. Intermediate values overwritten in between are lost.
    pub fn try_recv(&mut self) -> Option<T> {
        let (value, seq) = self.slot.newer_than(self.seen)?;
        self.seen = seq;
        Some(value)
    }

    /// True if a value newer than the last received one is available.
    pub fn has_changed(&self) -> bool {
        self.slot.seq() != self.seen
    }
}

// ─── Bounded Event Queue ────────────────────────────────────────────

/// Bounded FIFO of discrete events. Never overwrites.
pub struct EventQueue<T, const N: usize> {
    inner: Mutex<Deque<T, N>>,
}

impl<T, const N: usize> EventQueue<T, N> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Deque::new()),
        }
    }

    /// Enqueue at the back. Rejects when full.
    pub fn try_send(&self, event: T) -> Result<(), ChannelError> {
        self.inner
            .lock()
            .push_back(event)
            .map_err(|_| ChannelError::QueueFull { capacity: N })
    }

    /// Dequeue from the front, non-blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Move every queued event into `out` in FIFO order (one lock).
    pub fn drain_into(&self, out: &mut heapless::Vec<T, N>) {
        let mut q = self.inner.lock();
        while let Some(ev) = q.pop_front() {
            // `out` has the same capacity as the queue.
            if out.push(ev).is_err() {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for EventQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Host Events ────────────────────────────────────────────────────

/// Discrete notification from the host link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostEvent {
    /// Host liveness ping.
    Heartbeat,
    /// Host machine state update (last-write-wins at the tracker).
    HostState(HostMachineState),
}

/// The host event queue used between the host link and the controller.
pub type HostEventQueue = EventQueue<HostEvent, HOST_EVENT_QUEUE_CAPACITY>;

/// Drained host events of one cycle.
pub type HostEventBatch = heapless::Vec<HostEvent, HOST_EVENT_QUEUE_CAPACITY>;

// ─── Tests ──────────────────────────────────────────────────────────
