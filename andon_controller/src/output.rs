//! Andon light output.
//!
//! The controller's state goes out through a last-value-wins slot, written
//! only when the state changes. The LED driver maps it to a color with
//! [`andon_color`].

use std::sync::Arc;

use andon_common::channel::LatestSlot;
use andon_common::consts::UNINITIALIZED_COLOR;
use andon_common::runtime::RuntimeConfig;
use andon_common::state::{Rgb, SystemState};

/// Light color for `state`.
pub fn andon_color(state: SystemState, cfg: &RuntimeConfig) -> Rgb {
    match state {
        SystemState::Uninitialized | SystemState::HostReading => Rgb(UNINITIALIZED_COLOR),
        SystemState::Warning => cfg.warning_color,
        SystemState::Stopped | SystemState::HostStoppedState => cfg.stopped_color,
        SystemState::HostActiveState => cfg.active_color,
        SystemState::Scanning => cfg.idle_color,
    }
}

/// Edge-triggered publisher: writes to the slot only on change.
pub struct EdgePublisher<T> {
    slot: Arc<LatestSlot<T>>,
    last: Option<T>,
}

impl<T: Clone + PartialEq> EdgePublisher<T> {
    pub fn new(slot: Arc<LatestSlot<T>>) -> Self {
        Self { slot, last: None }
    }

    /// Publish `value` if it differs from the last published one.
    /// Returns the previous value on change.
    pub fn publish(&mut self, value: T) -> Option<Option<T>> {
        if self.last.as_ref() == Some(&value) {
            return None;
        }
        self.slot.publish(value.clone());
        Some(self.last.replace(value))
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }
}
