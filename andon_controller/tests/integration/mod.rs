//! Shared rig for the integration tests.

mod cycle;
mod host_modes;
mod rpc;
mod safety_latch;
mod staleness;

use andon_common::channel::HostEvent;
use andon_common::state::HostMachineState;
use andon_common::types::{
    BBox, CameraMeta, Detection, DetectionFrame, RawDepthFrame, TofResolution,
};
use andon_controller::clock::ManualClock;
use andon_controller::config::{LoadedConfig, load_config_from_str};
use andon_controller::cycle::{CycleRunner, Links};
use andon_controller::state::CycleOutcome;

pub const MINIMAL: &str = "[shared]\nservice_name = \"it\"\n";

pub fn config() -> LoadedConfig {
    load_config_from_str(MINIMAL).unwrap()
}

/// Runner, its channels and the clock it reads.
pub struct Rig {
    pub links: Links,
    pub clock: ManualClock,
    pub runner: CycleRunner<ManualClock>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(&config())
    }

    pub fn with_config(config: &LoadedConfig) -> Self {
        let links = Links::from_config(config);
        let clock = ManualClock::new(0);
        let runner = CycleRunner::new(config, links.clone(), clock.clone());
        Self {
            links,
            clock,
            runner,
        }
    }

    /// Run one cycle at `now_ms`.
    pub fn cycle_at(&mut self, now_ms: u64) -> CycleOutcome {
        self.clock.set(now_ms);
        self.runner.run_cycle()
    }

    pub fn heartbeat(&self) {
        self.links.host_events.try_send(HostEvent::Heartbeat).unwrap();
    }

    pub fn host_state(&self, state: HostMachineState) {
        self.links
            .host_events
            .try_send(HostEvent::HostState(state))
            .unwrap();
    }

    /// Publish one person covering the top-left quarter of the frame.
    pub fn person(&self, score: f32) {
        self.links.detections.publish(person_frame(score));
    }

    pub fn nobody(&self) {
        self.links
            .detections
            .publish(DetectionFrame::empty(CameraMeta::default()));
    }

    /// Publish a 4x4 depth frame with every cell at `mm`.
    pub fn depth(&self, mm: f32, now_ms: u64) {
        self.links
            .depth
            .publish(RawDepthFrame::uniform(TofResolution::Grid4x4, mm, now_ms));
    }

    /// Publish a 4x4 depth frame with no valid target.
    pub fn depth_invalid(&self, now_ms: u64) {
        self.links
            .depth
            .publish(RawDepthFrame::new(TofResolution::Grid4x4, now_ms));
    }
}

pub fn person_frame(score: f32) -> DetectionFrame {
    let mut frame = DetectionFrame::empty(CameraMeta {
        width: 324,
        height: 324,
        capture_timestamp_ms: 0,
    });
    frame
        .push(Detection {
            class_id: 0,
            score,
            bbox: BBox::new(0.0, 0.0, 0.5, 0.5),
            track_id: Some(1),
        })
        .unwrap();
    frame
}
