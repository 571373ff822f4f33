//! Scenario simulator for workstation bring-up.
//!
//! Stands in for the camera, inference, ToF and host collaborators: a TOML
//! scenario lists timed steps that are fed into the same channels the real
//! producers use. Host steps go through [`HostInterface`], so they take the
//! same queue and validation path as real host requests.
//!
//! ```toml
//! duration_ms = 8000
//!
//! [heartbeat]
//! period_ms = 1000
//! until_ms = 4000
//!
//! [[steps]]
//! at_ms = 0
//! action = "host_state"
//! state = 5
//!
//! [[steps]]
//! at_ms = 1500
//! action = "person"
//! bbox = [0.0, 0.0, 0.2, 0.2]
//! distance_mm = 450.0
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use andon_common::state::{SystemFault, SystemState};
use andon_common::types::{
    BBox, BoxUnits, CameraMeta, Detection, DetectionFrame, RawDepthFrame, TofResolution,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::clock::{Clock, ManualClock};
use crate::config::LoadedConfig;
use crate::cycle::{CycleRunner, Links};
use crate::error::ControllerError;
use crate::rpc::HostInterface;

fn default_frame_period() -> u64 {
    100
}
fn default_score() -> f32 {
    0.9
}

// ─── Scenario File ──────────────────────────────────────────────────

/// Periodic host heartbeat.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatPlan {
    pub period_ms: u64,
    #[serde(default)]
    pub from_ms: u64,
    /// Last tick a heartbeat may be sent at (none = until the end).
    pub until_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Total scenario length [ms].
    pub duration_ms: u64,
    /// Sensor frame republish period [ms] while a scene is active.
    #[serde(default = "default_frame_period")]
    pub frame_period_ms: u64,
    pub heartbeat: Option<HeartbeatPlan>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// One host heartbeat.
    Heartbeat,
    /// Host machine state by PackML ordinal.
    HostState { state: u64 },
    /// One person in view. `distance_mm` is applied to every ToF cell;
    /// omitted means the ToF sees no valid target.
    Person {
        /// Normalized `[xmin, ymin, xmax, ymax]`.
        bbox: [f32; 4],
        #[serde(default = "default_score")]
        score: f32,
        distance_mm: Option<f32>,
        track_id: Option<u32>,
    },
    /// Nobody in view (fresh empty frames).
    Clear,
    /// Sensors stop producing; cached frames age out.
    Silence,
}

pub fn parse_scenario(content: &str) -> Result<Scenario, ControllerError> {
    let mut scenario: Scenario =
        toml::from_str(content).map_err(|e| ControllerError::Scenario(e.to_string()))?;
    if scenario.frame_period_ms == 0 {
        return Err(ControllerError::Scenario("frame_period_ms must be > 0".into()));
    }
    if scenario.heartbeat.as_ref().is_some_and(|h| h.period_ms == 0) {
        return Err(ControllerError::Scenario("heartbeat.period_ms must be > 0".into()));
    }
    scenario.steps.sort_by_key(|s| s.at_ms);
    Ok(scenario)
}

pub fn load_scenario(path: &Path) -> Result<Scenario, ControllerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ControllerError::Scenario(format!("{}: {e}", path.display())))?;
    parse_scenario(&content)
}

// ─── Player ─────────────────────────────────────────────────────────

struct Scene {
    detections: DetectionFrame,
    depth: RawDepthFrame,
}

/// Feeds a scenario into the controller's channels as time advances.
pub struct ScenarioPlayer {
    scenario: Scenario,
    next_step: usize,
    host: HostInterface,
    links: Links,
    resolution: TofResolution,
    camera: CameraMeta,
    scene: Option<Scene>,
    next_frame_ms: u64,
    next_heartbeat_ms: Option<u64>,
}

impl ScenarioPlayer {
    pub fn new(scenario: Scenario, config: &LoadedConfig, links: Links) -> Self {
        let (width, height) = config.params.geometry.frame_size();
        let next_heartbeat_ms = scenario.heartbeat.as_ref().map(|h| h.from_ms);
        Self {
            host: HostInterface::new(links.clone()),
            links,
            resolution: config.params.geometry.resolution(),
            camera: CameraMeta {
                width,
                height,
                capture_timestamp_ms: 0,
            },
            scenario,
            next_step: 0,
            scene: None,
            next_frame_ms: 0,
            next_heartbeat_ms,
        }
    }

    /// Apply every step due at `now_ms`, send due heartbeats, republish the scene.
    pub fn advance(&mut self, now_ms: u64) {
        self.send_heartbeats(now_ms);

        let mut scene_changed = false;
        while let Some(step) = self.scenario.steps.get(self.next_step) {
            if step.at_ms > now_ms {
                break;
            }
            let action = step.action.clone();
            self.next_step += 1;
            scene_changed |= self.apply(action, now_ms);
        }

        if self.scene.is_some() && (scene_changed || now_ms >= self.next_frame_ms) {
            self.publish_scene(now_ms);
            self.next_frame_ms = now_ms + self.scenario.frame_period_ms;
        }
    }

    /// True once `now_ms` is past the scenario's end.
    pub fn finished(&self, now_ms: u64) -> bool {
        now_ms >= self.scenario.duration_ms
    }

    fn send_heartbeats(&mut self, now_ms: u64) {
        let Some(plan) = self.scenario.heartbeat.as_ref() else {
            return;
        };
        let (period, until) = (plan.period_ms, plan.until_ms);
        while let Some(due) = self.next_heartbeat_ms {
            if due > now_ms {
                break;
            }
            if until.is_some_and(|u| due > u) {
                self.next_heartbeat_ms = None;
                break;
            }
            self.host_request("host_heartbeat", json!({ "connected": true }));
            self.next_heartbeat_ms = Some(due + period);
        }
    }

    /// Returns true if the scene changed.
    fn apply(&mut self, action: Action, now_ms: u64) -> bool {
        debug!(at_ms = now_ms, ?action, "scenario step");
        match action {
            Action::Heartbeat => {
                self.host_request("host_heartbeat", json!({ "connected": true }));
                false
            }
            Action::HostState { state } => {
                self.host_request("rx_host_state", json!({ "host_state": state }));
                false
            }
            Action::Person {
                bbox,
                score,
                distance_mm,
                track_id,
            } => {
                let mut detections = DetectionFrame::empty(self.camera);
                detections.units = BoxUnits::Normalized;
                let _ = detections.push(Detection {
                    class_id: 0,
                    score,
                    bbox: BBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
                    track_id,
                });
                let depth = match distance_mm {
                    Some(mm) => RawDepthFrame::uniform(self.resolution, mm, now_ms),
                    None => RawDepthFrame::new(self.resolution, now_ms),
                };
                self.scene = Some(Scene { detections, depth });
                true
            }
            Action::Clear => {
                self.scene = Some(Scene {
                    detections: DetectionFrame::empty(self.camera),
                    depth: RawDepthFrame::new(self.resolution, now_ms),
                });
                true
            }
            Action::Silence => {
                self.scene = None;
                false
            }
        }
    }

    fn publish_scene(&mut self, now_ms: u64) {
        if let Some(scene) = self.scene.as_mut() {
            scene.detections.camera.capture_timestamp_ms = now_ms;
            scene.depth.capture_timestamp_ms = now_ms;
            self.links.detections.publish(scene.detections.clone());
            self.links.depth.publish(scene.depth.clone());
        }
    }

    fn host_request(&self, method: &str, params: serde_json::Value) {
        if let Err(e) = self.host.handle(method, &params) {
            warn!(method, code = e.code(), "scenario host request failed: {e}");
        }
    }
}

/// Drive `player` from `clock` until the scenario ends or `running` drops.
/// Drops `running` at the end so the control loop stops too.
pub fn run_player<C: Clock>(
    mut player: ScenarioPlayer,
    clock: &C,
    running: &AtomicBool,
    poll: Duration,
) {
    while running.load(Ordering::Relaxed) {
        let now = clock.now_ms();
        if player.finished(now) {
            info!(at_ms = now, "scenario finished");
            running.store(false, Ordering::SeqCst);
            break;
        }
        player.advance(now);
        std::thread::sleep(poll);
    }
}

// ─── Offline Replay ─────────────────────────────────────────────────

/// A published state change during a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub at_ms: u64,
    pub state: SystemState,
    pub fault: SystemFault,
}

/// Replay `scenario` deterministically on a manual clock, one controller
/// cycle per configured period, and return every state change.
pub fn replay(scenario: &Scenario, config: &LoadedConfig) -> Vec<Transition> {
    let links = Links::from_config(config);
    let clock = ManualClock::new(0);
    let mut runner = CycleRunner::new(config, links.clone(), clock.clone());
    let mut player = ScenarioPlayer::new(scenario.clone(), config, links);
    let period = u64::from(config.andon.controller.cycle_period_ms);

    let mut transitions = Vec::new();
    let mut last = None;
    let mut now = 0;
    while now <= scenario.duration_ms {
        clock.set(now);
        player.advance(now);
        let out = runner.run_cycle();
        if last != Some(out.state) {
            transitions.push(Transition {
                at_ms: now,
                state: out.state,
                fault: out.telemetry.fault,
            });
            last = Some(out.state);
        }
        now += period;
    }
    transitions
}
