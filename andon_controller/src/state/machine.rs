//! Safety state machine.
//!
//! One [`SafetyController::step`] per control tick. Each step:
//!
//! 1. Marks the cycle `HostReading`.
//! 2. Applies queued host events (heartbeats and host-state updates) in
//!    FIFO order. A non-stop host state clears a latched `EStopped`.
//! 3. Refreshes the detection and depth caches, ages out stale frames.
//! 4. Estimates a distance per confident detection.
//! 5. Decides, highest priority first: latched fault, host stop bucket,
//!    danger distance, person in view, nobody in view.
//!
//! The controller owns the fault latch, the host-state tracker and the
//! caches. The connection tracker is shared so the host link can record
//! heartbeats and query liveness from its own context.

use std::sync::Arc;
use std::time::{Duration, Instant};

use andon_common::channel::{HostEvent, HostEventBatch};
use andon_common::config::AndonConfig;
use andon_common::consts::{DETECTION_STALE_MS_DEFAULT, FRAME_SIZE_DEFAULT, TOF_STALE_MS_DEFAULT};
use andon_common::runtime::RuntimeConfig;
use andon_common::state::{
    ConnectionStatus, HostMachineState, SystemFault, SystemState,
};
use andon_common::telemetry::{CycleFlags, TelemetrySnapshot};
use andon_common::types::{
    DepthEstimates, DetectionFrame, RawDepthFrame, TofResolution,
};
use tracing::{debug, info, warn};

use super::cache::{Freshness, StaleCache};
use super::fault::FaultLatch;
use crate::depth::{EstimatorParams, GridGeometry, estimate};
use crate::tracker::{ConnectionTracker, HostStateTracker};

// ─── Parameters ─────────────────────────────────────────────────────

/// Fixed-for-session controller parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerParams {
    pub detection_stale_ms: u64,
    pub tof_stale_ms: u64,
    pub geometry: GridGeometry,
    pub estimator: EstimatorParams,
}

impl ControllerParams {
    pub fn from_config(cfg: &AndonConfig) -> Self {
        Self {
            detection_stale_ms: cfg.controller.detection_stale_ms,
            tof_stale_ms: cfg.controller.tof_stale_ms,
            geometry: GridGeometry::new(
                cfg.sensor.tof_resolution,
                cfg.sensor.frame_width,
                cfg.sensor.frame_height,
            ),
            estimator: EstimatorParams::from(&cfg.sensor),
        }
    }
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            detection_stale_ms: DETECTION_STALE_MS_DEFAULT,
            tof_stale_ms: TOF_STALE_MS_DEFAULT,
            geometry: GridGeometry::new(
                TofResolution::default(),
                FRAME_SIZE_DEFAULT,
                FRAME_SIZE_DEFAULT,
            ),
            estimator: EstimatorParams::default(),
        }
    }
}

// ─── Cycle I/O ──────────────────────────────────────────────────────

/// Everything the controller consumes in one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleInputs {
    /// Host events drained this cycle, FIFO.
    pub host_events: HostEventBatch,
    /// New detection frame, if one was published since the last cycle.
    pub detection: Option<DetectionFrame>,
    /// New depth frame, if one was published since the last cycle.
    pub depth: Option<RawDepthFrame>,
    /// The previous cycle exceeded its period.
    pub overrun: bool,
}

/// Which rule produced the cycle's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A fault was already latched.
    FaultActive,
    /// Host connected and in its stop bucket (`HostStoppedState`, latched).
    HostStop,
    /// A valid estimate at or inside the danger distance.
    Danger,
    /// Person in view, no confirmed danger.
    PersonInView,
    /// Nobody in view.
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub state: SystemState,
    pub decision: Decision,
    pub telemetry: TelemetrySnapshot,
}

// ─── Controller ─────────────────────────────────────────────────────

pub struct SafetyController {
    params: ControllerParams,
    connection: Arc<ConnectionTracker>,
    host: HostStateTracker,
    fault: FaultLatch,
    detections: StaleCache<DetectionFrame>,
    depth: StaleCache<RawDepthFrame>,
    state: SystemState,
    was_connected: bool,
    depth_mismatch: bool,
    cycle: u64,
}

impl SafetyController {
    pub fn new(params: ControllerParams, connection: Arc<ConnectionTracker>) -> Self {
        Self {
            detections: StaleCache::new(params.detection_stale_ms),
            depth: StaleCache::new(params.tof_stale_ms),
            params,
            connection,
            host: HostStateTracker::new(),
            fault: FaultLatch::new(),
            state: SystemState::Uninitialized,
            was_connected: false,
            depth_mismatch: false,
            cycle: 0,
        }
    }

    /// Last decided state (`Uninitialized` before the first step).
    #[inline]
    pub fn state(&self) -> SystemState {
        self.state
    }

    #[inline]
    pub fn fault(&self) -> SystemFault {
        self.fault.current()
    }

    #[inline]
    pub fn host_state(&self) -> HostMachineState {
        self.host.current()
    }

    #[inline]
    pub fn connection(&self) -> &Arc<ConnectionTracker> {
        &self.connection
    }

    #[inline]
    pub fn params(&self) -> &ControllerParams {
        &self.params
    }

    /// Completed steps.
    #[inline]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Latch `ProgramError`. Output is `Stopped` from the next step on, until restart.
    pub fn latch_program_error(&mut self, now_ms: u64) -> bool {
        self.fault.latch(SystemFault::ProgramError, now_ms)
    }

    /// Run one control cycle.
    pub fn step(&mut self, now_ms: u64, inputs: CycleInputs, cfg: &RuntimeConfig) -> CycleOutcome {
        let CycleInputs {
            host_events,
            detection,
            depth,
            overrun,
        } = inputs;

        if self.state == SystemState::Uninitialized {
            debug!("first cycle: Uninitialized → HostReading");
        }
        self.state = SystemState::HostReading;

        for event in host_events {
            self.apply_host_event(event, now_ms);
        }

        let connected = self.connection.is_connected(now_ms);
        self.note_connection(connected, now_ms);

        if let Some(frame) = depth.as_ref() {
            self.check_depth_frame(frame);
        }
        let had_detection = self.detections.age_ms(now_ms).is_some();
        let had_depth = self.depth.age_ms(now_ms).is_some();
        let detection_freshness = self.detections.refresh(detection, now_ms);
        let depth_freshness = self.depth.refresh(depth, now_ms);
        if had_detection && detection_freshness == Freshness::Absent {
            debug!(window_ms = self.detections.window_ms(), "detection frame aged out");
        }
        if had_depth && depth_freshness == Freshness::Absent {
            debug!(window_ms = self.depth.window_ms(), "depth frame aged out");
        }

        let people = self
            .detections
            .current(now_ms)
            .map(|f| f.confident(cfg.detection_confidence_min))
            .unwrap_or_default();

        let started = Instant::now();
        let estimates = if people.is_empty() {
            DepthEstimates::new()
        } else {
            if depth_freshness == Freshness::Absent {
                debug!(detections = people.len(), "no usable depth frame, distances unknown");
            }
            estimate(
                &people,
                self.depth.current(now_ms),
                &self.params.geometry,
                &self.params.estimator,
            )
        };
        let depth_estimation_time_us = micros_u32(started.elapsed());

        let (state, decision) = self.decide(connected, &people, &estimates, cfg, now_ms);
        self.state = state;
        self.cycle += 1;

        let mut flags = CycleFlags::empty();
        flags.set(CycleFlags::HOST_CONNECTED, connected);
        flags.set(CycleFlags::DETECTION_FRESH, detection_freshness == Freshness::Fresh);
        flags.set(CycleFlags::DETECTION_CACHED, detection_freshness == Freshness::Cached);
        flags.set(CycleFlags::DEPTH_FRESH, depth_freshness == Freshness::Fresh);
        flags.set(CycleFlags::DEPTH_CACHED, depth_freshness == Freshness::Cached);
        flags.set(CycleFlags::FAULT_LATCHED, self.fault.is_active());
        flags.set(CycleFlags::OVERRUN, overrun);

        let host_state = self.host.current();
        let telemetry = TelemetrySnapshot {
            timestamp_ms: now_ms,
            cycle: self.cycle,
            system_state: state,
            fault: self.fault.current(),
            connection: ConnectionStatus::from(connected),
            host_state,
            host_bucket: connected.then(|| host_state.bucket()),
            detection_count: people.len() as u8,
            inference_time_ms: people.inference_duration_ms,
            estimates,
            depth_estimation_time_us,
            camera: people.camera,
            flags,
        };

        CycleOutcome {
            state,
            decision,
            telemetry,
        }
    }

    fn apply_host_event(&mut self, event: HostEvent, now_ms: u64) {
        match event {
            HostEvent::Heartbeat => self.connection.on_heartbeat(now_ms),
            HostEvent::HostState(s) => {
                self.host.on_host_state(s, &mut self.fault);
            }
        }
    }

    fn note_connection(&mut self, connected: bool, now_ms: u64) {
        if connected == self.was_connected {
            return;
        }
        if connected {
            info!(host_state = ?self.host.current(), "host connected");
        } else {
            warn!(
                last_heartbeat_ms = ?self.connection.last_heartbeat_ms(),
                now_ms,
                "host heartbeat timed out, switching to host-independent mode"
            );
        }
        self.was_connected = connected;
    }

    fn check_depth_frame(&mut self, frame: &RawDepthFrame) {
        let usable =
            frame.is_consistent() && frame.resolution == self.params.geometry.resolution();
        if !usable && !self.depth_mismatch {
            warn!(
                frame_resolution = ?frame.resolution,
                cells = frame.cells.len(),
                expected = ?self.params.geometry.resolution(),
                "depth frame does not match grid geometry, distances unknown"
            );
        }
        self.depth_mismatch = !usable;
    }

    fn decide(
        &mut self,
        connected: bool,
        people: &DetectionFrame,
        estimates: &DepthEstimates,
        cfg: &RuntimeConfig,
        now_ms: u64,
    ) -> (SystemState, Decision) {
        if self.fault.is_active() {
            return (SystemState::Stopped, Decision::FaultActive);
        }

        if connected && self.host.demands_stop() {
            debug!(host_state = ?self.host.current(), "HostStoppedState → Stopped");
            self.fault.latch(SystemFault::EStopped, now_ms);
            return (SystemState::Stopped, Decision::HostStop);
        }

        if people.is_empty() {
            let state = if connected {
                SystemState::HostActiveState
            } else {
                SystemState::Scanning
            };
            return (state, Decision::Clear);
        }

        if let Some(e) = estimates
            .iter()
            .find(|e| e.within(cfg.danger_threshold_mm))
        {
            warn!(
                distance_mm = e.distance_mm,
                threshold_mm = cfg.danger_threshold_mm,
                track_id = ?e.track_id,
                "person inside danger distance"
            );
            self.fault.latch(SystemFault::EStopped, now_ms);
            return (SystemState::Stopped, Decision::Danger);
        }

        (SystemState::Warning, Decision::PersonInView)
    }
}

/// Whole microseconds in `d`, saturating at `u32::MAX`.
#[inline]
fn micros_u32(d: Duration) -> u32 {
    u32::try_from(d.as_micros()).unwrap_or(u32::MAX)
}
