//! Per-cycle telemetry record published by the controller.
//!
//! One [`TelemetrySnapshot`] is written to the telemetry slot every cycle.
//! Host links and loggers sample it; nothing feeds back into the controller.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::state::{ConnectionStatus, HostMachineState, StateBucket, SystemFault, SystemState};
use crate::types::{CameraMeta, DepthEstimates};

bitflags! {
    /// Input freshness and link status of one cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CycleFlags: u8 {
        /// Heartbeat received within the connection timeout.
        const HOST_CONNECTED   = 0x01;
        /// A new detection frame arrived this cycle.
        const DETECTION_FRESH  = 0x02;
        /// A previous detection frame was reused (within its staleness window).
        const DETECTION_CACHED = 0x04;
        /// A new depth frame arrived this cycle.
        const DEPTH_FRESH      = 0x08;
        /// A previous depth frame was reused.
        const DEPTH_CACHED     = 0x10;
        /// A fault is latched.
        const FAULT_LATCHED    = 0x20;
        /// The cycle exceeded its period.
        const OVERRUN          = 0x40;
    }
}

/// Snapshot of one control cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TelemetrySnapshot {
    /// Controller clock at cycle start [ms].
    pub timestamp_ms: u64,
    /// Cycle counter since start.
    pub cycle: u64,
    pub system_state: SystemState,
    pub fault: SystemFault,
    pub connection: ConnectionStatus,
    /// Last host machine state seen (regardless of connection).
    pub host_state: HostMachineState,
    pub host_bucket: Option<StateBucket>,
    /// Detections that passed the confidence filter.
    pub detection_count: u8,
    /// Inference time of the detection frame in use [ms].
    pub inference_time_ms: u32,
    pub estimates: DepthEstimates,
    /// Time spent in depth estimation this cycle [µs].
    pub depth_estimation_time_us: u32,
    pub camera: CameraMeta,
    pub flags: CycleFlags,
}

impl TelemetrySnapshot {
    /// Nearest valid person distance [mm], if any.
    pub fn nearest_mm(&self) -> Option<f32> {
        self.estimates
            .iter()
            .filter(|e| e.valid)
            .map(|e| e.distance_mm)
            .reduce(f32::min)
    }
}
