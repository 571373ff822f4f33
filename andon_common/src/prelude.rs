//! Prelude module for common re-exports.
//!
//! ```rust
//! use andon_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    AndonConfig, ConfigError, ConfigLoader, ControllerConfig, LogLevel, SensorConfig, SharedConfig,
};
pub use crate::runtime::{RuntimeConfig, RuntimeConfigPatch, SharedRuntimeConfig};

// ─── State ──────────────────────────────────────────────────────────
pub use crate::state::{
    ConnectionStatus, HostMachineState, Rgb, StateBucket, SystemFault, SystemState,
};

// ─── Data Model ─────────────────────────────────────────────────────
pub use crate::types::{
    BBox, BoxUnits, CameraMeta, CellStatus, DepthEstimate, DepthEstimates, Detection,
    DetectionFrame, RawDepthFrame, TofCell, TofResolution,
};

// ─── Channels ───────────────────────────────────────────────────────
pub use crate::channel::{
    ChannelError, EventQueue, HostEvent, HostEventBatch, HostEventQueue, LatestSlot, SlotReader,
};

// ─── Telemetry ──────────────────────────────────────────────────────
pub use crate::telemetry::{CycleFlags, TelemetrySnapshot};
