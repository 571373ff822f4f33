//! Configuration loading traits and types.
//!
//! Every Andon binary reads one TOML file. [`ConfigLoader`] is implemented
//! for any deserializable type; [`AndonConfig`] is the controller's file
//! layout with per-section bounds validation.
//!
//! # Usage
//!
//! ```rust,no_run
//! use andon_common::config::{AndonConfig, ConfigError, ConfigLoader};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = AndonConfig::load(Path::new("andon.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::consts::{
    CONNECTION_TIMEOUT_MS_DEFAULT, CONNECTION_TIMEOUT_MS_MAX, CONNECTION_TIMEOUT_MS_MIN,
    CYCLE_PERIOD_MS_DEFAULT, CYCLE_PERIOD_MS_MAX, CYCLE_PERIOD_MS_MIN, DETECTION_STALE_MS_DEFAULT,
    FRAME_SIZE_DEFAULT, FRAME_SIZE_MAX, FRAME_SIZE_MIN, MAX_RANGE_MM_DEFAULT, MAX_RANGE_MM_MAX,
    MAX_RANGE_MM_MIN, OUTLIER_FRACTION_DEFAULT, OVERRUN_FAULT_CYCLES_DEFAULT,
    OVERRUN_FAULT_CYCLES_MAX, OVERRUN_FAULT_CYCLES_MIN, STALE_MS_MAX, STALE_MS_MIN,
    TOF_STALE_MS_DEFAULT,
};
use crate::runtime::RuntimeConfig;
use crate::types::TofResolution;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across Andon applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "andon-cell-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Controller Section ─────────────────────────────────────────────

/// `[controller]`: cycle timing and staleness windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Fixed control cycle period [ms] (default: 10).
    #[serde(default = "default_cycle_period")]
    pub cycle_period_ms: u32,

    /// Heartbeat silence before the host counts as disconnected [ms] (default: 3000).
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_ms: u64,

    /// Maximum age of a reused detection frame [ms] (default: 1000).
    #[serde(default = "default_detection_stale")]
    pub detection_stale_ms: u64,

    /// Maximum age of a reused depth frame [ms] (default: 1000).
    #[serde(default = "default_tof_stale")]
    pub tof_stale_ms: u64,

    /// Consecutive overruns before `ProgramError` latches (default: 50).
    #[serde(default = "default_overrun_fault_cycles")]
    pub overrun_fault_cycles: u32,
}

fn default_cycle_period() -> u32 {
    CYCLE_PERIOD_MS_DEFAULT
}
fn default_connection_timeout() -> u64 {
    CONNECTION_TIMEOUT_MS_DEFAULT
}
fn default_detection_stale() -> u64 {
    DETECTION_STALE_MS_DEFAULT
}
fn default_tof_stale() -> u64 {
    TOF_STALE_MS_DEFAULT
}
fn default_overrun_fault_cycles() -> u32 {
    OVERRUN_FAULT_CYCLES_DEFAULT
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: CYCLE_PERIOD_MS_DEFAULT,
            connection_timeout_ms: CONNECTION_TIMEOUT_MS_DEFAULT,
            detection_stale_ms: DETECTION_STALE_MS_DEFAULT,
            tof_stale_ms: TOF_STALE_MS_DEFAULT,
            overrun_fault_cycles: OVERRUN_FAULT_CYCLES_DEFAULT,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "cycle_period_ms",
            self.cycle_period_ms,
            CYCLE_PERIOD_MS_MIN,
            CYCLE_PERIOD_MS_MAX,
        )?;
        check_range(
            "connection_timeout_ms",
            self.connection_timeout_ms,
            CONNECTION_TIMEOUT_MS_MIN,
            CONNECTION_TIMEOUT_MS_MAX,
        )?;
        check_range("detection_stale_ms", self.detection_stale_ms, STALE_MS_MIN, STALE_MS_MAX)?;
        check_range("tof_stale_ms", self.tof_stale_ms, STALE_MS_MIN, STALE_MS_MAX)?;
        check_range(
            "overrun_fault_cycles",
            self.overrun_fault_cycles,
            OVERRUN_FAULT_CYCLES_MIN,
            OVERRUN_FAULT_CYCLES_MAX,
        )?;
        Ok(())
    }
}

// ─── Sensor Section ─────────────────────────────────────────────────

/// `[sensor]`: camera/ToF geometry and depth filter parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    #[serde(default)]
    pub tof_resolution: TofResolution,

    /// Camera frame width [px] (default: 324).
    #[serde(default = "default_frame_size")]
    pub frame_width: u32,

    /// Camera frame height [px] (default: 324).
    #[serde(default = "default_frame_size")]
    pub frame_height: u32,

    /// Usable ToF range ceiling [mm] (default: 4000).
    #[serde(default = "default_max_range")]
    pub max_range_mm: f32,

    /// Median outlier rejection fraction (default: 0.25).
    #[serde(default = "default_outlier_fraction")]
    pub outlier_fraction: f32,
}

fn default_frame_size() -> u32 {
    FRAME_SIZE_DEFAULT
}
fn default_max_range() -> f32 {
    MAX_RANGE_MM_DEFAULT
}
fn default_outlier_fraction() -> f32 {
    OUTLIER_FRACTION_DEFAULT
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            tof_resolution: TofResolution::default(),
            frame_width: FRAME_SIZE_DEFAULT,
            frame_height: FRAME_SIZE_DEFAULT,
            max_range_mm: MAX_RANGE_MM_DEFAULT,
            outlier_fraction: OUTLIER_FRACTION_DEFAULT,
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("frame_width", self.frame_width, FRAME_SIZE_MIN, FRAME_SIZE_MAX)?;
        check_range("frame_height", self.frame_height, FRAME_SIZE_MIN, FRAME_SIZE_MAX)?;
        let r = self.max_range_mm;
        if !r.is_finite() || !(MAX_RANGE_MM_MIN..=MAX_RANGE_MM_MAX).contains(&r) {
            return Err(ConfigError::ValidationError(format!(
                "max_range_mm {r} out of range [{MAX_RANGE_MM_MIN}, {MAX_RANGE_MM_MAX}]"
            )));
        }
        let f = self.outlier_fraction;
        if !f.is_finite() || !(0.0..=1.0).contains(&f) {
            return Err(ConfigError::ValidationError(format!(
                "outlier_fraction {f} out of range [0, 1]"
            )));
        }
        Ok(())
    }
}

// ─── Top-Level File ─────────────────────────────────────────────────

/// Complete controller configuration file.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "andon-cell-01"
///
/// [controller]
/// cycle_period_ms = 10
///
/// [sensor]
/// tof_resolution = "8x8"
///
/// [runtime]
/// danger_threshold_mm = 600.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AndonConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    /// Initial runtime parameters (host may change them later).
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl AndonConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.controller.validate()?;
        self.sensor.validate()?;
        self.runtime.validate()?;
        if self.runtime.danger_threshold_mm >= self.sensor.max_range_mm {
            return Err(ConfigError::ValidationError(format!(
                "danger_threshold_mm {} must be below max_range_mm {}",
                self.runtime.danger_threshold_mm, self.sensor.max_range_mm
            )));
        }
        Ok(())
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(
    name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::ValidationError(format!(
            "{name} {value} out of range [{min}, {max}]"
        )));
    }
    Ok(())
}
