//! Runtime-tunable parameters.
//!
//! One record behind one lock. The controller copies it once per cycle;
//! the host link may replace it at any time through [`SharedRuntimeConfig::apply`],
//! which validates the candidate before swapping it in.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::consts::{
    ACTIVE_COLOR_DEFAULT, COLOR_MAX, DANGER_THRESHOLD_MM_DEFAULT, DANGER_THRESHOLD_MM_MAX,
    DANGER_THRESHOLD_MM_MIN, DETECTION_CONFIDENCE_MIN_DEFAULT, IDLE_COLOR_DEFAULT,
    STOPPED_COLOR_DEFAULT, WARNING_COLOR_DEFAULT,
};
use crate::state::Rgb;

/// Parameters the host may change while the controller runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Person at or inside this distance latches an E-stop [mm].
    #[serde(default = "default_danger_threshold")]
    pub danger_threshold_mm: f32,

    /// Minimum detector score for a detection to be considered.
    #[serde(default = "default_confidence_min")]
    pub detection_confidence_min: f32,

    #[serde(default = "default_stopped_color")]
    pub stopped_color: Rgb,
    #[serde(default = "default_warning_color")]
    pub warning_color: Rgb,
    /// Host connected and active, nobody in view.
    #[serde(default = "default_active_color")]
    pub active_color: Rgb,
    /// Host-independent scanning, nobody in view.
    #[serde(default = "default_idle_color")]
    pub idle_color: Rgb,
}

fn default_danger_threshold() -> f32 {
    DANGER_THRESHOLD_MM_DEFAULT
}
fn default_confidence_min() -> f32 {
    DETECTION_CONFIDENCE_MIN_DEFAULT
}
fn default_stopped_color() -> Rgb {
    Rgb(STOPPED_COLOR_DEFAULT)
}
fn default_warning_color() -> Rgb {
    Rgb(WARNING_COLOR_DEFAULT)
}
fn default_active_color() -> Rgb {
    Rgb(ACTIVE_COLOR_DEFAULT)
}
fn default_idle_color() -> Rgb {
    Rgb(IDLE_COLOR_DEFAULT)
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            danger_threshold_mm: DANGER_THRESHOLD_MM_DEFAULT,
            detection_confidence_min: DETECTION_CONFIDENCE_MIN_DEFAULT,
            stopped_color: default_stopped_color(),
            warning_color: default_warning_color(),
            active_color: default_active_color(),
            idle_color: default_idle_color(),
        }
    }
}

impl RuntimeConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = self.danger_threshold_mm;
        if !d.is_finite() || !(DANGER_THRESHOLD_MM_MIN..=DANGER_THRESHOLD_MM_MAX).contains(&d) {
            return Err(ConfigError::ValidationError(format!(
                "danger_threshold_mm {d} out of range [{DANGER_THRESHOLD_MM_MIN}, {DANGER_THRESHOLD_MM_MAX}]"
            )));
        }
        let c = self.detection_confidence_min;
        if !c.is_finite() || !(0.0..=1.0).contains(&c) {
            return Err(ConfigError::ValidationError(format!(
                "detection_confidence_min {c} out of range [0, 1]"
            )));
        }
        for (name, color) in [
            ("stopped_color", self.stopped_color),
            ("warning_color", self.warning_color),
            ("active_color", self.active_color),
            ("idle_color", self.idle_color),
        ] {
            if color.0 > COLOR_MAX {
                return Err(ConfigError::ValidationError(format!(
                    "{name} {:#X} exceeds 24 bits",
                    color.0
                )));
            }
        }
        Ok(())
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfigPatch {
    pub danger_threshold_mm: Option<f32>,
    pub detection_confidence_min: Option<f32>,
    pub stopped_color: Option<Rgb>,
    pub warning_color: Option<Rgb>,
    pub active_color: Option<Rgb>,
    pub idle_color: Option<Rgb>,
}

impl RuntimeConfigPatch {
    /// Apply onto a copy of `base`.
    pub fn applied_to(&self, base: &RuntimeConfig) -> RuntimeConfig {
        RuntimeConfig {
            danger_threshold_mm: self.danger_threshold_mm.unwrap_or(base.danger_threshold_mm),
            detection_confidence_min: self
                .detection_confidence_min
                .unwrap_or(base.detection_confidence_min),
            stopped_color: self.stopped_color.unwrap_or(base.stopped_color),
            warning_color: self.warning_color.unwrap_or(base.warning_color),
            active_color: self.active_color.unwrap_or(base.active_color),
            idle_color: self.idle_color.unwrap_or(base.idle_color),
        }
    }
}

/// Lock-protected runtime configuration shared by the controller and the host link.
#[derive(Debug, Clone)]
pub struct SharedRuntimeConfig {
    inner: Arc<Mutex<RuntimeConfig>>,
}

impl SharedRuntimeConfig {
    pub fn new(initial: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    /// Copy of the current record (one scoped lock).
    pub fn snapshot(&self) -> RuntimeConfig {
        *self.inner.lock()
    }

    /// Validate `patch` applied to the current record, then swap it in.
    ///
    /// The lock is held across read-modify-write so concurrent patches
    /// do not lose each other's fields. On error the record is unchanged.
    pub fn apply(&self, patch: &RuntimeConfigPatch) -> Result<RuntimeConfig, ConfigError> {
        let mut current = self.inner.lock();
        let candidate = patch.applied_to(&current);
        candidate.validate()?;
        *current = candidate;
        tracing::debug!(?candidate, "runtime config updated");
        Ok(candidate)
    }

    /// Replace the whole record after validation.
    pub fn replace(&self, candidate: RuntimeConfig) -> Result<(), ConfigError> {
        candidate.validate()?;
        *self.inner.lock() = candidate;
        Ok(())
    }
}

impl Default for SharedRuntimeConfig {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
