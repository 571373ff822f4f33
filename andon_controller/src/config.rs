//! Controller configuration loading.
//!
//! Reads one `andon.toml`, validates every section and derives the
//! fixed-for-session controller parameters (grid geometry, estimator).

use std::path::Path;

use andon_common::config::{AndonConfig, ConfigError, ConfigLoader};
use tracing::debug;

use crate::state::ControllerParams;

/// Validated configuration bundle, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub andon: AndonConfig,
    pub params: ControllerParams,
}

impl LoadedConfig {
    /// Validate `andon` and derive the controller parameters.
    pub fn from_config(andon: AndonConfig) -> Result<Self, ConfigError> {
        andon.validate()?;
        let params = ControllerParams::from_config(&andon);
        debug!(
            resolution = ?params.geometry.resolution(),
            frame = ?params.geometry.frame_size(),
            "grid geometry ready"
        );
        Ok(Self { andon, params })
    }

    /// Control cycle period [ns].
    #[inline]
    pub fn cycle_time_ns(&self) -> i64 {
        self.andon.controller.cycle_period_ms as i64 * 1_000_000
    }
}

/// Load and validate the controller configuration file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let andon = AndonConfig::load(path)?;
    LoadedConfig::from_config(andon)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(content: &str) -> Result<LoadedConfig, ConfigError> {
    let andon = AndonConfig::from_toml(content)?;
    LoadedConfig::from_config(andon)
}
