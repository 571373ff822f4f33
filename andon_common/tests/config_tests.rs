//! Config file loading tests.
//!
//! Load complete and partial `andon.toml` files from disk, numeric bounds
//! validation, unknown field rejection.

use andon_common::config::{AndonConfig, ConfigError, ConfigLoader, LogLevel};
use andon_common::state::Rgb;
use andon_common::types::TofResolution;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("andon.toml");
    fs::write(&path, body).unwrap();
    path
}

const FULL: &str = r#"
[shared]
log_level = "debug"
service_name = "andon-cell-07"

[controller]
cycle_period_ms = 20
connection_timeout_ms = 2000
detection_stale_ms = 500
tof_stale_ms = 250
overrun_fault_cycles = 10

[sensor]
tof_resolution = "8x8"
frame_width = 640
frame_height = 480
max_range_mm = 3500.0
outlier_fraction = 0.2

[runtime]
danger_threshold_mm = 650.0
detection_confidence_min = 0.6
stopped_color = 0xAA0000
warning_color = 0xFFA500
active_color = 0x00AA00
idle_color = 0x0000AA
"#;

#[test]
fn load_full_file() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), FULL);
    let cfg = AndonConfig::load(&path).unwrap();
    cfg.validate().unwrap();

    assert_eq!(cfg.shared.log_level, LogLevel::Debug);
    assert_eq!(cfg.shared.service_name, "andon-cell-07");
    assert_eq!(cfg.controller.cycle_period_ms, 20);
    assert_eq!(cfg.controller.connection_timeout_ms, 2000);
    assert_eq!(cfg.controller.detection_stale_ms, 500);
    assert_eq!(cfg.controller.tof_stale_ms, 250);
    assert_eq!(cfg.controller.overrun_fault_cycles, 10);
    assert_eq!(cfg.sensor.tof_resolution, TofResolution::Grid8x8);
    assert_eq!(cfg.sensor.frame_width, 640);
    assert_eq!(cfg.sensor.frame_height, 480);
    assert_eq!(cfg.runtime.danger_threshold_mm, 650.0);
    assert_eq!(cfg.runtime.warning_color, Rgb(0xFFA500));
}

#[test]
fn missing_shared_section_is_parse_error() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), "[controller]\ncycle_period_ms = 10\n");
    assert!(matches!(AndonConfig::load(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn missing_file() {
    let tmp = TempDir::new().unwrap();
    let result = AndonConfig::load(&tmp.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}

#[test]
fn unknown_runtime_field_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(
        tmp.path(),
        "[shared]\nservice_name = \"x\"\n[runtime]\ndanger_distance = 400.0\n",
    );
    assert!(matches!(AndonConfig::load(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn unknown_resolution_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(
        tmp.path(),
        "[shared]\nservice_name = \"x\"\n[sensor]\ntof_resolution = \"16x16\"\n",
    );
    assert!(matches!(AndonConfig::load(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn bounds_violations() {
    let cases = [
        ("[controller]\ncycle_period_ms = 0\n", "cycle_period_ms"),
        ("[controller]\nconnection_timeout_ms = 50\n", "connection_timeout_ms"),
        ("[controller]\ndetection_stale_ms = 20000\n", "detection_stale_ms"),
        ("[controller]\ntof_stale_ms = 1\n", "tof_stale_ms"),
        ("[controller]\noverrun_fault_cycles = 0\n", "overrun_fault_cycles"),
        ("[sensor]\nframe_width = 0\n", "frame_width"),
        ("[sensor]\nframe_height = 5000\n", "frame_height"),
        ("[sensor]\noutlier_fraction = 1.5\n", "outlier_fraction"),
        ("[runtime]\ndanger_threshold_mm = -5.0\n", "danger_threshold_mm"),
        ("[runtime]\ndetection_confidence_min = 2.0\n", "detection_confidence_min"),
    ];
    for (section, field) in cases {
        let body = format!("[shared]\nservice_name = \"x\"\n{section}");
        let cfg = AndonConfig::from_toml(&body).unwrap();
        match cfg.validate() {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains(field), "{field}: unexpected message {msg}")
            }
            other => panic!("{field}: expected validation error, got {other:?}"),
        }
    }
}

#[test]
fn empty_service_name_rejected() {
    let cfg = AndonConfig::from_toml("[shared]\nservice_name = \"\"\n").unwrap();
    assert!(matches!(cfg.validate(), Err(ConfigError::ValidationError(_))));
}
