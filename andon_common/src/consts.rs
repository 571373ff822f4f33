//! System-wide constants for the Andon workspace.
//!
//! Single source of truth for capacities, timing defaults and parameter
//! bounds. Imported by all crates.

use static_assertions::const_assert;

// ─── Capacities ─────────────────────────────────────────────────────

/// Maximum detections carried by one `DetectionFrame`.
pub const MAX_DETECTIONS: usize = 3;

/// Maximum ToF grid cells (8×8 resolution).
pub const MAX_TOF_CELLS: usize = 64;

/// Capacity of the host event queue (heartbeats + host-state updates).
pub const HOST_EVENT_QUEUE_CAPACITY: usize = 3;

const_assert!(MAX_DETECTIONS > 0);
const_assert!(MAX_TOF_CELLS == 8 * 8);
const_assert!(MAX_TOF_CELLS <= u8::MAX as usize);

// ─── Controller Timing ──────────────────────────────────────────────

/// Default control cycle period [ms].
pub const CYCLE_PERIOD_MS_DEFAULT: u32 = 10;
pub const CYCLE_PERIOD_MS_MIN: u32 = 1;
pub const CYCLE_PERIOD_MS_MAX: u32 = 100;

/// Host connection timeout [ms]: no heartbeat for longer → disconnected.
pub const CONNECTION_TIMEOUT_MS_DEFAULT: u64 = 3000;
pub const CONNECTION_TIMEOUT_MS_MIN: u64 = 100;
pub const CONNECTION_TIMEOUT_MS_MAX: u64 = 60_000;

/// Maximum age of a cached detection frame [ms].
pub const DETECTION_STALE_MS_DEFAULT: u64 = 1000;
/// Maximum age of a cached depth frame [ms].
pub const TOF_STALE_MS_DEFAULT: u64 = 1000;
pub const STALE_MS_MIN: u64 = 10;
pub const STALE_MS_MAX: u64 = 10_000;

/// Consecutive cycle overruns before `SystemFault::ProgramError` latches.
pub const OVERRUN_FAULT_CYCLES_DEFAULT: u32 = 50;
pub const OVERRUN_FAULT_CYCLES_MIN: u32 = 1;
pub const OVERRUN_FAULT_CYCLES_MAX: u32 = 10_000;

// ─── Sensor Geometry ────────────────────────────────────────────────

/// Default camera frame width/height [px] (detector input size).
pub const FRAME_SIZE_DEFAULT: u32 = 324;
pub const FRAME_SIZE_MIN: u32 = 1;
pub const FRAME_SIZE_MAX: u32 = 4096;

/// Usable ToF range ceiling [mm]; readings must satisfy `0 < d < ceiling`.
pub const MAX_RANGE_MM_DEFAULT: f32 = 4000.0;
pub const MAX_RANGE_MM_MIN: f32 = 1.0;
pub const MAX_RANGE_MM_MAX: f32 = 10_000.0;

/// Allowed deviation from the median, as a fraction of the median.
pub const OUTLIER_FRACTION_DEFAULT: f32 = 0.25;

/// Minimum readings before median outlier rejection is applied.
pub const OUTLIER_MIN_READINGS: usize = 3;

/// Distance reported for an estimate without valid readings.
pub const INVALID_DISTANCE_MM: f32 = -1.0;

// ─── Runtime Defaults ───────────────────────────────────────────────

/// Distance at or below which a person triggers an E-stop [mm].
pub const DANGER_THRESHOLD_MM_DEFAULT: f32 = 500.0;
pub const DANGER_THRESHOLD_MM_MIN: f32 = 1.0;
pub const DANGER_THRESHOLD_MM_MAX: f32 = 4000.0;

/// Minimum detector score for a detection to count as a person.
pub const DETECTION_CONFIDENCE_MIN_DEFAULT: f32 = 0.5;

/// Default Andon colors (0xRRGGBB).
pub const STOPPED_COLOR_DEFAULT: u32 = 0xFF_00_00;
pub const WARNING_COLOR_DEFAULT: u32 = 0xFF_FF_00;
pub const ACTIVE_COLOR_DEFAULT: u32 = 0x00_FF_00;
pub const IDLE_COLOR_DEFAULT: u32 = 0x00_00_FF;
/// Color shown before the first decision (not configurable).
pub const UNINITIALIZED_COLOR: u32 = 0xFF_FF_FF;
/// Largest valid 24-bit color value.
pub const COLOR_MAX: u32 = 0xFF_FF_FF;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_defaults_within_bounds() {
        assert!((CYCLE_PERIOD_MS_MIN..=CYCLE_PERIOD_MS_MAX).contains(&CYCLE_PERIOD_MS_DEFAULT));
        assert!(
            (CONNECTION_TIMEOUT_MS_MIN..=CONNECTION_TIMEOUT_MS_MAX)
                .contains(&CONNECTION_TIMEOUT_MS_DEFAULT)
        );
        assert!((STALE_MS_MIN..=STALE_MS_MAX).contains(&DETECTION_STALE_MS_DEFAULT));
        assert!((STALE_MS_MIN..=STALE_MS_MAX).contains(&TOF_STALE_MS_DEFAULT));
    }

    #[test]
    fn danger_threshold_below_range_ceiling() {
        assert!(DANGER_THRESHOLD_MM_DEFAULT < MAX_RANGE_MM_DEFAULT);
        assert!(DANGER_THRESHOLD_MM_MAX <= MAX_RANGE_MM_DEFAULT);
    }

    #[test]
    fn colors_fit_24_bits() {
        for c in [
            STOPPED_COLOR_DEFAULT,
            WARNING_COLOR_DEFAULT,
            ACTIVE_COLOR_DEFAULT,
            IDLE_COLOR_DEFAULT,
            UNINITIALIZED_COLOR,
        ] {
            assert!(c <= COLOR_MAX);
        }
    }
}
