//! Sensor data model exchanged between the pipeline stages.
//!
//! Detection frames come from the inference stage, raw depth frames from the
//! ToF poller, depth estimates from the controller. All are plain values:
//! producers build a frame and publish a copy, consumers never mutate one.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::consts::{INVALID_DISTANCE_MM, MAX_DETECTIONS, MAX_TOF_CELLS};

// ─── Detections ─────────────────────────────────────────────────────

/// Axis-aligned bounding box. Units are given by the owning frame's [`BoxUnits`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BBox {
    pub const fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite() && self.ymin.is_finite() && self.xmax.is_finite() && self.ymax.is_finite()
    }
}

/// Coordinate units of every bbox in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoxUnits {
    /// `[0, 1]` relative to the frame size.
    #[default]
    Normalized,
    /// Pixel coordinates of the camera frame.
    Pixel,
}

/// One detector output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u16,
    /// Detector confidence in `[0, 1]`.
    pub score: f32,
    pub bbox: BBox,
    #[serde(default)]
    pub track_id: Option<u32>,
}

/// Camera frame metadata carried alongside the detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CameraMeta {
    pub width: u32,
    pub height: u32,
    /// Image capture time [ms, producer clock].
    pub capture_timestamp_ms: u64,
}

/// Bounded detection list produced by one inference cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DetectionFrame {
    pub detections: Vec<Detection, MAX_DETECTIONS>,
    #[serde(default)]
    pub units: BoxUnits,
    pub camera: CameraMeta,
    /// Inference duration [ms].
    pub inference_duration_ms: u32,
}

impl DetectionFrame {
    /// Empty frame (a fresh "no person" observation).
    pub fn empty(camera: CameraMeta) -> Self {
        Self {
            camera,
            ..Default::default()
        }
    }

    /// Append a detection. Returns it back when the frame is full.
    pub fn push(&mut self, detection: Detection) -> Result<(), Detection> {
        self.detections.push(detection)
    }

    /// Copy keeping only detections scoring at least `min_score`.
    /// Non-finite scores never pass.
    pub fn confident(&self, min_score: f32) -> Self {
        Self {
            detections: self
                .detections
                .iter()
                .filter(|d| d.score.is_finite() && d.score >= min_score)
                .copied()
                .collect(),
            units: self.units,
            camera: self.camera,
            inference_duration_ms: self.inference_duration_ms,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

// ─── ToF Depth Frames ───────────────────────────────────────────────

/// ToF grid resolution. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TofResolution {
    #[default]
    #[serde(rename = "4x4")]
    Grid4x4,
    #[serde(rename = "8x8")]
    Grid8x8,
}

impl TofResolution {
    /// Cells per row (= rows per grid).
    #[inline]
    pub const fn side(&self) -> usize {
        match self {
            Self::Grid4x4 => 4,
            Self::Grid8x8 => 8,
        }
    }

    #[inline]
    pub const fn cell_count(&self) -> usize {
        self.side() * self.side()
    }
}

/// Per-cell measurement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CellStatus {
    Valid,
    #[default]
    Invalid,
    Ambiguous,
}

impl CellStatus {
    /// Map a VL53L8CX `target_status` code.
    ///
    /// 5 and 9 are valid ranges, 6 and 10 are usable only with care
    /// (wrap-around not checked / no target at previous range).
    pub const fn from_target_status(code: u8) -> Self {
        match code {
            5 | 9 => Self::Valid,
            6 | 10 => Self::Ambiguous,
            _ => Self::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TofCell {
    pub distance_mm: f32,
    pub status: CellStatus,
}

impl TofCell {
    pub const fn valid(distance_mm: f32) -> Self {
        Self {
            distance_mm,
            status: CellStatus::Valid,
        }
    }

    pub const fn invalid() -> Self {
        Self {
            distance_mm: 0.0,
            status: CellStatus::Invalid,
        }
    }
}

/// One ToF poll: per-cell distance and status, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawDepthFrame {
    pub resolution: TofResolution,
    pub cells: Vec<TofCell, MAX_TOF_CELLS>,
    /// Sensor capture time [ms, producer clock].
    pub capture_timestamp_ms: u64,
}

impl RawDepthFrame {
    /// Frame with every cell invalid.
    pub fn new(resolution: TofResolution, capture_timestamp_ms: u64) -> Self {
        let mut cells = Vec::new();
        for _ in 0..resolution.cell_count() {
            // cell_count() <= MAX_TOF_CELLS
            let _ = cells.push(TofCell::invalid());
        }
        Self {
            resolution,
            cells,
            capture_timestamp_ms,
        }
    }

    /// Frame with every cell reporting the same valid distance.
    pub fn uniform(resolution: TofResolution, distance_mm: f32, capture_timestamp_ms: u64) -> Self {
        let mut frame = Self::new(resolution, capture_timestamp_ms);
        for cell in frame.cells.iter_mut() {
            *cell = TofCell::valid(distance_mm);
        }
        frame
    }

    /// Overwrite one cell. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, cell: TofCell) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = cell;
        }
    }

    #[inline]
    pub fn cell(&self, index: usize) -> Option<&TofCell> {
        self.cells.get(index)
    }

    /// True when the cell array matches the declared resolution.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.cells.len() == self.resolution.cell_count()
    }
}

// ─── Depth Estimates ────────────────────────────────────────────────

/// Distance estimate for one detection of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthEstimate {
    /// Index of the detection inside its `DetectionFrame`.
    pub detection_index: u8,
    pub track_id: Option<u32>,
    /// Estimated distance [mm], `INVALID_DISTANCE_MM` when not valid.
    pub distance_mm: f32,
    pub valid: bool,
}

impl DepthEstimate {
    pub const fn invalid(detection_index: u8, track_id: Option<u32>) -> Self {
        Self {
            detection_index,
            track_id,
            distance_mm: INVALID_DISTANCE_MM,
            valid: false,
        }
    }

    pub const fn valid(detection_index: u8, track_id: Option<u32>, distance_mm: f32) -> Self {
        Self {
            detection_index,
            track_id,
            distance_mm,
            valid: true,
        }
    }

    /// True only for a valid estimate at or inside `threshold_mm`.
    /// An invalid estimate never counts as safe or as dangerous.
    #[inline]
    pub fn within(&self, threshold_mm: f32) -> bool {
        self.valid && self.distance_mm <= threshold_mm
    }
}

/// Estimates for every detection of one frame.
pub type DepthEstimates = Vec<DepthEstimate, MAX_DETECTIONS>;

// ─── Tests ──────────────────────────────────────────────────────────
