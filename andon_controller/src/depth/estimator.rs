//! Per-detection distance estimation.
//!
//! For each detection: gather the ToF cells its bbox overlaps, keep valid
//! in-range readings, reject outliers around the median, average the rest.
//! Detections are independent; one without usable cells yields an invalid
//! estimate and does not affect the others.

use andon_common::config::SensorConfig;
use andon_common::consts::{
    MAX_RANGE_MM_DEFAULT, MAX_TOF_CELLS, OUTLIER_FRACTION_DEFAULT, OUTLIER_MIN_READINGS,
};
use andon_common::types::{
    CellStatus, DepthEstimate, DepthEstimates, DetectionFrame, RawDepthFrame, TofCell,
};

use super::grid::GridGeometry;

type Readings = heapless::Vec<f32, MAX_TOF_CELLS>;

/// Filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorParams {
    /// Readings must satisfy `0 < d < max_range_mm`.
    pub max_range_mm: f32,
    /// Readings further than `outlier_fraction × median` from the median are dropped.
    pub outlier_fraction: f32,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            max_range_mm: MAX_RANGE_MM_DEFAULT,
            outlier_fraction: OUTLIER_FRACTION_DEFAULT,
        }
    }
}

impl From<&SensorConfig> for EstimatorParams {
    fn from(cfg: &SensorConfig) -> Self {
        Self {
            max_range_mm: cfg.max_range_mm,
            outlier_fraction: cfg.outlier_fraction,
        }
    }
}

impl EstimatorParams {
    #[inline]
    fn usable(&self, cell: &TofCell) -> bool {
        cell.status == CellStatus::Valid
            && cell.distance_mm.is_finite()
            && cell.distance_mm > 0.0
            && cell.distance_mm < self.max_range_mm
    }
}

/// One estimate per detection of `frame`, in detection order.
///
/// `depth = None`, a frame of another resolution than `geometry`, or a frame
/// whose cell count does not match its resolution gives all-invalid estimates.
pub fn estimate(
    frame: &DetectionFrame,
    depth: Option<&RawDepthFrame>,
    geometry: &GridGeometry,
    params: &EstimatorParams,
) -> DepthEstimates {
    let depth = depth.filter(|d| d.is_consistent() && d.resolution == geometry.resolution());

    let mut out = DepthEstimates::new();
    for (i, det) in frame.detections.iter().enumerate() {
        let index = i as u8;
        let est = depth
            .and_then(|d| {
                let mut readings = Readings::new();
                let bbox = geometry.rescale(&det.bbox, frame.units, &frame.camera);
                for cell in geometry.overlapping_cells(&bbox, frame.units) {
                    if let Some(c) = d.cell(cell as usize).filter(|c| params.usable(c)) {
                        let _ = readings.push(c.distance_mm);
                    }
                }
                aggregate_readings(&mut readings, params.outlier_fraction)
            })
            .map_or(DepthEstimate::invalid(index, det.track_id), |mm| {
                DepthEstimate::valid(index, det.track_id, mm)
            });
        // frame.detections and out share capacity
        let _ = out.push(est);
    }
    out
}

/// Median outlier rejection followed by the arithmetic mean.
///
/// Rejection repeats around the new upper median (`sorted[n / 2]`) until a
/// pass drops nothing or fewer than [`OUTLIER_MIN_READINGS`] readings remain,
/// so running it again on its own output changes nothing. Returns `None`
/// when no reading survives. `readings` is left sorted and filtered.
pub fn aggregate_readings<const N: usize>(
    readings: &mut heapless::Vec<f32, N>,
    outlier_fraction: f32,
) -> Option<f32> {
    readings.sort_unstable_by(f32::total_cmp);
    while readings.len() >= OUTLIER_MIN_READINGS {
        let before = readings.len();
        let median = readings[before / 2];
        let tolerance = median.abs() * outlier_fraction;
        readings.retain(|r| (r - median).abs() <= tolerance);
        if readings.len() == before {
            break;
        }
    }
    if readings.is_empty() {
        return None;
    }
    let sum: f32 = readings.iter().sum();
    Some(sum / readings.len() as f32)
}
