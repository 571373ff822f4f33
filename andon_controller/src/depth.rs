//! Person distance estimation from detection boxes and the ToF grid.
//!
//! - [`grid`] - Cell rectangle table and bbox → cell overlap mapping
//! - [`estimator`] - Per-detection distance with median outlier rejection

pub mod estimator;
pub mod grid;

pub use estimator::{EstimatorParams, aggregate_readings, estimate};
pub use grid::{CellRect, CellSet, GridGeometry};
