//! Geometric mapping of bounding boxes onto the ToF grid.
//!
//! The camera frame is tiled by `side × side` pixel rectangles, one per ToF
//! cell, row-major. Cell edges use integer division so the tiles cover the
//! frame exactly with no gaps or overlaps. Rectangles are half-open
//! (`x0 <= x < x1`); a bbox overlaps a cell iff the open intersection of the
//! two is non-empty on both axes.

use andon_common::consts::MAX_TOF_CELLS;
use andon_common::types::{BBox, BoxUnits, CameraMeta, TofResolution};

/// Cell indices overlapped by one bbox, ascending.
pub type CellSet = heapless::Vec<u8, MAX_TOF_CELLS>;

/// Half-open pixel rectangle of one ToF cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// Precomputed cell rectangle table for one resolution and frame size.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    resolution: TofResolution,
    frame_width: u32,
    frame_height: u32,
    cells: heapless::Vec<CellRect, MAX_TOF_CELLS>,
}

impl GridGeometry {
    /// Build the table. Frame dimensions of 0 are treated as 1.
    pub fn new(resolution: TofResolution, frame_width: u32, frame_height: u32) -> Self {
        let w = frame_width.max(1);
        let h = frame_height.max(1);
        let side = resolution.side() as u32;
        let mut cells = heapless::Vec::new();
        for row in 0..side {
            for col in 0..side {
                let rect = CellRect {
                    x0: col * w / side,
                    y0: row * h / side,
                    x1: (col + 1) * w / side,
                    y1: (row + 1) * h / side,
                };
                // side² <= MAX_TOF_CELLS
                let _ = cells.push(rect);
            }
        }
        Self {
            resolution,
            frame_width: w,
            frame_height: h,
            cells,
        }
    }

    #[inline]
    pub fn resolution(&self) -> TofResolution {
        self.resolution
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    pub fn cell_rect(&self, index: usize) -> Option<CellRect> {
        self.cells.get(index).copied()
    }

    /// Row-major index of the cell at (`row`, `col`).
    pub fn index_of(&self, row: usize, col: usize) -> Option<usize> {
        let side = self.resolution.side();
        (row < side && col < side).then_some(row * side + col)
    }

    /// Map a pixel bbox from the camera frame into this grid's frame.
    ///
    /// Normalized boxes, and cameras reporting a zero width or height, are
    /// returned unchanged.
    pub fn rescale(&self, bbox: &BBox, units: BoxUnits, camera: &CameraMeta) -> BBox {
        if units != BoxUnits::Pixel || camera.width == 0 || camera.height == 0 {
            return *bbox;
        }
        let (fw, fh) = (self.frame_width as f32, self.frame_height as f32);
        let (cw, ch) = (camera.width as f32, camera.height as f32);
        BBox::new(
            bbox.xmin * fw / cw,
            bbox.ymin * fh / ch,
            bbox.xmax * fw / cw,
            bbox.ymax * fh / ch,
        )
    }

    /// Cells whose rectangle overlaps `bbox`.
    ///
    /// The bbox is scaled to pixels (for [`BoxUnits::Normalized`]) and
    /// clamped to `[0, width-1] × [0, height-1]`. Non-finite, degenerate
    /// (`min >= max`) or fully out-of-frame boxes give an empty set.
    pub fn overlapping_cells(&self, bbox: &BBox, units: BoxUnits) -> CellSet {
        let mut out = CellSet::new();
        if !bbox.is_finite() || bbox.xmin >= bbox.xmax || bbox.ymin >= bbox.ymax {
            return out;
        }

        let (sx, sy) = match units {
            BoxUnits::Normalized => (self.frame_width as f32, self.frame_height as f32),
            BoxUnits::Pixel => (1.0, 1.0),
        };
        let max_x = (self.frame_width - 1) as f32;
        let max_y = (self.frame_height - 1) as f32;
        let bx0 = (bbox.xmin * sx).clamp(0.0, max_x);
        let bx1 = (bbox.xmax * sx).clamp(0.0, max_x);
        let by0 = (bbox.ymin * sy).clamp(0.0, max_y);
        let by1 = (bbox.ymax * sy).clamp(0.0, max_y);
        if bx0 >= bx1 || by0 >= by1 {
            return out;
        }

        for (i, c) in self.cells.iter().enumerate() {
            let x_overlap = bx0 < c.x1 as f32 && (c.x0 as f32) < bx1;
            let y_overlap = by0 < c.y1 as f32 && (c.y0 as f32) < by1;
            if x_overlap && y_overlap {
                // i < MAX_TOF_CELLS <= u8::MAX
                let _ = out.push(i as u8);
            }
        }
        out
    }
}
