//! Logical grid dimension inference from detected cell boxes.
//!
//! Box centers are projected onto each axis independently; a large gap
//! between consecutive sorted coordinates marks a row or column boundary.

use std::collections::HashSet;

use tracing::debug;

use super::{CellBox, GridPosition, GridShape};

/// A gap must exceed this multiple of the median gap to count as a cluster
/// boundary.
const MEDIAN_GAP_FACTOR: f32 = 1.2;
/// ...and this multiple of the mean gap. Both guards together keep a single
/// outlier gap from splitting a real row or column band.
const MEAN_GAP_FACTOR: f32 = 0.8;

/// Infers grid dimensions from unordered boxes.
///
/// Zero boxes yield a 0x0 shape, which callers must treat as "undetected".
pub fn resolve_shape(boxes: &[CellBox]) -> GridShape {
    let cols = cluster_count(boxes.iter().map(|b| b.center().0).collect());
    let rows = cluster_count(boxes.iter().map(|b| b.center().1).collect());
    debug!(rows, cols, boxes = boxes.len(), "resolved grid dimensions");
    GridShape { rows, cols }
}

/// Counts coordinate clusters along one axis.
fn cluster_count(mut coords: Vec<f32>) -> u32 {
    if coords.is_empty() {
        return 0;
    }
    coords.sort_by(|a, b| a.total_cmp(b));

    let gaps: Vec<f32> = coords.windows(2).map(|pair| pair[1] - pair[0]).collect();
    if gaps.is_empty() {
        return 1;
    }

    let mut sorted_gaps = gaps.clone();
    sorted_gaps.sort_by(|a, b| a.total_cmp(b));
    let median = median_of_sorted(&sorted_gaps);
    let mean = gaps.iter().sum::<f32>() / gaps.len() as f32;

    let boundaries = gaps
        .iter()
        .filter(|&&gap| gap > median * MEDIAN_GAP_FACTOR && gap > mean * MEAN_GAP_FACTOR)
        .count();
    boundaries as u32 + 1
}

fn median_of_sorted(sorted: &[f32]) -> f32 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Assigns each box to the grid position containing its center.
///
/// The image extent is subdivided equally by the resolved dimensions and
/// centers are clamped into range. Positions are first-writer-wins: a box
/// landing on an occupied position is dropped and counted, since duplicate
/// detections of one cell are expected noise.
///
/// Returns the surviving `(position, box)` pairs in row-major order along
/// with the dropped-duplicate count.
pub fn assign_positions(
    boxes: Vec<CellBox>,
    shape: GridShape,
    img_width: u32,
    img_height: u32,
) -> (Vec<(GridPosition, CellBox)>, usize) {
    if shape.rows == 0 || shape.cols == 0 {
        return (Vec::new(), 0);
    }

    let cell_w = img_width as f32 / shape.cols as f32;
    let cell_h = img_height as f32 / shape.rows as f32;

    let mut used: HashSet<GridPosition> = HashSet::new();
    let mut positioned = Vec::with_capacity(boxes.len());
    let mut dropped = 0usize;

    for bbox in boxes {
        let (cx, cy) = bbox.center();
        let col = ((cx / cell_w) as i64).clamp(0, i64::from(shape.cols) - 1) as u32;
        let row = ((cy / cell_h) as i64).clamp(0, i64::from(shape.rows) - 1) as u32;
        let position = GridPosition { row, col };
        if used.insert(position) {
            positioned.push((position, bbox));
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!(dropped, "boxes dropped at occupied grid positions");
    }

    positioned.sort_by_key(|(position, _)| *position);
    (positioned, dropped)
}
