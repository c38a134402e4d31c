//! Candidate cell detection from raw pixels.
//!
//! Runs an edge-detection, dilation, and contour-extraction pass over the
//! image, then filters the contours through an ordered list of area/aspect
//! parameter passes until one yields enough near-rectangular boxes. When the
//! caller knows the grid dimensions and nothing passes, a uniform synthetic
//! grid guarantees detection never fails outright.

use image::{RgbImage, imageops};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::dilate;
use imageproc::point::Point;
use tracing::debug;

use super::{CellBox, GridShape, resolver};
use crate::Result;
use crate::error::Error;

/// Canny hysteresis thresholds.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;
/// Dilation reach in pixels; connects gaps left by the edge detector.
/// Equivalent to a 3x3 kernel applied twice.
const DILATE_RADIUS: u8 = 2;
/// Polygon approximation tolerance as a fraction of contour perimeter.
const APPROX_EPSILON: f64 = 0.02;
/// A near-quadrilateral approximates to exactly this many vertices.
const QUAD_VERTICES: usize = 4;
/// A candidate overlapping an accepted box by more than this fraction of its
/// own area duplicates the same cell (nested or doubled contour).
const MAX_OVERLAP: f64 = 0.5;
/// Minimum detected fraction of the expected cell count when the caller
/// supplied grid dimensions.
const HINTED_MIN_FRACTION: f64 = 0.5;
/// Minimum box count to accept a pass when no dimensions were supplied.
const UNHINTED_MIN_BOXES: usize = 12;

/// Contour area bounds as fractions of image area, most restrictive first.
const AREA_RANGES: [(f64, f64); 3] = [(0.005, 0.05), (0.003, 0.07), (0.001, 0.1)];
/// Extra-permissive area range appended to hinted sweeps: known dimensions
/// give a trust anchor, so a noisy pass is still worth accepting.
const HINTED_EXTRA_AREA: (f64, f64) = (0.0005, 0.2);
/// Bounding-box aspect-ratio bounds, nearly square first.
const ASPECT_RANGES: [(f64, f64); 4] = [(0.8, 1.2), (0.7, 1.5), (0.5, 2.0), (0.2, 5.0)];

/// One entry of the detection parameter sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionPass {
    /// Contour area bounds as fractions of total image area.
    pub area: (f64, f64),
    /// Bounding-box width/height ratio bounds.
    pub aspect: (f64, f64),
}

/// Builds the ordered strategy list for one detection run.
///
/// Tuning detection means editing the range tables above, not this loop.
pub fn detection_passes(hinted: bool) -> Vec<DetectionPass> {
    let mut areas: Vec<(f64, f64)> = AREA_RANGES.to_vec();
    if hinted {
        areas.push(HINTED_EXTRA_AREA);
    }
    areas
        .into_iter()
        .flat_map(|area| {
            ASPECT_RANGES
                .iter()
                .map(move |&aspect| DetectionPass { area, aspect })
        })
        .collect()
}

/// Result of one grid detection.
#[derive(Debug, Clone)]
pub struct GridDetection {
    /// Supplied or inferred logical dimensions.
    pub shape: GridShape,
    /// Deduplicated cell boxes in row-major position order.
    pub boxes: Vec<CellBox>,
    /// Candidates dropped for landing on an already-occupied grid position.
    pub dropped_duplicates: usize,
    /// True when the boxes are the synthetic uniform fallback grid.
    pub used_fallback: bool,
}

/// A contour reduced to the features the sweep filters on.
struct Candidate {
    bbox: CellBox,
    area: f64,
    vertices: usize,
}

/// Detects cell geometry in `img`.
///
/// With a hint, accepts the first pass finding at least half the expected
/// cells and falls back to a uniform grid if none does. Without a hint,
/// requires at least [`UNHINTED_MIN_BOXES`] boxes and fails with
/// [`Error::NoCellsDetected`] otherwise.
pub fn detect_cells(img: &RgbImage, hint: Option<GridShape>) -> Result<GridDetection> {
    if let Some(shape) = hint
        && (shape.rows == 0 || shape.cols == 0)
    {
        return Err(Error::InvalidGridShape {
            rows: shape.rows,
            cols: shape.cols,
        });
    }

    // The edge map does not depend on sweep parameters, so candidates are
    // extracted once and re-filtered per pass.
    let candidates = extract_candidates(img);
    let image_area = f64::from(img.width()) * f64::from(img.height());

    let mut best: Vec<CellBox> = Vec::new();
    for (index, pass) in detection_passes(hint.is_some()).iter().enumerate() {
        let boxes = filter_pass(&candidates, pass, image_area);
        if boxes.is_empty() {
            continue;
        }
        let accepted = match hint {
            Some(shape) => {
                boxes.len() as f64 >= f64::from(shape.cell_count()) * HINTED_MIN_FRACTION
            }
            None => boxes.len() >= UNHINTED_MIN_BOXES,
        };
        if accepted {
            debug!(
                pass = index,
                boxes = boxes.len(),
                "detection pass accepted"
            );
            best = boxes;
            break;
        }
    }

    let mut used_fallback = false;
    if best.is_empty() {
        match hint {
            Some(shape) => {
                debug!(
                    rows = shape.rows,
                    cols = shape.cols,
                    "no pass met threshold, synthesizing uniform grid"
                );
                best = uniform_grid(img.width(), img.height(), shape);
                used_fallback = true;
            }
            None => return Err(Error::NoCellsDetected),
        }
    }

    best.sort_by_key(|b| (b.y, b.x));

    let shape = match hint {
        Some(shape) => shape,
        None => resolver::resolve_shape(&best),
    };

    let (positioned, dropped_duplicates) =
        resolver::assign_positions(best, shape, img.width(), img.height());
    let boxes = positioned.into_iter().map(|(_, bbox)| bbox).collect();

    Ok(GridDetection {
        shape,
        boxes,
        dropped_duplicates,
        used_fallback,
    })
}

/// Runs the edge/contour pipeline and reduces each contour to its sweep
/// features.
fn extract_candidates(img: &RgbImage) -> Vec<Candidate> {
    let gray = imageops::grayscale(img);
    let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);
    let dilated = dilate(&edges, Norm::LInf, DILATE_RADIUS);

    find_contours::<i32>(&dilated)
        .into_iter()
        .filter_map(|contour| {
            if contour.points.len() < QUAD_VERTICES {
                return None;
            }
            let area = contour_area(&contour.points);
            let perimeter = arc_length(&contour.points, true);
            let approx = approximate_polygon_dp(&contour.points, APPROX_EPSILON * perimeter, true);
            let bbox = bounding_box(&contour.points, img.width(), img.height())?;
            Some(Candidate {
                bbox,
                area,
                vertices: approx.len(),
            })
        })
        .collect()
}

/// Filters the candidate list through one parameter pass, deduplicating
/// boxes that mostly overlap an already-accepted one.
fn filter_pass(candidates: &[Candidate], pass: &DetectionPass, image_area: f64) -> Vec<CellBox> {
    let min_area = image_area * pass.area.0;
    let max_area = image_area * pass.area.1;

    let mut accepted: Vec<CellBox> = Vec::new();
    for candidate in candidates {
        if candidate.vertices != QUAD_VERTICES {
            continue;
        }
        if candidate.area <= min_area || candidate.area >= max_area {
            continue;
        }
        let aspect = f64::from(candidate.bbox.width) / f64::from(candidate.bbox.height);
        if aspect <= pass.aspect.0 || aspect >= pass.aspect.1 {
            continue;
        }
        let duplicate = accepted.iter().any(|existing| {
            candidate.bbox.overlap_area(existing) as f64
                > candidate.bbox.area() as f64 * MAX_OVERLAP
        });
        if !duplicate {
            accepted.push(candidate.bbox);
        }
    }
    accepted
}

/// Shoelace area of a closed contour.
fn contour_area(points: &[Point<i32>]) -> f64 {
    let mut doubled = 0i64;
    for (index, p) in points.iter().enumerate() {
        let q = points[(index + 1) % points.len()];
        doubled += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
    }
    doubled.abs() as f64 / 2.0
}

/// Axis-aligned bounding box of a contour, clamped to the image.
fn bounding_box(points: &[Point<i32>], img_width: u32, img_height: u32) -> Option<CellBox> {
    let min_x = points.iter().map(|p| p.x).min()?.max(0) as u32;
    let min_y = points.iter().map(|p| p.y).min()?.max(0) as u32;
    let max_x = (points.iter().map(|p| p.x).max()?.max(0) as u32).min(img_width.saturating_sub(1));
    let max_y = (points.iter().map(|p| p.y).max()?.max(0) as u32).min(img_height.saturating_sub(1));
    if max_x <= min_x || max_y <= min_y {
        return None;
    }
    Some(CellBox::new(
        min_x,
        min_y,
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}

/// Evenly spaced `rows x cols` boxes spanning the whole image.
fn uniform_grid(width: u32, height: u32, shape: GridShape) -> Vec<CellBox> {
    let cell_w = f64::from(width) / f64::from(shape.cols);
    let cell_h = f64::from(height) / f64::from(shape.rows);
    let mut boxes = Vec::with_capacity(shape.cell_count() as usize);
    for row in 0..shape.rows {
        for col in 0..shape.cols {
            boxes.push(CellBox::new(
                (f64::from(col) * cell_w) as u32,
                (f64::from(row) * cell_h) as u32,
                (cell_w as u32).max(1),
                (cell_h as u32).max(1),
            ));
        }
    }
    boxes
}
