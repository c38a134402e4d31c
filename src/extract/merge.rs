//! Whole-image text detection and fragment merging.
//!
//! Sparse recognition over the full image recovers text that per-cell
//! extraction misses, at the cost of fragmenting labels into words; the
//! merger stitches horizontally adjacent fragments back together.

use image::{DynamicImage, Rgb, RgbImage};
use tracing::debug;

use super::cell::{crop_cell, mean_color};
use crate::Result;
use crate::grid::CellBox;
use crate::ocr::{RecognitionMode, TextRecognizer};

/// Confidence floor below which raw regions are discarded.
pub const MIN_REGION_CONFIDENCE: f32 = 0.3;
/// Minimum region area as a fraction of image area; anything smaller is
/// speckle.
const MIN_AREA_FRACTION: f64 = 0.0002;
/// Maximum horizontal gap, in pixels, between fragments of one label.
const MERGE_GAP: u32 = 10;
/// Minimum height ratio between merge candidates.
const MIN_HEIGHT_RATIO: f32 = 0.7;
/// Interface labels that are never board content.
const NON_CONTENT_LABELS: [&str; 2] = ["vocab", "menu"];

/// One detected text region with its sampled background color.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    pub bbox: CellBox,
    pub text: String,
    /// Recognition certainty in `[0, 1]`; merged regions carry the minimum
    /// of their parts.
    pub confidence: f32,
    /// Mean color of the region's pixels.
    pub color: Rgb<u8>,
}

/// True for pagination/menu controls that should not become buttons.
pub fn is_non_content(text: &str) -> bool {
    NON_CONTENT_LABELS
        .iter()
        .any(|label| text.eq_ignore_ascii_case(label))
}

/// Runs sparse-text recognition over the whole image and returns merged
/// regions sorted top-to-bottom, then left-to-right.
pub fn detect_text_regions<R: TextRecognizer>(
    img: &RgbImage,
    recognizer: &mut R,
) -> Result<Vec<TextRegion>> {
    let words = recognizer.recognize(&DynamicImage::ImageRgb8(img.clone()), RecognitionMode::SparseText)?;
    let min_area = f64::from(img.width()) * f64::from(img.height()) * MIN_AREA_FRACTION;

    let mut regions = Vec::new();
    for word in words {
        if word.confidence < MIN_REGION_CONFIDENCE {
            continue;
        }
        if (word.bbox.area() as f64) < min_area {
            continue;
        }
        let text = word.text.trim();
        if text.is_empty() || is_non_content(text) {
            continue;
        }
        let color = mean_color(&crop_cell(img, &word.bbox));
        regions.push(TextRegion {
            bbox: word.bbox,
            text: text.to_string(),
            confidence: word.confidence,
            color,
        });
    }
    debug!(regions = regions.len(), "raw text regions after filtering");

    let mut merged = merge_nearby_regions(regions, MERGE_GAP);
    merged.sort_by_key(|region| (region.bbox.y, region.bbox.x));
    Ok(merged)
}

/// Merges horizontally adjacent fragments that likely belong to one label.
///
/// Eligibility: similar height, vertical-center alignment within a third of
/// the height, and horizontal adjacency within `gap` pixels. Running this on
/// already-merged output changes nothing, since merged boxes are farther
/// apart than the gap.
pub fn merge_nearby_regions(mut regions: Vec<TextRegion>, gap: u32) -> Vec<TextRegion> {
    if regions.is_empty() {
        return regions;
    }
    regions.sort_by_key(|region| (region.bbox.y, region.bbox.x));

    let mut merged: Vec<TextRegion> = Vec::with_capacity(regions.len());
    let mut used = vec![false; regions.len()];

    for i in 0..regions.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut current = regions[i].clone();

        for j in (i + 1)..regions.len() {
            if used[j] {
                continue;
            }
            if !horizontally_mergeable(&current, &regions[j], gap) {
                continue;
            }
            current = merge_pair(current, &regions[j]);
            used[j] = true;
        }

        merged.push(current);
    }

    merged
}

fn horizontally_mergeable(a: &TextRegion, b: &TextRegion, gap: u32) -> bool {
    let (ha, hb) = (a.bbox.height as f32, b.bbox.height as f32);
    let height_ratio = ha.min(hb) / ha.max(hb);
    if height_ratio < MIN_HEIGHT_RATIO {
        return false;
    }

    let top_aligned = (a.bbox.y as f32 - b.bbox.y as f32).abs() < ha / 3.0;
    let bottom_aligned = ((a.bbox.y + a.bbox.height) as f32 - (b.bbox.y + b.bbox.height) as f32)
        .abs()
        < ha / 3.0;
    let adjacent =
        ((a.bbox.x + a.bbox.width) as i64 - i64::from(b.bbox.x)).abs() < i64::from(gap);

    top_aligned && bottom_aligned && adjacent
}

/// Joins two fragments: bounding-box union, alphanumeric-aware spacing, and
/// the pessimistic minimum of the two confidences.
fn merge_pair(a: TextRegion, b: &TextRegion) -> TextRegion {
    let min_x = a.bbox.x.min(b.bbox.x);
    let min_y = a.bbox.y.min(b.bbox.y);
    let max_x = (a.bbox.x + a.bbox.width).max(b.bbox.x + b.bbox.width);
    let max_y = (a.bbox.y + a.bbox.height).max(b.bbox.y + b.bbox.height);

    // A space only between alphanumeric neighbors keeps compact tokens like
    // "3pm" intact while separating real words.
    let glue = match (a.text.chars().last(), b.text.chars().next()) {
        (Some(tail), Some(head)) if tail.is_alphanumeric() && head.is_alphanumeric() => " ",
        _ => "",
    };

    TextRegion {
        bbox: CellBox::new(min_x, min_y, max_x - min_x, max_y - min_y),
        text: format!("{}{glue}{}", a.text, b.text),
        confidence: a.confidence.min(b.confidence),
        color: a.color,
    }
}
