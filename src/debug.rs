//! Debug visualization capability.
//!
//! The pipeline reports detected geometry and searched regions through a
//! [`DebugSink`] instead of writing files itself, so tests can observe
//! visualization calls without touching disk. [`FileDebugSink`] is the
//! file-writing implementation used by the CLI.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::grid::CellBox;

/// One searched region and the text recognized inside it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAnnotation {
    pub region: CellBox,
    pub label: Option<String>,
}

/// Receives visualization events from the pipeline.
pub trait DebugSink {
    /// Called once per detection with the accepted cell boxes.
    fn grid_detected(&self, image: &RgbImage, source: &Path, boxes: &[CellBox]);

    /// Called once per synthesis with every searched region and its label.
    fn cells_searched(&self, image: &RgbImage, source: &Path, annotations: &[RegionAnnotation]);

    /// Called when candidate boxes were dropped for landing on an occupied
    /// grid position.
    fn duplicates_dropped(&self, _source: &Path, _count: usize) {}
}

/// Writes annotated copies next to the input: `<input>.debug.png` for
/// detected cells and `<input>.text_debug.png` for searched regions.
/// Recognized labels are logged rather than rasterized.
#[derive(Debug, Default)]
pub struct FileDebugSink;

const CELL_OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);

impl DebugSink for FileDebugSink {
    fn grid_detected(&self, image: &RgbImage, source: &Path, boxes: &[CellBox]) {
        let mut canvas = image.clone();
        for bbox in boxes {
            draw_box(&mut canvas, bbox);
        }
        write_image(&canvas, &suffixed(source, ".debug.png"));
    }

    fn cells_searched(&self, image: &RgbImage, source: &Path, annotations: &[RegionAnnotation]) {
        let mut canvas = image.clone();
        for annotation in annotations {
            draw_box(&mut canvas, &annotation.region);
            if let Some(label) = &annotation.label {
                debug!(
                    x = annotation.region.x,
                    y = annotation.region.y,
                    %label,
                    "cell text"
                );
            }
        }
        write_image(&canvas, &suffixed(source, ".text_debug.png"));
    }

    fn duplicates_dropped(&self, source: &Path, count: usize) {
        debug!(
            source = %source.display(),
            count,
            "duplicate cell candidates dropped"
        );
    }
}

fn draw_box(canvas: &mut RgbImage, bbox: &CellBox) {
    let rect = Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width.max(1), bbox.height.max(1));
    draw_hollow_rect_mut(canvas, rect, CELL_OUTLINE);
}

/// `<input>` plus a suffix: `board.png` becomes `board.png.debug.png`.
fn suffixed(source: &Path, suffix: &str) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_image(canvas: &RgbImage, path: &Path) {
    if let Err(err) = canvas.save(path) {
        warn!(path = %path.display(), %err, "failed to write debug image");
    } else {
        debug!(path = %path.display(), "wrote debug image");
    }
}
