//! Grid-first page assembly.
//!
//! Geometry is resolved once, a shared cell pitch is estimated from the
//! detected boxes, and every expected grid position is searched for text.
//! Cells that yield nothing simply contribute no button; only an undecodable
//! image or a hintless empty detection aborts the call.

use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use tracing::{debug, info};

use crate::Result;
use crate::debug::{DebugSink, RegionAnnotation};
use crate::error::Error;
use crate::extract::cell::{self, CellContent, clean_text, crop_cell, mean_color};
use crate::extract::merge::{self, TextRegion};
use crate::grid::{self, CellBox, GridDetection, GridPosition, GridShape};
use crate::hints::GridHintTable;
use crate::ocr::{RecognitionMode, TesseractRecognizer, TextRecognizer};
use crate::tree::{Button, Page, Tree};

/// Margin, in pixels, added around the expected cell rectangle when
/// searching for its text.
const CELL_MARGIN: u32 = 5;
/// One part in this many is trimmed from each end of the sorted box sizes
/// before taking the median cell pitch.
const PITCH_TRIM_DIVISOR: usize = 10;

/// Options for [`ScreenshotProcessor::create_page_from_screenshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PageOptions {
    /// Known row count; authoritative when set.
    pub rows: Option<u32>,
    /// Known column count; authoritative when set.
    pub cols: Option<u32>,
    /// Leading detected row positions to skip before fixing the grid origin,
    /// excluding a header or toolbar strip from the grid.
    pub ignore_rows: usize,
}

impl PageOptions {
    pub fn with_shape(shape: GridShape) -> Self {
        Self {
            rows: Some(shape.rows),
            cols: Some(shape.cols),
            ignore_rows: 0,
        }
    }

    /// Detection hint; only a complete shape anchors the detector.
    fn hint(&self) -> Option<GridShape> {
        match (self.rows, self.cols) {
            (Some(rows), Some(cols)) => Some(GridShape::new(rows, cols)),
            _ => None,
        }
    }
}

/// Reads an image file into the pipeline's working format.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Reconstructs board pages from screenshots.
///
/// Holds the recognition engine (reused across calls from one thread), an
/// optional debug sink, and the caller's filename hint table.
pub struct ScreenshotProcessor<R: TextRecognizer> {
    recognizer: R,
    debug_sink: Option<Box<dyn DebugSink>>,
    hints: GridHintTable,
}

impl ScreenshotProcessor<TesseractRecognizer> {
    /// Builds a processor around a system Tesseract install.
    pub fn new() -> Result<Self> {
        Ok(Self::with_recognizer(TesseractRecognizer::new()?))
    }
}

impl<R: TextRecognizer> ScreenshotProcessor<R> {
    pub fn with_recognizer(recognizer: R) -> Self {
        Self {
            recognizer,
            debug_sink: None,
            hints: GridHintTable::default(),
        }
    }

    /// Routes debug visualizations into `sink`.
    pub fn with_debug_sink(mut self, sink: Box<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    /// Uses `hints` to pick grid dimensions for recognized file names in
    /// [`Self::load_into_tree`].
    pub fn with_hints(mut self, hints: GridHintTable) -> Self {
        self.hints = hints;
        self
    }

    /// True when the file extension is a supported raster format.
    pub fn can_process(path: &Path) -> bool {
        matches!(
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase())
                .as_deref(),
            Some("png" | "jpg" | "jpeg" | "bmp")
        )
    }

    /// Detects grid geometry, reporting through the debug sink when one is
    /// configured.
    pub fn detect_grid(&self, path: &Path, hint: Option<GridShape>) -> Result<GridDetection> {
        let img = load_image(path)?;
        let detection = grid::detect_cells(&img, hint)?;
        self.report_detection(&img, path, &detection);
        Ok(detection)
    }

    /// Extracts text and mean color from one cell region of a loaded image.
    pub fn detect_cell_content(&mut self, img: &RgbImage, bbox: &CellBox) -> CellContent {
        cell::detect_cell_content(img, bbox, &mut self.recognizer)
    }

    /// Detects and merges text regions across the whole image.
    pub fn detect_text_regions(&mut self, path: &Path) -> Result<Vec<TextRegion>> {
        let img = load_image(path)?;
        merge::detect_text_regions(&img, &mut self.recognizer)
    }

    /// Reconstructs one page from a screenshot using grid-first detection.
    pub fn create_page_from_screenshot(
        &mut self,
        path: &Path,
        options: &PageOptions,
    ) -> Result<Page> {
        let img = load_image(path)?;

        let detection = grid::detect_cells(&img, options.hint())?;
        self.report_detection(&img, path, &detection);

        // Caller-supplied dimensions override per axis; detection fills the
        // rest.
        let shape = GridShape::new(
            options.rows.unwrap_or(detection.shape.rows),
            options.cols.unwrap_or(detection.shape.cols),
        );
        if shape.rows < 1 || shape.cols < 1 {
            return Err(Error::InvalidGridShape {
                rows: shape.rows,
                cols: shape.cols,
            });
        }
        debug!(
            rows = shape.rows,
            cols = shape.cols,
            boxes = detection.boxes.len(),
            fallback = detection.used_fallback,
            "grid geometry resolved"
        );

        let (origin_x, origin_y) = grid_origin(&detection.boxes, options.ignore_rows);
        let (pitch_w, pitch_h) = cell_pitch(&detection.boxes);

        let stem = file_stem(path);
        let mut page = Page::new(
            format!("screenshot_{stem}"),
            format!("Detected Page - {stem}"),
            shape,
        );

        let mut annotations = Vec::with_capacity(shape.cell_count() as usize);
        for row in 0..shape.rows {
            for col in 0..shape.cols {
                let expected_x = origin_x + col * pitch_w;
                let expected_y = origin_y + row * pitch_h;
                let Some(search) =
                    search_region(img.width(), img.height(), expected_x, expected_y, pitch_w, pitch_h)
                else {
                    continue;
                };

                let crop = crop_cell(&img, &search);
                let fragments = self.cell_fragments(&crop);

                if fragments.is_empty() {
                    annotations.push(RegionAnnotation {
                        region: search,
                        label: None,
                    });
                    continue;
                }

                let label = fragments.join(" ");
                let color = mean_color(&crop);
                let button = Button::speak(
                    format!("btn_{}", page.buttons.len()),
                    label.clone(),
                    GridPosition::new(row, col),
                )
                .with_body_color(color_hex(color));
                page.buttons.push(button);
                annotations.push(RegionAnnotation {
                    region: search,
                    label: Some(label),
                });
            }
        }

        if let Some(sink) = &self.debug_sink {
            sink.cells_searched(&img, path, &annotations);
        }

        info!(
            buttons = page.buttons.len(),
            cells = shape.cell_count(),
            "page assembled"
        );
        Ok(page)
    }

    /// Loads a screenshot as a single-page tree.
    ///
    /// When the configured hint table matches the file name, its grid shape
    /// seeds detection; the table is advisory, never authoritative.
    pub fn load_into_tree(&mut self, path: &Path) -> Result<Tree> {
        let options = match self.hints.lookup(path) {
            Some(shape) => PageOptions::with_shape(shape),
            None => PageOptions::default(),
        };
        let page = self.create_page_from_screenshot(path, &options)?;
        let mut tree = Tree::new();
        tree.add_page(page);
        Ok(tree)
    }

    /// Non-empty button labels of the reconstructed page.
    pub fn extract_texts(&mut self, path: &Path) -> Result<Vec<String>> {
        let page = self.create_page_from_screenshot(path, &PageOptions::default())?;
        Ok(page
            .buttons
            .into_iter()
            .map(|button| button.label)
            .filter(|label| !label.is_empty())
            .collect())
    }

    /// Image synthesis from a tree is out of scope for this source type.
    pub fn save_from_tree(&self, _tree: &Tree, _output: &Path) -> Result<()> {
        Err(Error::Unsupported("saving a tree back to a screenshot"))
    }

    /// Sparse-recognizes one search crop and returns its cleaned fragments.
    ///
    /// Engine failures degrade to an empty list; a single bad cell never
    /// aborts page assembly.
    fn cell_fragments(&mut self, crop: &RgbImage) -> Vec<String> {
        let words = match self
            .recognizer
            .recognize(&DynamicImage::ImageRgb8(crop.clone()), RecognitionMode::SparseText)
        {
            Ok(words) => words,
            Err(err) => {
                debug!(%err, "cell recognition failed, leaving cell empty");
                return Vec::new();
            }
        };

        words
            .into_iter()
            .filter(|word| word.confidence >= merge::MIN_REGION_CONFIDENCE)
            .filter(|word| !merge::is_non_content(word.text.trim()))
            .filter_map(|word| {
                let cleaned = clean_text(&word.text);
                if cleaned.is_empty() { None } else { Some(cleaned) }
            })
            .collect()
    }

    fn report_detection(&self, img: &RgbImage, path: &Path, detection: &GridDetection) {
        if let Some(sink) = &self.debug_sink {
            sink.grid_detected(img, path, &detection.boxes);
            if detection.dropped_duplicates > 0 {
                sink.duplicates_dropped(path, detection.dropped_duplicates);
            }
        }
    }
}

/// Grid origin from the detected boxes. The y origin skips `ignore_rows`
/// leading sorted y coordinates, clamped to the available boxes.
fn grid_origin(boxes: &[CellBox], ignore_rows: usize) -> (u32, u32) {
    let origin_x = boxes.iter().map(|b| b.x).min().unwrap_or(0);
    let mut ys: Vec<u32> = boxes.iter().map(|b| b.y).collect();
    ys.sort_unstable();
    let index = ignore_rows.min(ys.len().saturating_sub(1));
    let origin_y = ys.get(index).copied().unwrap_or(0);
    (origin_x, origin_y)
}

/// Median cell size after trimming the extremes.
///
/// A tenth of the boxes at each end of the sorted size lists are treated as
/// outliers so a few merged or sliver boxes do not skew the shared pitch.
fn cell_pitch(boxes: &[CellBox]) -> (u32, u32) {
    let mut widths: Vec<u32> = boxes.iter().map(|b| b.width).collect();
    let mut heights: Vec<u32> = boxes.iter().map(|b| b.height).collect();
    widths.sort_unstable();
    heights.sort_unstable();

    let trim = widths.len() / PITCH_TRIM_DIVISOR;
    let widths = &widths[trim..widths.len() - trim];
    let heights = &heights[trim..heights.len() - trim];

    (median_u32(widths).max(1), median_u32(heights).max(1))
}

fn median_u32(sorted: &[u32]) -> u32 {
    if sorted.is_empty() {
        return 0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2
    } else {
        sorted[mid]
    }
}

/// Expected cell rectangle expanded by the search margin and clamped to the
/// image; `None` when the expected position lies entirely outside.
fn search_region(
    img_width: u32,
    img_height: u32,
    x: u32,
    y: u32,
    pitch_w: u32,
    pitch_h: u32,
) -> Option<CellBox> {
    let search_x = x.saturating_sub(CELL_MARGIN);
    let search_y = y.saturating_sub(CELL_MARGIN);
    if search_x >= img_width || search_y >= img_height {
        return None;
    }
    let width = (pitch_w + 2 * CELL_MARGIN).min(img_width - search_x);
    let height = (pitch_h + 2 * CELL_MARGIN).min(img_height - search_y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(CellBox::new(search_x, search_y, width, height))
}

fn color_hex(color: Rgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "screenshot".to_string())
}
