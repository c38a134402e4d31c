//! Per-cell text and color extraction.
//!
//! A cell crop is a small, possibly noisy region; recognition works on a
//! cleaned, binarized, upscaled copy while the color comes from the raw
//! pixels.

use std::sync::OnceLock;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::{ThresholdType, adaptive_threshold, equalize_histogram, otsu_level, threshold};
use imageproc::filter::median_filter;
use imageproc::map::map_colors2;
use regex::Regex;
use tracing::debug;

use crate::Result;
use crate::grid::CellBox;
use crate::ocr::{RecognitionMode, RecognizedWord, TextRecognizer};

/// Neighborhood radius for local adaptive thresholding (an 11x11 block).
const ADAPTIVE_BLOCK_RADIUS: u32 = 5;
/// Upscale factor applied before recognition; cell crops are small.
const OCR_SCALE: u32 = 3;
/// Recognized strings shorter than this are noise, not labels.
const MIN_TEXT_LEN: usize = 2;

/// Extracted content of one grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellContent {
    /// Cleaned label text; empty when the cell has no recognizable text.
    pub text: String,
    /// Mean color of the raw crop.
    pub color: Rgb<u8>,
}

/// Mean pixel color of a region, the proxy for a button's background.
pub fn mean_color(img: &RgbImage) -> Rgb<u8> {
    let pixel_count = u64::from(img.width()) * u64::from(img.height());
    if pixel_count == 0 {
        return Rgb([0, 0, 0]);
    }
    let mut sums = [0u64; 3];
    for pixel in img.pixels() {
        sums[0] += u64::from(pixel[0]);
        sums[1] += u64::from(pixel[1]);
        sums[2] += u64::from(pixel[2]);
    }
    Rgb([
        (sums[0] / pixel_count) as u8,
        (sums[1] / pixel_count) as u8,
        (sums[2] / pixel_count) as u8,
    ])
}

/// Crops `bbox` out of `img`, clamped to the image bounds.
pub fn crop_cell(img: &RgbImage, bbox: &CellBox) -> RgbImage {
    let x = bbox.x.min(img.width().saturating_sub(1));
    let y = bbox.y.min(img.height().saturating_sub(1));
    let width = bbox.width.clamp(1, img.width() - x);
    let height = bbox.height.clamp(1, img.height() - y);
    imageops::crop_imm(img, x, y, width, height).to_image()
}

/// Extracts label text and mean color from one cell region.
///
/// Content-quality problems never raise: an engine failure or sub-threshold
/// result degrades to an empty string and a debug log line.
pub fn detect_cell_content<R: TextRecognizer>(
    img: &RgbImage,
    bbox: &CellBox,
    recognizer: &mut R,
) -> CellContent {
    let crop = crop_cell(img, bbox);
    let color = mean_color(&crop);

    let binary = binarize(&crop);
    let scaled = imageops::resize(
        &binary,
        binary.width() * OCR_SCALE,
        binary.height() * OCR_SCALE,
        FilterType::CatmullRom,
    );
    let scaled = DynamicImage::ImageLuma8(scaled);

    let text = match recognize_text(&scaled, recognizer) {
        Ok(text) => text,
        Err(err) => {
            debug!(%err, "cell OCR failed, treating cell as empty");
            String::new()
        }
    };

    CellContent { text, color }
}

/// Prepares a cell crop for recognition.
///
/// Adaptive and Otsu thresholds are combined with a logical AND: background
/// texture that survives one method rarely survives both.
fn binarize(crop: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(crop);
    let gray = equalize_histogram(&gray);
    let gray = median_filter(&gray, 1, 1);

    let adaptive = adaptive_threshold(&gray, ADAPTIVE_BLOCK_RADIUS);
    let global = threshold(&gray, otsu_level(&gray), ThresholdType::Binary);
    map_colors2(&adaptive, &global, |a, b| Luma([a[0].min(b[0])]))
}

/// Tries single-word recognition first, then single-line if that found
/// nothing usable.
fn recognize_text<R: TextRecognizer>(
    image: &DynamicImage,
    recognizer: &mut R,
) -> Result<String> {
    let words = recognizer.recognize(image, RecognitionMode::SingleWord)?;
    let mut text = clean_text(&join_words(&words));
    if text.is_empty() {
        let words = recognizer.recognize(image, RecognitionMode::SingleLine)?;
        text = clean_text(&join_words(&words));
    }
    Ok(text)
}

fn join_words(words: &[RecognizedWord]) -> String {
    words
        .iter()
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Restricts text to letters, digits, space, hyphen, and period, collapses
/// whitespace, and drops results too short to be a real label.
pub fn clean_text(raw: &str) -> String {
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let disallowed = DISALLOWED.get_or_init(|| Regex::new(r"[^A-Za-z0-9 .\-]").unwrap());
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());

    let text = disallowed.replace_all(raw, "");
    let text = whitespace.replace_all(&text, " ");
    let text = text.trim();
    if text.chars().count() < MIN_TEXT_LEN {
        String::new()
    } else {
        text.to_string()
    }
}
