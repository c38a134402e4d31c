//! Optical character recognition capability.
//!
//! This module provides:
//! - The [`TextRecognizer`] seam the rest of the pipeline consumes
//! - A Tesseract subprocess engine implementing it (`tesseract`)

pub mod tesseract;

pub use tesseract::TesseractRecognizer;

use image::DynamicImage;

use crate::Result;
use crate::grid::CellBox;

/// Page-segmentation mode requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// The region holds at most one word.
    SingleWord,
    /// The region holds one line of text.
    SingleLine,
    /// Sparse text scattered across a larger region.
    SparseText,
}

/// One recognized word with its region and normalized confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedWord {
    /// Where the word was found, in the coordinates of the recognized image.
    pub bbox: CellBox,
    pub text: String,
    /// Recognition certainty in `[0, 1]`.
    pub confidence: f32,
}

impl RecognizedWord {
    pub fn new(bbox: CellBox, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence,
        }
    }
}

/// Text recognition capability.
///
/// Engines may keep internal model state, so recognition takes `&mut self`:
/// one instance is meant to be reused across calls from a single thread, and
/// callers wanting parallelism run one instance per thread.
pub trait TextRecognizer {
    fn recognize(
        &mut self,
        image: &DynamicImage,
        mode: RecognitionMode,
    ) -> Result<Vec<RecognizedWord>>;
}
