//! Reconstruct AAC board pages from screenshots.
//!
//! Given only a raster image of an Augmentative-and-Alternative-Communication
//! grid board (a photo or screen capture, with no structured source data),
//! this crate recovers the page's grid geometry, locates each cell, and
//! extracts its label text and background color, assembling the result into a
//! [`tree::Page`] inside a [`tree::Tree`].
//!
//! The pipeline, bottom to top:
//! - [`grid`] finds candidate cell boxes and resolves logical rows/columns
//! - [`ocr`] is the text-recognition seam (Tesseract subprocess by default)
//! - [`extract`] pulls text and color out of cells and whole-image regions
//! - [`page`] orchestrates everything into a page of speak buttons
//!
//! [`ScreenshotProcessor`] is the entry point; it is generic over the
//! recognition engine so tests can script recognition instead of shelling out
//! to Tesseract.

pub mod debug;
pub mod error;
pub mod extract;
pub mod grid;
pub mod hints;
pub mod ocr;
pub mod page;
pub mod tree;

pub use error::Error;
pub use grid::{CellBox, GridDetection, GridPosition, GridShape};
pub use hints::{GridHint, GridHintTable};
pub use ocr::{RecognitionMode, RecognizedWord, TesseractRecognizer, TextRecognizer};
pub use page::{PageOptions, ScreenshotProcessor, load_image};

/// Crate-wide result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
