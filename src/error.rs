use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the reconstruction pipeline.
///
/// Only two of these abort a whole-page call: an undecodable image and a
/// hintless detection that finds nothing. Everything else in the pipeline
/// degrades per cell instead of erroring (see the `extract` module).
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load image {path}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no cells detected in image")]
    NoCellsDetected,

    #[error("invalid grid dimensions: {rows}x{cols}")]
    InvalidGridShape { rows: u32, cols: u32 },

    #[error(
        "tesseract executable not found; install tesseract-ocr or set TESSERACT_EXE to the binary"
    )]
    TesseractNotFound,

    #[error("OCR engine failed: {0}")]
    Ocr(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid hint table: {0}")]
    HintTable(#[from] serde_json::Error),

    #[error("{0} is not supported for screenshot sources")]
    Unsupported(&'static str),
}
