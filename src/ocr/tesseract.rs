//! Tesseract subprocess engine.
//!
//! Writes the region to a temporary PNG and shells out to `tesseract` with
//! TSV output, which carries per-word geometry and confidence alongside the
//! text.

use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use tempfile::NamedTempFile;
use tracing::debug;

use super::{RecognitionMode, RecognizedWord, TextRecognizer};
use crate::Result;
use crate::error::Error;
use crate::grid::CellBox;

/// Characters the word/line modes are allowed to emit. Sparse mode runs
/// unrestricted so the region merger sees raw labels.
const CHAR_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-. ";

impl RecognitionMode {
    /// Tesseract page-segmentation mode flag value.
    fn psm(self) -> &'static str {
        match self {
            RecognitionMode::SingleWord => "8",
            RecognitionMode::SingleLine => "7",
            RecognitionMode::SparseText => "11",
        }
    }

    fn restricts_charset(self) -> bool {
        !matches!(self, RecognitionMode::SparseText)
    }
}

/// Recognizer backed by an installed Tesseract executable.
pub struct TesseractRecognizer {
    executable: PathBuf,
    language: String,
}

impl TesseractRecognizer {
    /// Locates an installed `tesseract` and builds an engine around it.
    pub fn new() -> Result<Self> {
        Ok(Self {
            executable: find_tesseract_executable()?,
            language: "eng".to_string(),
        })
    }

    /// Uses a specific executable instead of probing the system.
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            language: "eng".to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(
        &mut self,
        image: &DynamicImage,
        mode: RecognitionMode,
    ) -> Result<Vec<RecognizedWord>> {
        // Hand the region over as a file; Tesseract has no stdin image path.
        let input = NamedTempFile::with_suffix(".png")?;
        image
            .save(input.path())
            .map_err(|e| Error::Ocr(format!("failed to write OCR input: {e}")))?;

        // Tesseract appends .tsv to the output base itself.
        let output_base = NamedTempFile::new()?;
        let base = output_base.path().to_string_lossy().to_string();

        let mut command = Command::new(&self.executable);
        command
            .arg(input.path())
            .arg(&base)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(mode.psm());
        if mode.restricts_charset() {
            command
                .arg("-c")
                .arg(format!("tessedit_char_whitelist={CHAR_WHITELIST}"));
        }
        command.arg("tsv");

        let output = command.output()?;
        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let tsv_path = format!("{base}.tsv");
        let tsv = std::fs::read_to_string(&tsv_path)?;
        let _ = std::fs::remove_file(&tsv_path);

        let words = parse_tsv(&tsv);
        debug!(mode = ?mode, words = words.len(), "tesseract pass finished");
        Ok(words)
    }
}

/// Parses Tesseract TSV output, keeping level-5 (word) records.
///
/// Confidence is reported on a 0-100 scale and normalized to `[0, 1]`;
/// negative-confidence records are structural rows, not words.
fn parse_tsv(tsv: &str) -> Vec<RecognizedWord> {
    let mut words = Vec::new();

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        if conf < 0.0 {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let left: u32 = fields[6].parse().unwrap_or(0);
        let top: u32 = fields[7].parse().unwrap_or(0);
        let width: u32 = fields[8].parse().unwrap_or(0);
        let height: u32 = fields[9].parse().unwrap_or(0);
        if width == 0 || height == 0 {
            continue;
        }

        words.push(RecognizedWord::new(
            CellBox::new(left, top, width, height),
            text,
            conf / 100.0,
        ));
    }

    words
}

/// Probes for a usable `tesseract` binary: `TESSERACT_EXE` first, then the
/// PATH, then well-known install locations.
fn find_tesseract_executable() -> Result<PathBuf> {
    if let Ok(explicit) = std::env::var("TESSERACT_EXE") {
        let path = PathBuf::from(explicit);
        if path.exists() {
            return Ok(path);
        }
    }

    if probe("tesseract") {
        return Ok(PathBuf::from("tesseract"));
    }

    let mut candidates = vec![
        PathBuf::from("/usr/bin/tesseract"),
        PathBuf::from("/usr/local/bin/tesseract"),
        PathBuf::from("/opt/homebrew/bin/tesseract"),
        PathBuf::from(r"C:\Program Files\Tesseract-OCR\tesseract.exe"),
    ];
    if let Some(local) = dirs::data_local_dir() {
        candidates.push(local.join("tesseract").join("tesseract.exe"));
    }

    candidates
        .into_iter()
        .find(|path| path.exists())
        .ok_or(Error::TesseractNotFound)
}

fn probe(executable: &str) -> bool {
    Command::new(executable)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
