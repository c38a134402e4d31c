//! Cell content and text region extraction.
//!
//! This module provides:
//! - Per-cell text/color extraction with binarization preprocessing (`cell`)
//! - Whole-image text detection with fragment merging (`merge`)

pub mod cell;
pub mod merge;

pub use cell::{CellContent, clean_text, detect_cell_content, mean_color};
pub use merge::{TextRegion, detect_text_regions, merge_nearby_regions};
