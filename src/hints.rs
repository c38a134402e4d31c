//! Caller-supplied filename hints for known board layouts.
//!
//! Some vendors export screenshots with the cell count embedded in the file
//! name. A hint table turns those names into grid dimensions without
//! hard-coding vendor knowledge inside the detector; the table is advisory
//! and entirely owned by the caller.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::grid::GridShape;

/// One filename pattern and the grid shape it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridHint {
    /// Case-insensitive substring matched against the file stem.
    pub pattern: String,
    pub rows: u32,
    pub cols: u32,
}

/// Ordered lookup table; the first matching pattern wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridHintTable {
    pub hints: Vec<GridHint>,
}

impl GridHintTable {
    pub fn new(hints: Vec<GridHint>) -> Self {
        Self { hints }
    }

    /// Reads a table from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The historical TouchChat naming patterns: "24" implies 6x4, "60"
    /// implies 6x10. Narrow and easily fooled by unrelated digits in file
    /// names, which is why it is opt-in rather than built-in.
    pub fn legacy_touchchat() -> Self {
        Self::new(vec![
            GridHint {
                pattern: "24".to_string(),
                rows: 6,
                cols: 4,
            },
            GridHint {
                pattern: "60".to_string(),
                rows: 6,
                cols: 10,
            },
        ])
    }

    /// Grid shape for a file, matching patterns against the lowercased file
    /// stem.
    pub fn lookup(&self, path: &Path) -> Option<GridShape> {
        let stem = path.file_stem()?.to_str()?.to_ascii_lowercase();
        self.hints
            .iter()
            .find(|hint| stem.contains(&hint.pattern.to_ascii_lowercase()))
            .map(|hint| GridShape::new(hint.rows, hint.cols))
    }
}
