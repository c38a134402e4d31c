use serde::Serialize;

use crate::grid::{GridPosition, GridShape};

/// What activating a button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonType {
    Speak,
    Navigate,
    Action,
    Wordlist,
    Command,
}

/// Visual properties of a button.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ButtonStyle {
    pub font_color: Option<String>,
    /// Background color as `#rrggbb`.
    pub body_color: Option<String>,
    pub border_color: Option<String>,
}

/// One button on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub button_type: ButtonType,
    pub position: GridPosition,
    pub vocalization: Option<String>,
    pub style: ButtonStyle,
}

impl Button {
    /// A speak button at a grid position. Reconstructed cells are always
    /// speak buttons, since navigation cannot be inferred from pixels.
    pub fn speak(id: impl Into<String>, label: impl Into<String>, position: GridPosition) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            button_type: ButtonType::Speak,
            position,
            vocalization: None,
            style: ButtonStyle::default(),
        }
    }

    pub fn with_body_color(mut self, color: impl Into<String>) -> Self {
        self.style.body_color = Some(color.into());
        self
    }
}

/// One board page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub id: String,
    pub name: String,
    pub grid_size: GridShape,
    pub buttons: Vec<Button>,
}

impl Page {
    pub fn new(id: impl Into<String>, name: impl Into<String>, grid_size: GridShape) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            grid_size,
            buttons: Vec::new(),
        }
    }
}

/// Container for pages; the first added page becomes the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tree {
    pub pages: Vec<Page>,
    pub root_id: Option<String>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, page: Page) {
        if self.root_id.is_none() {
            self.root_id = Some(page.id.clone());
        }
        self.pages.push(page);
    }

    pub fn root(&self) -> Option<&Page> {
        let root_id = self.root_id.as_ref()?;
        self.pages.iter().find(|page| &page.id == root_id)
    }
}
