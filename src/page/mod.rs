//! Page synthesis from screenshots.
//!
//! This module provides:
//! - The [`ScreenshotProcessor`] entry point
//! - Grid-first page assembly (`synthesizer`)

pub mod synthesizer;

pub use synthesizer::{PageOptions, ScreenshotProcessor, load_image};
