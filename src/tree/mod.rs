//! Shared page/button tree produced by the pipeline.
//!
//! This is the interface boundary toward format adapters and viewers: the
//! reconstruction pipeline only ever creates these values, it never reads
//! them back.

pub mod structure;

pub use structure::{Button, ButtonStyle, ButtonType, Page, Tree};
