//! Shared fixtures: a scripted recognizer and a recording debug sink.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use boardshot::debug::{DebugSink, RegionAnnotation};
use boardshot::{CellBox, RecognitionMode, RecognizedWord, Result, TextRecognizer};
use image::RgbImage;

/// Recognizer that replays scripted responses in call order.
pub struct ScriptedRecognizer {
    responses: VecDeque<Vec<RecognizedWord>>,
}

impl ScriptedRecognizer {
    pub fn new(responses: Vec<Vec<RecognizedWord>>) -> Self {
        Self {
            responses: responses.into(),
        }
    }

    /// One single-word response per expected cell, in row-major order.
    pub fn one_word_per_cell(words: &[&str]) -> Self {
        Self::new(
            words
                .iter()
                .map(|word| vec![RecognizedWord::new(CellBox::new(5, 5, 40, 16), *word, 0.9)])
                .collect(),
        )
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(
        &mut self,
        _image: &image::DynamicImage,
        _mode: RecognitionMode,
    ) -> Result<Vec<RecognizedWord>> {
        Ok(self.responses.pop_front().unwrap_or_default())
    }
}

/// What a sink call reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Grid { source: PathBuf, boxes: usize },
    Cells { labeled: usize, total: usize },
    Duplicates(usize),
}

/// Sink that records its calls for assertions; clones share the event log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl DebugSink for RecordingSink {
    fn grid_detected(&self, _image: &RgbImage, source: &Path, boxes: &[CellBox]) {
        self.events.lock().unwrap().push(SinkEvent::Grid {
            source: source.to_path_buf(),
            boxes: boxes.len(),
        });
    }

    fn cells_searched(&self, _image: &RgbImage, _source: &Path, annotations: &[RegionAnnotation]) {
        let labeled = annotations.iter().filter(|a| a.label.is_some()).count();
        self.events.lock().unwrap().push(SinkEvent::Cells {
            labeled,
            total: annotations.len(),
        });
    }

    fn duplicates_dropped(&self, _source: &Path, count: usize) {
        self.events.lock().unwrap().push(SinkEvent::Duplicates(count));
    }
}
