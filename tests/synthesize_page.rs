//! End-to-end page synthesis against scripted recognition.
//!
//! The synthetic board is a 4x3 grid of solid-colored blocks; the scripted
//! recognizer stands in for the OCR engine, so these tests exercise the full
//! geometry/orchestration path without a Tesseract install.

mod common;

use std::path::PathBuf;

use boardshot::tree::ButtonType;
use boardshot::{Error, GridShape, PageOptions, ScreenshotProcessor};
use common::{RecordingSink, ScriptedRecognizer, SinkEvent};
use image::{Rgb, RgbImage};
use pretty_assertions::assert_eq;
use regex::Regex;
use tempfile::TempDir;

const WORDS: [&str; 12] = [
    "want", "more", "stop", "help", "yes", "no", "eat", "drink", "play", "go", "finished", "toilet",
];

/// 300x400 board: 4 rows x 3 cols of solid 100x100 blocks in alternating
/// colors, saved to a temp dir.
fn write_board(dir: &TempDir) -> PathBuf {
    let mut img = RgbImage::new(300, 400);
    let palette = [
        Rgb([220, 60, 60]),
        Rgb([60, 180, 90]),
        Rgb([70, 90, 220]),
        Rgb([230, 200, 80]),
    ];
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let col = x / 100;
        let row = y / 100;
        *pixel = palette[((row + col) % 4) as usize];
    }
    let path = dir.path().join("board.png");
    img.save(&path).unwrap();
    path
}

fn write_blank(dir: &TempDir, name: &str) -> PathBuf {
    let img = RgbImage::from_pixel(300, 400, Rgb([255, 255, 255]));
    let path = dir.path().join(name);
    img.save(&path).unwrap();
    path
}

fn four_by_three() -> PageOptions {
    PageOptions {
        rows: Some(4),
        cols: Some(3),
        ignore_rows: 0,
    }
}

#[test]
fn synthesizes_all_twelve_buttons_in_row_major_order() {
    let dir = TempDir::new().unwrap();
    let path = write_board(&dir);

    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::one_word_per_cell(&WORDS));
    let page = processor
        .create_page_from_screenshot(&path, &four_by_three())
        .unwrap();

    assert_eq!(page.grid_size, GridShape::new(4, 3));
    assert_eq!(page.buttons.len(), 12);

    let labels: Vec<&str> = page.buttons.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, WORDS.to_vec());

    for (index, button) in page.buttons.iter().enumerate() {
        assert_eq!(button.position.row, index as u32 / 3);
        assert_eq!(button.position.col, index as u32 % 3);
        assert_eq!(button.button_type, ButtonType::Speak);
    }
}

#[test]
fn button_positions_are_unique_and_inside_the_grid() {
    let dir = TempDir::new().unwrap();
    let path = write_board(&dir);

    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::one_word_per_cell(&WORDS));
    let page = processor
        .create_page_from_screenshot(&path, &four_by_three())
        .unwrap();

    let mut seen = std::collections::HashSet::new();
    for button in &page.buttons {
        assert!(button.position.row < page.grid_size.rows);
        assert!(button.position.col < page.grid_size.cols);
        assert!(seen.insert(button.position), "duplicate {:?}", button.position);
    }
}

#[test]
fn body_colors_are_lowercase_hex() {
    let dir = TempDir::new().unwrap();
    let path = write_board(&dir);

    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::one_word_per_cell(&WORDS));
    let page = processor
        .create_page_from_screenshot(&path, &four_by_three())
        .unwrap();

    let hex = Regex::new(r"^#[0-9a-f]{6}$").unwrap();
    for button in &page.buttons {
        let color = button.style.body_color.as_deref().unwrap();
        assert!(hex.is_match(color), "bad color {color}");
    }
}

#[test]
fn labels_are_clean_even_when_recognition_is_noisy() {
    let dir = TempDir::new().unwrap();
    let path = write_blank(&dir, "noisy.png");

    let noisy: Vec<&str> = vec!["  wa!!ter ", "mo@re", "st op"];
    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::one_word_per_cell(&noisy));
    let page = processor
        .create_page_from_screenshot(
            &path,
            &PageOptions {
                rows: Some(1),
                cols: Some(3),
                ignore_rows: 0,
            },
        )
        .unwrap();

    let allowed = Regex::new(r"^[A-Za-z0-9 .\-]+$").unwrap();
    assert_eq!(page.buttons.len(), 3);
    for button in &page.buttons {
        assert!(allowed.is_match(&button.label), "dirty {:?}", button.label);
        assert_eq!(button.label, button.label.trim());
        assert!(!button.label.contains("  "));
    }
    assert_eq!(page.buttons[0].label, "water");
}

#[test]
fn empty_cells_contribute_no_button() {
    let dir = TempDir::new().unwrap();
    let path = write_blank(&dir, "sparse.png");

    // Cells 1 and 3 recognize nothing.
    let responses = vec![
        vec![boardshot::RecognizedWord::new(
            boardshot::CellBox::new(5, 5, 40, 16),
            "yes",
            0.9,
        )],
        vec![],
        vec![boardshot::RecognizedWord::new(
            boardshot::CellBox::new(5, 5, 40, 16),
            "no",
            0.9,
        )],
        vec![],
    ];
    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::new(responses));
    let page = processor
        .create_page_from_screenshot(
            &path,
            &PageOptions {
                rows: Some(2),
                cols: Some(2),
                ignore_rows: 0,
            },
        )
        .unwrap();

    assert_eq!(page.buttons.len(), 2);
    assert_eq!(page.buttons[0].label, "yes");
    assert_eq!(page.buttons[1].label, "no");
}

#[test]
fn low_confidence_and_menu_fragments_are_dropped() {
    let dir = TempDir::new().unwrap();
    let path = write_blank(&dir, "filtered.png");

    let responses = vec![vec![
        boardshot::RecognizedWord::new(boardshot::CellBox::new(5, 5, 40, 16), "keep", 0.9),
        boardshot::RecognizedWord::new(boardshot::CellBox::new(5, 25, 40, 16), "faint", 0.1),
        boardshot::RecognizedWord::new(boardshot::CellBox::new(5, 45, 40, 16), "Menu", 0.95),
    ]];
    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::new(responses));
    let page = processor
        .create_page_from_screenshot(
            &path,
            &PageOptions {
                rows: Some(1),
                cols: Some(1),
                ignore_rows: 0,
            },
        )
        .unwrap();

    assert_eq!(page.buttons.len(), 1);
    assert_eq!(page.buttons[0].label, "keep");
}

#[test]
fn identical_inputs_yield_identical_pages() {
    let dir = TempDir::new().unwrap();
    let path = write_board(&dir);

    let mut first =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::one_word_per_cell(&WORDS));
    let mut second =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::one_word_per_cell(&WORDS));

    let page_a = first
        .create_page_from_screenshot(&path, &four_by_three())
        .unwrap();
    let page_b = second
        .create_page_from_screenshot(&path, &four_by_three())
        .unwrap();
    assert_eq!(page_a, page_b);
}

#[test]
fn blank_image_with_hint_never_fails_detection() {
    let dir = TempDir::new().unwrap();
    let path = write_blank(&dir, "blank.png");

    let processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::new(Vec::new()));
    let detection = processor
        .detect_grid(&path, Some(GridShape::new(4, 3)))
        .unwrap();
    assert!(detection.used_fallback);
    assert_eq!(detection.boxes.len(), 12);
}

#[test]
fn blank_image_without_hint_raises() {
    let dir = TempDir::new().unwrap();
    let path = write_blank(&dir, "blank.png");

    let processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::new(Vec::new()));
    let result = processor.detect_grid(&path, None);
    assert!(matches!(result, Err(Error::NoCellsDetected)));
}

#[test]
fn unreadable_image_reports_image_load_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.png");
    std::fs::write(&path, b"not an image").unwrap();

    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::new(Vec::new()));
    let result = processor.create_page_from_screenshot(&path, &four_by_three());
    assert!(matches!(result, Err(Error::ImageLoad { .. })));
}

#[test]
fn debug_sink_observes_detection_and_search() {
    let dir = TempDir::new().unwrap();
    let path = write_blank(&dir, "sinked.png");

    let sink = RecordingSink::default();
    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::one_word_per_cell(&WORDS))
            .with_debug_sink(Box::new(sink.clone()));
    processor
        .create_page_from_screenshot(&path, &four_by_three())
        .unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        SinkEvent::Grid {
            source: path.clone(),
            boxes: 12
        }
    );
    assert_eq!(
        events[1],
        SinkEvent::Cells {
            labeled: 12,
            total: 12
        }
    );
}

#[test]
fn load_into_tree_wraps_one_page_and_uses_hints() {
    let dir = TempDir::new().unwrap();
    let path = write_blank(&dir, "board24.png");

    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::new(Vec::new()))
            .with_hints(boardshot::GridHintTable::legacy_touchchat());
    let tree = processor.load_into_tree(&path).unwrap();

    assert_eq!(tree.pages.len(), 1);
    assert_eq!(tree.root_id.as_deref(), Some("screenshot_board24"));
    // "24" in the stem selects the 6x4 legacy layout; a blank board still
    // synthesizes a full fallback grid with no buttons.
    assert_eq!(tree.pages[0].grid_size, GridShape::new(6, 4));
    assert!(tree.pages[0].buttons.is_empty());
}

#[test]
fn save_from_tree_is_unsupported() {
    let processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::new(Vec::new()));
    let tree = boardshot::tree::Tree::new();
    let result = processor.save_from_tree(&tree, std::path::Path::new("out.png"));
    assert!(matches!(result, Err(Error::Unsupported(_))));
}

#[test]
fn extract_texts_returns_labels_only() {
    let dir = TempDir::new().unwrap();
    // A drawn grid is needed here: extract_texts runs without a hint.
    let mut img = RgbImage::from_pixel(400, 400, Rgb([255, 255, 255]));
    for row in 0..4u32 {
        for col in 0..4u32 {
            imageproc::drawing::draw_hollow_rect_mut(
                &mut img,
                imageproc::rect::Rect::at((20 + col * 100) as i32, (20 + row * 100) as i32)
                    .of_size(70, 70),
                Rgb([0, 0, 0]),
            );
        }
    }
    let path = dir.path().join("outlined.png");
    img.save(&path).unwrap();

    let words: Vec<&str> = (0..16).map(|i| if i % 2 == 0 { "word" } else { "" }).collect();
    let mut processor =
        ScreenshotProcessor::with_recognizer(ScriptedRecognizer::one_word_per_cell(&words));
    let texts = processor.extract_texts(&path).unwrap();

    assert!(!texts.is_empty());
    assert!(texts.iter().all(|label| label == "word"));
}
