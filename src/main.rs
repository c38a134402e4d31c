//! boardshot — reconstruct AAC board pages from screenshots.

use std::path::PathBuf;

use anyhow::{Context, Result};
use boardshot::debug::FileDebugSink;
use boardshot::tree::Page;
use boardshot::{
    GridHintTable, GridShape, PageOptions, ScreenshotProcessor, TesseractRecognizer, grid,
    load_image,
};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "boardshot",
    version,
    about = "Reconstruct AAC board pages from screenshots"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect grid geometry and report the resolved shape
    Detect {
        image: PathBuf,
        /// Known row count (use together with --cols)
        #[arg(long)]
        rows: Option<u32>,
        /// Known column count (use together with --rows)
        #[arg(long)]
        cols: Option<u32>,
    },
    /// List merged text regions found across the whole image
    Regions { image: PathBuf },
    /// Print the non-empty button labels
    Texts { image: PathBuf },
    /// Reconstruct a full page and print it
    Page {
        image: PathBuf,
        #[arg(long)]
        rows: Option<u32>,
        #[arg(long)]
        cols: Option<u32>,
        /// Leading detected rows to exclude (header/toolbar strip)
        #[arg(long, default_value_t = 0)]
        ignore_rows: usize,
        /// JSON hint table mapping filename patterns to grid shapes
        #[arg(long)]
        hints: Option<PathBuf>,
        /// Use the built-in legacy TouchChat filename patterns
        #[arg(long, default_value_t = false)]
        legacy_hints: bool,
        /// Write .debug.png / .text_debug.png next to the input
        #[arg(long, default_value_t = false)]
        debug_images: bool,
        /// Emit the page as JSON instead of a console rendering
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Args::parse().command {
        Command::Detect { image, rows, cols } => detect(&image, shape_from(rows, cols)),
        Command::Regions { image } => regions(&image),
        Command::Texts { image } => texts(&image),
        Command::Page {
            image,
            rows,
            cols,
            ignore_rows,
            hints,
            legacy_hints,
            debug_images,
            json,
        } => page(
            &image,
            PageOptions {
                rows,
                cols,
                ignore_rows,
            },
            hints,
            legacy_hints,
            debug_images,
            json,
        ),
    }
}

fn shape_from(rows: Option<u32>, cols: Option<u32>) -> Option<GridShape> {
    match (rows, cols) {
        (Some(rows), Some(cols)) => Some(GridShape::new(rows, cols)),
        _ => None,
    }
}

/// Geometry only; runs without a Tesseract install.
fn detect(image: &PathBuf, hint: Option<GridShape>) -> Result<()> {
    let img = load_image(image)?;
    let detection = grid::detect_cells(&img, hint)?;

    let mut notes = String::new();
    if detection.used_fallback {
        notes.push_str(", uniform fallback");
    }
    if detection.dropped_duplicates > 0 {
        notes.push_str(&format!(
            ", {} duplicates dropped",
            detection.dropped_duplicates
        ));
    }
    println!(
        "grid: {} rows x {} cols ({} boxes{notes})",
        detection.shape.rows,
        detection.shape.cols,
        detection.boxes.len(),
    );
    for bbox in &detection.boxes {
        println!(
            "  {:>5},{:>5}  {:>4}x{:<4}",
            bbox.x, bbox.y, bbox.width, bbox.height
        );
    }
    Ok(())
}

fn regions(image: &PathBuf) -> Result<()> {
    let mut processor = build_processor()?;
    for region in processor.detect_text_regions(image)? {
        println!(
            "{:>5},{:>5}  {:>4}x{:<4}  {:.2}  {}",
            region.bbox.x,
            region.bbox.y,
            region.bbox.width,
            region.bbox.height,
            region.confidence,
            region.text
        );
    }
    Ok(())
}

fn texts(image: &PathBuf) -> Result<()> {
    let mut processor = build_processor()?;
    for label in processor.extract_texts(image)? {
        println!("{label}");
    }
    Ok(())
}

fn page(
    image: &PathBuf,
    options: PageOptions,
    hints: Option<PathBuf>,
    legacy_hints: bool,
    debug_images: bool,
    json: bool,
) -> Result<()> {
    let mut processor = build_processor()?;
    if let Some(path) = hints {
        let table = GridHintTable::from_json_file(&path)
            .with_context(|| format!("loading hint table {}", path.display()))?;
        processor = processor.with_hints(table);
    } else if legacy_hints {
        processor = processor.with_hints(GridHintTable::legacy_touchchat());
    }
    if debug_images {
        processor = processor.with_debug_sink(Box::new(FileDebugSink));
    }

    // Explicit --rows/--cols/--ignore-rows beat any filename hint.
    let page = if options.rows.is_some() || options.cols.is_some() || options.ignore_rows > 0 {
        processor.create_page_from_screenshot(image, &options)?
    } else {
        let tree = processor.load_into_tree(image)?;
        tree.pages
            .into_iter()
            .next()
            .context("tree contains no pages")?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print_page(&page);
    }
    Ok(())
}

fn build_processor() -> Result<ScreenshotProcessor<TesseractRecognizer>> {
    ScreenshotProcessor::new().context("building the OCR engine")
}

/// Console rendering of the reconstructed grid, one row per line.
fn print_page(page: &Page) {
    println!(
        "{} ({} rows x {} cols, {} buttons)",
        page.name,
        page.grid_size.rows,
        page.grid_size.cols,
        page.buttons.len()
    );
    for row in 0..page.grid_size.rows {
        let cells: Vec<String> = (0..page.grid_size.cols)
            .map(|col| {
                page.buttons
                    .iter()
                    .find(|b| b.position.row == row && b.position.col == col)
                    .map(|b| b.label.clone())
                    .unwrap_or_else(|| "-".to_string())
            })
            .collect();
        println!("  {}", cells.join(" | "));
    }
}
