//! # CLI Module
//!
//! Command-line front end: picks two images, runs one comparison round and
//! prints the result.
//!
//! ## Usage
//! ```bash
//! # Compare two photos
//! label-compare compare beach.jpg coast.jpg
//!
//! # Stricter labeling, JSON output
//! label-compare compare beach.jpg coast.jpg --min-confidence 0.7 --output json
//!
//! # Show the labels of one photo
//! label-compare labels beach.jpg --verbose
//!
//! # Write the preprocessed preview
//! label-compare resize beach.jpg preview.png --max-width 400 --max-height 300
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use image::{DynamicImage, ImageFormat};
use indicatif::{ProgressBar, ProgressStyle};
use label_similarity::core::comparison::{
    Comparison, ComparisonReport, ComparisonRound, ImageLabels, RoundOutcome,
};
use label_similarity::core::labels::HeuristicLabeler;
use label_similarity::core::preprocess::{resize, ImageReference};
use label_similarity::error::{LabelCompareError, Result};
use label_similarity::events::{Event, EventChannel, ExtractEvent, PreprocessEvent, RoundEvent};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Label Similarity - compare photos by what is in them
#[derive(Parser, Debug)]
#[command(name = "label-compare")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two images by their labels
    Compare {
        /// First image
        first: PathBuf,

        /// Second image
        second: PathBuf,

        #[command(flatten)]
        preview: PreviewArgs,

        /// Minimum confidence for a label to count (0-1)
        #[arg(long, default_value = "0.5")]
        min_confidence: f32,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the labels found on one image
    Labels {
        /// Image to label
        image: PathBuf,

        #[command(flatten)]
        preview: PreviewArgs,

        /// Minimum confidence for a label to be shown (0-1)
        #[arg(long, default_value = "0.5")]
        min_confidence: f32,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write the preprocessed (resized) version of an image
    Resize {
        /// Source image
        image: PathBuf,

        /// Destination file; the format follows the extension
        destination: PathBuf,

        #[command(flatten)]
        preview: PreviewArgs,
    },
}

/// Bounds images are scaled to before labeling
#[derive(Args, Debug, Clone, Copy)]
struct PreviewArgs {
    /// Maximum width in pixels
    #[arg(long, default_value = "800")]
    max_width: u32,

    /// Maximum height in pixels
    #[arg(long, default_value = "600")]
    max_height: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (percentage and shared labels)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Compare { verbose, .. } | Commands::Labels { verbose, .. } => *verbose,
        Commands::Resize { .. } => false,
    };
    label_similarity::init_tracing(verbose);

    match cli.command {
        Commands::Compare {
            first,
            second,
            preview,
            min_confidence,
            output,
            verbose,
        } => run_compare(first, second, preview, min_confidence, output, verbose),
        Commands::Labels {
            image,
            preview,
            min_confidence,
            output,
            verbose,
        } => run_labels(image, preview, min_confidence, output, verbose),
        Commands::Resize {
            image,
            destination,
            preview,
        } => run_resize(image, destination, preview),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| LabelCompareError::Runtime(e.to_string()))
}

fn run_compare(
    first: PathBuf,
    second: PathBuf,
    preview: PreviewArgs,
    min_confidence: f32,
    output: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Label Similarity").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let comparison = Comparison::builder(HeuristicLabeler::new(min_confidence))
        .max_width(preview.max_width)
        .max_height(preview.max_height)
        .build();

    let mut round = ComparisonRound::new();
    round.select(ImageReference::from_path(first))?;
    round.select(ImageReference::from_path(second))?;

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Preprocess(PreprocessEvent::Started { slot, reference }) => {
                    pb.set_message(format!("Preparing {} ({})", slot, reference));
                }
                Event::Extract(ExtractEvent::Started { slot, extractor }) => {
                    pb.set_message(format!("Labeling {} with {}", slot, extractor));
                }
                Event::Round(RoundEvent::Completed { .. }) | Event::Round(RoundEvent::Failed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = runtime()?.block_on(comparison.drive(&mut round, &sender));

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    match result? {
        RoundOutcome::Compared(report) => {
            match output {
                OutputFormat::Pretty => print_pretty_report(&term, report, verbose),
                OutputFormat::Json => print_json(report)?,
                OutputFormat::Minimal => print_minimal_report(report),
            }
            Ok(())
        }
        RoundOutcome::Failed { message, .. } => Err(LabelCompareError::RoundFailed {
            message: message.clone(),
        }),
    }
}

fn run_labels(
    image: PathBuf,
    preview: PreviewArgs,
    min_confidence: f32,
    output: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let comparison = Comparison::builder(HeuristicLabeler::new(min_confidence))
        .max_width(preview.max_width)
        .max_height(preview.max_height)
        .build();

    let reference = ImageReference::from_path(image);
    let labels = runtime()?.block_on(comparison.label(&reference))?;

    match output {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            print_pretty_labels(&term, &labels, verbose);
        }
        OutputFormat::Json => print_json(&labels)?,
        OutputFormat::Minimal => {
            for text in labels.labels.texts() {
                println!("{}", text);
            }
        }
    }

    Ok(())
}

fn run_resize(image: PathBuf, destination: PathBuf, preview: PreviewArgs) -> Result<()> {
    let reference = ImageReference::from_path(image);
    let decoded = resize(&reference, preview.max_width, preview.max_height)?;
    let (width, height) = decoded.dimensions();

    save_image(decoded.into_dynamic(), &destination)?;

    println!("{} ({}x{})", destination.display(), width, height);
    Ok(())
}

fn save_image(image: DynamicImage, destination: &Path) -> Result<()> {
    // JPEG has no alpha channel
    let image = match ImageFormat::from_path(destination) {
        Ok(ImageFormat::Jpeg) => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };

    image
        .save(destination)
        .map_err(|e| LabelCompareError::Output {
            path: destination.to_path_buf(),
            reason: e.to_string(),
        })
}

fn print_pretty_report(term: &Term, report: &ComparisonReport, verbose: bool) {
    let result = &report.result;

    term.write_line(&format!(
        "{} Comparison Complete",
        style("✓").green().bold()
    ))
    .ok();
    term.write_line("").ok();

    for (name, image) in [("First", &report.first), ("Second", &report.second)] {
        term.write_line(&format!(
            "  {} {} ({}x{}), {} labels",
            style(format!("{}:", name)).bold(),
            image.reference,
            image.original_size.0,
            image.original_size.1,
            style(image.labels.len()).cyan()
        ))
        .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "  {} {}",
        style(result.summary()).bold(),
        style(format!("({})", result.level())).yellow()
    ))
    .ok();

    if result.shared_labels.is_empty() {
        term.write_line(&format!("  {}", style("No shared labels").dim()))
            .ok();
    } else {
        term.write_line(&format!(
            "  Shared labels: {}",
            style(result.shared_labels.join(", ")).green()
        ))
        .ok();
    }

    if verbose {
        term.write_line("").ok();
        print_pretty_labels(term, &report.first, true);
        print_pretty_labels(term, &report.second, true);
        term.write_line(&format!(
            "  {}",
            style(format!("Round {} took {} ms", report.round_id, report.duration_ms)).dim()
        ))
        .ok();
    }
}

fn print_pretty_labels(term: &Term, image: &ImageLabels, verbose: bool) {
    term.write_line(&format!(
        "{} {}",
        style("Labels for").bold(),
        style(&image.reference).underlined()
    ))
    .ok();

    if verbose {
        term.write_line(&format!(
            "  {}",
            style(format!(
                "{}x{} scaled to {}x{}",
                image.original_size.0,
                image.original_size.1,
                image.resized_size.0,
                image.resized_size.1
            ))
            .dim()
        ))
        .ok();
    }

    if image.labels.is_empty() {
        term.write_line(&format!("  {}", style("(none)").dim())).ok();
    }

    for label in &image.labels {
        term.write_line(&format!(
            "  {:<12} {}",
            label.text(),
            style(format!("{:.0}%", label.confidence() * 100.0)).dim()
        ))
        .ok();
    }

    term.write_line("").ok();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| LabelCompareError::Output {
        path: PathBuf::from("<stdout>"),
        reason: e.to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn print_minimal_report(report: &ComparisonReport) {
    println!("{:.1}", report.result.percentage);
    for text in &report.result.shared_labels {
        println!("{}", text);
    }
}
