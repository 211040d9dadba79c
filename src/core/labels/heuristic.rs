//! Heuristic labeling from pixel statistics.
//!
//! Produces colour names, brightness, colourfulness, detail, sky and
//! orientation tags. It is deterministic and needs no model files, which
//! makes it a stand-in for a real labeling model in the CLI and in tests.

use super::{Label, LabelExtractor, LabelSet};
use crate::core::preprocess::DecodedImage;
use crate::error::ExtractionError;
use image::RgbaImage;
use rayon::prelude::*;

/// Minimum confidence a label needs to be reported by default
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Pixels with saturation and value at or above these count as coloured
const MIN_SATURATION: f32 = 0.25;
const MIN_VALUE: f32 = 0.2;

/// Mean horizontal luma gradient treated as fully "detailed"
const DETAIL_GRADIENT: f64 = 32.0;

/// Hue buckets in degrees, in reporting order
const HUES: [(&str, f32, f32); 8] = [
    ("Red", 345.0, 15.0),
    ("Orange", 15.0, 45.0),
    ("Yellow", 45.0, 70.0),
    ("Green", 70.0, 165.0),
    ("Cyan", 165.0, 195.0),
    ("Blue", 195.0, 255.0),
    ("Purple", 255.0, 290.0),
    ("Pink", 290.0, 345.0),
];

/// Per-image pixel statistics, summed across rows
#[derive(Debug, Clone, Default)]
struct PixelStats {
    pixels: u64,
    luma_sum: f64,
    gradient_sum: f64,
    gradient_count: u64,
    colored: u64,
    hue_counts: [u64; 8],
    top_pixels: u64,
    top_sky: u64,
}

impl PixelStats {
    fn merge(mut self, other: PixelStats) -> PixelStats {
        self.pixels += other.pixels;
        self.luma_sum += other.luma_sum;
        self.gradient_sum += other.gradient_sum;
        self.gradient_count += other.gradient_count;
        self.colored += other.colored;
        for (mine, theirs) in self.hue_counts.iter_mut().zip(other.hue_counts) {
            *mine += theirs;
        }
        self.top_pixels += other.top_pixels;
        self.top_sky += other.top_sky;
        self
    }

    fn fraction(&self, count: u64) -> f32 {
        if self.pixels == 0 {
            0.0
        } else {
            count as f32 / self.pixels as f32
        }
    }
}

/// Labels images from colour and texture statistics
#[derive(Debug, Clone)]
pub struct HeuristicLabeler {
    min_confidence: f32,
}

impl HeuristicLabeler {
    /// Create a labeler reporting labels with confidence >= `min_confidence`
    pub fn new(min_confidence: f32) -> Self {
        Self {
            min_confidence: min_confidence.clamp(0.0, 1.0),
        }
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// Label an image synchronously.
    ///
    /// Labels are sorted by descending confidence; ties keep reporting order.
    pub fn label(&self, image: &DecodedImage) -> LabelSet {
        let stats = collect_stats(image.pixels());
        let (original_width, original_height) = image.original_dimensions();

        let mut labels = Vec::with_capacity(16);

        for ((name, _, _), count) in HUES.iter().zip(stats.hue_counts) {
            labels.push(Label::new(*name, stats.fraction(count)));
        }

        let colorful = stats.fraction(stats.colored);
        labels.push(Label::new("Colorful", colorful));
        labels.push(Label::new("Monochrome", 1.0 - colorful));

        let brightness = if stats.pixels == 0 {
            0.0
        } else {
            (stats.luma_sum / stats.pixels as f64 / 255.0) as f32
        };
        labels.push(Label::new("Bright", brightness));
        labels.push(Label::new("Dark", 1.0 - brightness));

        let detail = if stats.gradient_count == 0 {
            0.0
        } else {
            (stats.gradient_sum / stats.gradient_count as f64 / DETAIL_GRADIENT).min(1.0) as f32
        };
        labels.push(Label::new("Detailed", detail));
        labels.push(Label::new("Smooth", 1.0 - detail));

        if stats.top_pixels > 0 {
            labels.push(Label::new(
                "Sky",
                stats.top_sky as f32 / stats.top_pixels as f32,
            ));
        }

        let orientation = match original_width.cmp(&original_height) {
            std::cmp::Ordering::Greater => "Wide",
            std::cmp::Ordering::Less => "Tall",
            std::cmp::Ordering::Equal => "Square",
        };
        labels.push(Label::new(orientation, 1.0));

        labels.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));

        LabelSet::new(labels).above(self.min_confidence)
    }
}

impl Default for HeuristicLabeler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

impl LabelExtractor for HeuristicLabeler {
    async fn extract_labels(&self, image: &DecodedImage) -> Result<LabelSet, ExtractionError> {
        let labeler = self.clone();
        let image = image.clone();

        tokio::task::spawn_blocking(move || labeler.label(&image))
            .await
            .map_err(|e| ExtractionError::Interrupted(e.to_string()))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

fn collect_stats(pixels: &RgbaImage) -> PixelStats {
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return PixelStats::default();
    }

    let row_len = width as usize * 4;
    let top_rows = (height as usize).div_ceil(3);

    pixels
        .as_raw()
        .par_chunks(row_len)
        .enumerate()
        .map(|(y, row)| row_stats(row, y < top_rows))
        .reduce(PixelStats::default, PixelStats::merge)
}

fn row_stats(row: &[u8], in_top_third: bool) -> PixelStats {
    let mut stats = PixelStats::default();
    let mut previous_luma: Option<f64> = None;

    for pixel in row.chunks_exact(4) {
        let (r, g, b) = (pixel[0], pixel[1], pixel[2]);
        let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;

        stats.pixels += 1;
        stats.luma_sum += luma;

        if let Some(previous) = previous_luma {
            stats.gradient_sum += (luma - previous).abs();
            stats.gradient_count += 1;
        }
        previous_luma = Some(luma);

        let (hue, saturation, value) = rgb_to_hsv(r, g, b);
        let colored = saturation >= MIN_SATURATION && value >= MIN_VALUE;
        let bucket = if colored { Some(hue_bucket(hue)) } else { None };

        if let Some(bucket) = bucket {
            stats.colored += 1;
            stats.hue_counts[bucket] += 1;
        }

        if in_top_third {
            stats.top_pixels += 1;
            // Blue or cyan, and not in shadow
            if matches!(bucket, Some(4) | Some(5)) && value >= 0.5 {
                stats.top_sky += 1;
            }
        }
    }

    stats
}

/// Hue in degrees [0, 360), saturation and value in [0, 1]
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    (hue, saturation, max)
}

fn hue_bucket(hue: f32) -> usize {
    HUES.iter()
        .position(|(_, start, end)| {
            if start > end {
                hue >= *start || hue < *end
            } else {
                hue >= *start && hue < *end
            }
        })
        .unwrap_or(0)
}
