//! Event type definitions for progress reporting.

use crate::core::comparison::ImageSlot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All events emitted while a comparison round runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Round-level events
    Round(RoundEvent),
    /// Decoding and resizing events
    Preprocess(PreprocessEvent),
    /// Label extraction events
    Extract(ExtractEvent),
    /// Similarity computation events
    Compare(CompareEvent),
}

/// Round-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoundEvent {
    /// A round has started comparing its two images
    Started { round_id: Uuid },
    /// The round moved to a new phase
    PhaseChanged { phase: RoundPhase },
    /// The round produced a similarity result
    Completed { summary: RoundSummary },
    /// The round failed and yields no result
    Failed {
        slot: Option<ImageSlot>,
        message: String,
    },
    /// The caller reset the round
    Reset { generation: u64 },
}

/// Events while preparing an image for labeling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PreprocessEvent {
    /// Decoding has started
    Started { slot: ImageSlot, reference: String },
    /// The image was decoded and scaled
    Resized {
        slot: ImageSlot,
        original: (u32, u32),
        resized: (u32, u32),
    },
}

/// Events from the label extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExtractEvent {
    /// Extraction has started for one image
    Started { slot: ImageSlot, extractor: String },
    /// Extraction finished
    Completed { slot: ImageSlot, label_count: usize },
    /// Extraction failed; the round stops here
    Failed { slot: ImageSlot, message: String },
}

/// Events from the similarity engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompareEvent {
    /// A label present in both images
    SharedLabel { text: String },
    /// Similarity computed
    Completed {
        percentage: f64,
        shared_count: usize,
    },
}

/// Phases of a comparison round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    AwaitingFirstImage,
    AwaitingSecondImage,
    Comparing,
    Done,
}

/// Summary of a finished round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Similarity as a percentage (0-100)
    pub percentage: f64,
    /// Number of shared labels (duplicates counted)
    pub shared_count: usize,
    /// Labels found on the first image
    pub labels_first: usize,
    /// Labels found on the second image
    pub labels_second: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundPhase::AwaitingFirstImage => write!(f, "Waiting for first image"),
            RoundPhase::AwaitingSecondImage => write!(f, "Waiting for second image"),
            RoundPhase::Comparing => write!(f, "Comparing"),
            RoundPhase::Done => write!(f, "Done"),
        }
    }
}
