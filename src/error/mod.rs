//! # Error Module
//!
//! User-friendly error types for label-based photo comparison.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - which image, which reference, what went wrong
//! - **Scoped to a round** - nothing here is fatal to the process

use crate::core::comparison::ImageSlot;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum LabelCompareError {
    #[error("Could not prepare {slot}: {source}")]
    Decode {
        slot: ImageSlot,
        #[source]
        source: DecodeError,
    },

    #[error("Labeling failed for {slot}: {source}")]
    Extraction {
        slot: ImageSlot,
        #[source]
        source: ExtractionError,
    },

    #[error("Preprocessing error: {0}")]
    Preprocess(#[from] DecodeError),

    #[error("Labeling error: {0}")]
    Label(#[from] ExtractionError),

    #[error("Round error: {0}")]
    Round(#[from] RoundError),

    #[error("Comparison failed: {message}")]
    RoundFailed { message: String },

    #[error("Failed to write {path}: {reason}")]
    Output { path: PathBuf, reason: String },

    #[error("Async runtime error: {0}")]
    Runtime(String),
}

impl LabelCompareError {
    /// The image a failure belongs to, if it belongs to one
    pub fn slot(&self) -> Option<ImageSlot> {
        match self {
            LabelCompareError::Decode { slot, .. } | LabelCompareError::Extraction { slot, .. } => {
                Some(*slot)
            }
            _ => None,
        }
    }
}

/// Errors that occur while loading, decoding or resizing an image
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Image not found: {reference}")]
    NotFound { reference: String },

    #[error("Failed to read image {reference}: {source}")]
    Io {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image is empty: {reference}")]
    Empty { reference: String },

    #[error("Unsupported image format: {reference}")]
    UnsupportedFormat { reference: String },

    #[error("Failed to decode image {reference}: {reason}")]
    Corrupt { reference: String, reason: String },

    #[error("Invalid target size {width}x{height} (must be at least 1x1 and fit a 512 MiB buffer)")]
    InvalidTarget { width: u32, height: u32 },

    #[error("Resize failed: {0}")]
    ResizeFailed(String),
}

/// Errors reported by a label extractor
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Label extractor '{extractor}' failed: {reason}")]
    Failed { extractor: String, reason: String },

    #[error("Label extractor '{extractor}' is unavailable: {reason}")]
    Unavailable { extractor: String, reason: String },

    #[error("Labeling task was interrupted: {0}")]
    Interrupted(String),
}

/// Errors from driving the comparison state machine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    #[error("Both images are already selected. Reset to start a new comparison.")]
    SlotsFull,

    #[error("Round is not ready to compare (needs two selected images)")]
    NotReady,

    #[error("Stale result for generation {got} ignored (current generation is {current})")]
    Stale { got: u64, current: u64 },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, LabelCompareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_includes_reference() {
        let error = DecodeError::Corrupt {
            reference: "/photos/broken.jpg".to_string(),
            reason: "invalid JPEG".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/broken.jpg"));
        assert!(message.contains("invalid JPEG"));
    }

    #[test]
    fn extraction_error_names_slot() {
        let error = LabelCompareError::Extraction {
            slot: ImageSlot::Second,
            source: ExtractionError::Failed {
                extractor: "heuristic".to_string(),
                reason: "model crashed".to_string(),
            },
        };
        let message = error.to_string();
        assert!(message.contains("second image"));
        assert!(message.contains("model crashed"));
        assert_eq!(error.slot(), Some(ImageSlot::Second));
    }

    #[test]
    fn slots_full_suggests_recovery() {
        let message = RoundError::SlotsFull.to_string();
        assert!(message.contains("Reset"));
    }

    #[test]
    fn round_errors_have_no_slot() {
        let error = LabelCompareError::from(RoundError::NotReady);
        assert_eq!(error.slot(), None);
    }
}
