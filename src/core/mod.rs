//! # Core Module
//!
//! The UI-agnostic comparison engine.
//!
//! ## Modules
//! - `preprocess` - Decodes and scales images for labeling
//! - `labels` - Label types and the extractor boundary
//! - `similarity` - Scores two label sets
//! - `comparison` - Sequences a full comparison round

pub mod comparison;
pub mod labels;
pub mod preprocess;
pub mod similarity;

// Re-export commonly used types
pub use comparison::{Comparison, ComparisonReport, ComparisonRound, ImageSlot};
pub use labels::{HeuristicLabeler, Label, LabelExtractor, LabelSet};
pub use preprocess::{resize, DecodedImage, ImageReference, PreprocessConfig};
pub use similarity::{compare, SimilarityLevel, SimilarityResult};
