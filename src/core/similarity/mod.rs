//! # Similarity Module
//!
//! Scores two label sets by how many label texts they share.
//!
//! ## How It Works
//! 1. Drop confidences, keep label texts in order
//! 2. Shared labels = texts of the first set that occur anywhere in the second
//!    (duplicates in the first set are each counted)
//! 3. percentage = shared / (total_a + total_b - shared) * 100
//!
//! Two empty sets score 0 with no shared labels.
//!
//! ## Levels
//! | Percentage | Level     |
//! |------------|-----------|
//! | 100        | Identical |
//! | 60-99      | High      |
//! | 30-59      | Moderate  |
//! | >0-29      | Low       |
//! | 0          | Unrelated |

use crate::core::labels::LabelSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Outcome of comparing two label sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Similarity as a percentage (0-100)
    pub percentage: f64,
    /// Texts of the first set also found in the second, in the first set's order
    pub shared_labels: Vec<String>,
}

impl SimilarityResult {
    /// The result for two sets with nothing in common (or nothing at all)
    pub fn none() -> Self {
        Self {
            percentage: 0.0,
            shared_labels: Vec::new(),
        }
    }

    pub fn shared_count(&self) -> usize {
        self.shared_labels.len()
    }

    pub fn level(&self) -> SimilarityLevel {
        SimilarityLevel::from_percentage(self.percentage)
    }

    /// True when at least one label is shared
    pub fn is_match(&self) -> bool {
        !self.shared_labels.is_empty()
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!("Two Pictures similarity is {:.1} %", self.percentage)
    }
}

/// Coarse classification of a similarity percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityLevel {
    Identical,
    High,
    Moderate,
    Low,
    Unrelated,
}

impl SimilarityLevel {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            SimilarityLevel::Identical
        } else if percentage >= 60.0 {
            SimilarityLevel::High
        } else if percentage >= 30.0 {
            SimilarityLevel::Moderate
        } else if percentage > 0.0 {
            SimilarityLevel::Low
        } else {
            SimilarityLevel::Unrelated
        }
    }
}

impl std::fmt::Display for SimilarityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityLevel::Identical => write!(f, "Identical labels"),
            SimilarityLevel::High => write!(f, "Highly similar"),
            SimilarityLevel::Moderate => write!(f, "Somewhat similar"),
            SimilarityLevel::Low => write!(f, "Slightly similar"),
            SimilarityLevel::Unrelated => write!(f, "Nothing in common"),
        }
    }
}

/// Compare two label sets.
///
/// Duplicate texts in `a` are each counted, so the raw ratio can exceed 100
/// (`[x, x, x]` against `[x]` is 3 / 1). The percentage is capped at 100;
/// `shared_labels` still lists every duplicate.
pub fn compare(a: &LabelSet, b: &LabelSet) -> SimilarityResult {
    let texts_a: Vec<&str> = a.texts().collect();
    let texts_b: Vec<&str> = b.texts().collect();
    compare_texts(&texts_a, &texts_b)
}

/// Compare two sequences of label texts.
pub fn compare_texts(texts_a: &[&str], texts_b: &[&str]) -> SimilarityResult {
    let in_b: HashSet<&str> = texts_b.iter().copied().collect();

    let shared_labels: Vec<String> = texts_a
        .iter()
        .filter(|text| in_b.contains(*text))
        .map(|text| {
            debug!(label = %text, "Shared label");
            text.to_string()
        })
        .collect();

    let common = shared_labels.len();
    // `common <= texts_a.len()`, so this cannot underflow
    let union = texts_a.len() + texts_b.len() - common;

    if union == 0 {
        return SimilarityResult::none();
    }

    // Duplicates in `texts_a` can push the raw ratio past 1
    let percentage = (common as f64 / union as f64 * 100.0).min(100.0);

    SimilarityResult {
        percentage,
        shared_labels,
    }
}
