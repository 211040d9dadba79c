//! # Labels Module
//!
//! Descriptive tags produced by an image-labeling model.
//!
//! ## Modules
//! - `traits` - The [`LabelExtractor`] boundary any model plugs into
//! - `heuristic` - A built-in extractor based on pixel statistics

mod heuristic;
mod traits;

pub use heuristic::HeuristicLabeler;
pub use traits::LabelExtractor;

use serde::{Deserialize, Serialize};

/// A text tag with the model's confidence, in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    text: String,
    confidence: f32,
}

impl Label {
    /// Create a label. Confidence is clamped into [0, 1]; NaN becomes 0.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            text: text.into(),
            confidence,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// The labels of one image, in the order the extractor returned them.
///
/// Duplicate texts are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    pub fn new(labels: Vec<Label>) -> Self {
        Self { labels }
    }

    /// Build a set of full-confidence labels from bare texts
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts.into_iter().map(|text| Label::new(text, 1.0)).collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    /// Label texts in order; confidences dropped
    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.labels.iter().map(Label::text)
    }

    /// Labels whose confidence is at least `min_confidence`, order kept
    pub fn above(&self, min_confidence: f32) -> LabelSet {
        self.labels
            .iter()
            .filter(|label| label.confidence >= min_confidence)
            .cloned()
            .collect()
    }

    pub fn as_slice(&self) -> &[Label] {
        &self.labels
    }
}

impl FromIterator<Label> for LabelSet {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

impl IntoIterator for LabelSet {
    type Item = Label;
    type IntoIter = std::vec::IntoIter<Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.into_iter()
    }
}
