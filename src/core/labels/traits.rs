//! Trait definition for label extraction.

use super::LabelSet;
use crate::core::preprocess::DecodedImage;
use crate::error::ExtractionError;
use std::future::Future;
use std::sync::Arc;

/// An image-labeling model.
///
/// Implementations return labels in the model's own order and report every
/// failure as an [`ExtractionError`]; nothing is swallowed. Each call labels
/// a single image and is independent of any other call.
pub trait LabelExtractor: Send + Sync {
    /// Label one decoded image
    fn extract_labels(
        &self,
        image: &DecodedImage,
    ) -> impl Future<Output = Result<LabelSet, ExtractionError>> + Send;

    /// Short name for logs and error messages
    fn name(&self) -> &str;
}

impl<T: LabelExtractor> LabelExtractor for &T {
    fn extract_labels(
        &self,
        image: &DecodedImage,
    ) -> impl Future<Output = Result<LabelSet, ExtractionError>> + Send {
        (**self).extract_labels(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: LabelExtractor> LabelExtractor for Arc<T> {
    fn extract_labels(
        &self,
        image: &DecodedImage,
    ) -> impl Future<Output = Result<LabelSet, ExtractionError>> + Send {
        (**self).extract_labels(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
