//! Comparison execution.

use super::state::{ComparisonRound, ImageSlot, RoundOutcome};
use crate::core::labels::{LabelExtractor, LabelSet};
use crate::core::preprocess::{DecodedImage, ImageReference, PreprocessConfig};
use crate::core::similarity::{compare, SimilarityResult};
use crate::error::{DecodeError, LabelCompareError, RoundError};
use crate::events::{
    null_sender, CompareEvent, Event, EventSender, ExtractEvent, PreprocessEvent, RoundEvent,
    RoundPhase, RoundSummary,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What was found on one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageLabels {
    /// Display form of the image reference
    pub reference: String,
    /// Size before preprocessing
    pub original_size: (u32, u32),
    /// Size the extractor saw
    pub resized_size: (u32, u32),
    /// Labels in extractor order
    pub labels: LabelSet,
}

/// Full result of a successful round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Unique identifier for this round
    pub round_id: Uuid,
    /// Similarity of the two label sets
    pub result: SimilarityResult,
    pub first: ImageLabels,
    pub second: ImageLabels,
    /// Duration in milliseconds
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// Builder for a comparison
pub struct ComparisonBuilder<E> {
    config: PreprocessConfig,
    extractor: E,
}

impl<E: LabelExtractor> ComparisonBuilder<E> {
    pub fn new(extractor: E) -> Self {
        Self {
            config: PreprocessConfig::default(),
            extractor,
        }
    }

    /// Maximum width images are scaled to before labeling
    pub fn max_width(mut self, max_width: u32) -> Self {
        self.config.max_width = max_width;
        self
    }

    /// Maximum height images are scaled to before labeling
    pub fn max_height(mut self, max_height: u32) -> Self {
        self.config.max_height = max_height;
        self
    }

    pub fn preprocess(mut self, config: PreprocessConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Comparison<E> {
        Comparison {
            config: self.config,
            extractor: self.extractor,
        }
    }
}

/// Labels two images one after the other and compares the results.
///
/// The first image is always fully labeled before the second is touched,
/// and a failure on the first image ends the round.
pub struct Comparison<E> {
    config: PreprocessConfig,
    extractor: E,
}

impl<E: LabelExtractor> Comparison<E> {
    pub fn builder(extractor: E) -> ComparisonBuilder<E> {
        ComparisonBuilder::new(extractor)
    }

    /// A comparison with the default preview bounds
    pub fn new(extractor: E) -> Self {
        ComparisonBuilder::new(extractor).build()
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Run a comparison without events
    pub async fn run(
        &self,
        first: &ImageReference,
        second: &ImageReference,
    ) -> Result<ComparisonReport, LabelCompareError> {
        self.run_with_events(first, second, &null_sender()).await
    }

    /// Run a comparison with event reporting
    pub async fn run_with_events(
        &self,
        first: &ImageReference,
        second: &ImageReference,
        events: &EventSender,
    ) -> Result<ComparisonReport, LabelCompareError> {
        let start_time = Instant::now();
        let round_id = Uuid::new_v4();

        info!(%round_id, first = %first, second = %second, extractor = self.extractor.name(), "Comparison started");

        events.send(Event::Round(RoundEvent::Started { round_id }));
        events.send(Event::Round(RoundEvent::PhaseChanged {
            phase: RoundPhase::Comparing,
        }));

        let labeled = match self.label_slot(ImageSlot::First, first, events).await {
            Ok(first_labels) => self
                .label_slot(ImageSlot::Second, second, events)
                .await
                .map(|second_labels| (first_labels, second_labels)),
            Err(e) => Err(e),
        };

        let (first_labels, second_labels) = match labeled {
            Ok(pair) => pair,
            Err(e) => {
                warn!(%round_id, error = %e, "Comparison failed");
                events.send(Event::Round(RoundEvent::Failed {
                    slot: e.slot(),
                    message: e.to_string(),
                }));
                events.send(Event::Round(RoundEvent::PhaseChanged {
                    phase: RoundPhase::Done,
                }));
                return Err(e);
            }
        };

        let result = compare(&first_labels.labels, &second_labels.labels);

        for text in &result.shared_labels {
            events.send(Event::Compare(CompareEvent::SharedLabel { text: text.clone() }));
        }
        events.send(Event::Compare(CompareEvent::Completed {
            percentage: result.percentage,
            shared_count: result.shared_count(),
        }));

        let duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            %round_id,
            percentage = result.percentage,
            shared = result.shared_count(),
            duration_ms,
            "Comparison completed"
        );

        events.send(Event::Round(RoundEvent::Completed {
            summary: RoundSummary {
                percentage: result.percentage,
                shared_count: result.shared_count(),
                labels_first: first_labels.labels.len(),
                labels_second: second_labels.labels.len(),
                duration_ms,
            },
        }));
        events.send(Event::Round(RoundEvent::PhaseChanged {
            phase: RoundPhase::Done,
        }));

        Ok(ComparisonReport {
            round_id,
            result,
            first: first_labels,
            second: second_labels,
            duration_ms,
            completed_at: Utc::now(),
        })
    }

    /// Run the round's pending comparison and record its outcome.
    ///
    /// The round must be `Comparing`. Failures of the comparison itself end
    /// up in the outcome; only state-machine misuse is returned as an error.
    pub async fn drive<'r>(
        &self,
        round: &'r mut ComparisonRound,
        events: &EventSender,
    ) -> Result<&'r RoundOutcome, LabelCompareError> {
        let ticket = round.ticket()?;

        let outcome = match self
            .run_with_events(&ticket.first, &ticket.second, events)
            .await
        {
            Ok(report) => RoundOutcome::Compared(report),
            Err(e) => RoundOutcome::Failed {
                slot: e.slot(),
                message: e.to_string(),
            },
        };

        round.complete(ticket.generation, outcome)?;
        round
            .outcome()
            .ok_or(LabelCompareError::Round(RoundError::NotReady))
    }

    /// Reset `round` for a new comparison and report it.
    ///
    /// Returns the new generation; outcomes of earlier tickets will be
    /// rejected as stale.
    pub fn reset(&self, round: &mut ComparisonRound, events: &EventSender) -> u64 {
        let generation = round.reset();

        info!(generation, "Round reset");
        events.send(Event::Round(RoundEvent::Reset { generation }));
        events.send(Event::Round(RoundEvent::PhaseChanged {
            phase: round.phase(),
        }));

        generation
    }

    /// Preprocess and label a single image
    pub async fn label(&self, reference: &ImageReference) -> Result<ImageLabels, LabelCompareError> {
        let decoded = self.preprocess(reference).await??;
        let labels = self.extractor.extract_labels(&decoded).await?;
        Ok(image_labels(reference, &decoded, labels))
    }

    async fn label_slot(
        &self,
        slot: ImageSlot,
        reference: &ImageReference,
        events: &EventSender,
    ) -> Result<ImageLabels, LabelCompareError> {
        events.send(Event::Preprocess(PreprocessEvent::Started {
            slot,
            reference: reference.to_string(),
        }));

        let decoded = self
            .preprocess(reference)
            .await?
            .map_err(|source| LabelCompareError::Decode { slot, source })?;

        events.send(Event::Preprocess(PreprocessEvent::Resized {
            slot,
            original: decoded.original_dimensions(),
            resized: decoded.dimensions(),
        }));
        events.send(Event::Extract(ExtractEvent::Started {
            slot,
            extractor: self.extractor.name().to_string(),
        }));

        let labels = match self.extractor.extract_labels(&decoded).await {
            Ok(labels) => labels,
            Err(source) => {
                events.send(Event::Extract(ExtractEvent::Failed {
                    slot,
                    message: source.to_string(),
                }));
                return Err(LabelCompareError::Extraction { slot, source });
            }
        };

        debug!(%slot, count = labels.len(), "Labels extracted");
        events.send(Event::Extract(ExtractEvent::Completed {
            slot,
            label_count: labels.len(),
        }));

        Ok(image_labels(reference, &decoded, labels))
    }

    /// Decode and resize on the blocking pool.
    async fn preprocess(
        &self,
        reference: &ImageReference,
    ) -> Result<Result<DecodedImage, DecodeError>, LabelCompareError> {
        let config = self.config;
        let reference = reference.clone();

        tokio::task::spawn_blocking(move || config.apply(&reference))
            .await
            .map_err(|e| LabelCompareError::Runtime(e.to_string()))
    }
}

fn image_labels(reference: &ImageReference, decoded: &DecodedImage, labels: LabelSet) -> ImageLabels {
    ImageLabels {
        reference: reference.to_string(),
        original_size: decoded.original_dimensions(),
        resized_size: decoded.dimensions(),
        labels,
    }
}

/// Label `first`, then `second`, and compare them with default bounds.
pub async fn run_comparison<E: LabelExtractor>(
    extractor: &E,
    first: &ImageReference,
    second: &ImageReference,
) -> Result<SimilarityResult, LabelCompareError> {
    let report = Comparison::new(extractor).run(first, second).await?;
    Ok(report.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::labels::{HeuristicLabeler, Label};
    use crate::error::ExtractionError;
    use crate::events::EventChannel;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Returns queued responses in order and records what it was asked to label
    struct ScriptedExtractor {
        responses: Mutex<VecDeque<Result<LabelSet, ExtractionError>>>,
        calls: Mutex<Vec<(u32, u32)>>,
    }

    impl ScriptedExtractor {
        fn new(responses: Vec<Result<LabelSet, ExtractionError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(u32, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LabelExtractor for ScriptedExtractor {
        async fn extract_labels(&self, image: &DecodedImage) -> Result<LabelSet, ExtractionError> {
            self.calls.lock().unwrap().push(image.original_dimensions());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(LabelSet::default()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn png(width: u32, height: u32) -> ImageReference {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 90, 200])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        ImageReference::from_bytes(format!("{}x{}.png", width, height), bytes)
    }

    fn labels(texts: &[&str]) -> LabelSet {
        LabelSet::from_texts(texts.iter().copied())
    }

    fn model_failure() -> ExtractionError {
        ExtractionError::Failed {
            extractor: "scripted".to_string(),
            reason: "model crashed".to_string(),
        }
    }

    #[tokio::test]
    async fn compares_labels_of_both_images() {
        let extractor = ScriptedExtractor::new(vec![
            Ok(labels(&["Dog", "Grass", "Sky"])),
            Ok(labels(&["Sky", "Dog", "Car"])),
        ]);
        let comparison = Comparison::new(&extractor);

        let report = comparison.run(&png(40, 20), &png(20, 40)).await.unwrap();

        assert!((report.result.percentage - 50.0).abs() < 1e-10);
        assert_eq!(report.result.shared_labels, vec!["Dog", "Sky"]);
        assert_eq!(report.first.labels.len(), 3);
        assert_eq!(report.first.original_size, (40, 20));
        assert_eq!(report.second.original_size, (20, 40));
    }

    #[tokio::test]
    async fn first_image_is_labeled_before_second() {
        let extractor = ScriptedExtractor::new(vec![]);
        Comparison::new(&extractor)
            .run(&png(40, 20), &png(20, 40))
            .await
            .unwrap();

        assert_eq!(extractor.calls(), vec![(40, 20), (20, 40)]);
    }

    #[tokio::test]
    async fn failure_on_first_image_skips_second() {
        let extractor = ScriptedExtractor::new(vec![Err(model_failure()), Ok(labels(&["Dog"]))]);

        let error = Comparison::new(&extractor)
            .run(&png(40, 20), &png(20, 40))
            .await
            .unwrap_err();

        assert_eq!(error.slot(), Some(ImageSlot::First));
        assert!(matches!(error, LabelCompareError::Extraction { .. }));
        assert_eq!(extractor.calls().len(), 1);
    }

    #[tokio::test]
    async fn decode_failure_on_first_image_skips_extraction() {
        let extractor = ScriptedExtractor::new(vec![]);
        let broken = ImageReference::from_bytes("broken", b"not an image at all".to_vec());

        let error = Comparison::new(&extractor)
            .run(&broken, &png(20, 40))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            LabelCompareError::Decode {
                slot: ImageSlot::First,
                ..
            }
        ));
        assert!(extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn failure_on_second_image_is_reported() {
        let extractor = ScriptedExtractor::new(vec![Ok(labels(&["Dog"])), Err(model_failure())]);

        let error = Comparison::new(&extractor)
            .run(&png(40, 20), &png(20, 40))
            .await
            .unwrap_err();

        assert_eq!(error.slot(), Some(ImageSlot::Second));
        assert!(error.to_string().contains("model crashed"));
    }

    #[tokio::test]
    async fn images_are_bounded_before_labeling() {
        let extractor = ScriptedExtractor::new(vec![]);
        let comparison = Comparison::builder(&extractor)
            .max_width(100)
            .max_height(50)
            .build();

        let report = comparison.run(&png(400, 200), &png(200, 400)).await.unwrap();

        assert_eq!(report.first.resized_size, (100, 50));
        assert_eq!(report.second.resized_size, (25, 50));
    }

    #[tokio::test]
    async fn events_follow_round_progress() {
        let extractor = ScriptedExtractor::new(vec![
            Ok(labels(&["Dog", "Sky"])),
            Ok(labels(&["Sky"])),
        ]);
        let (sender, receiver) = EventChannel::new();

        Comparison::new(&extractor)
            .run_with_events(&png(10, 10), &png(10, 10), &sender)
            .await
            .unwrap();

        let events = receiver.drain();
        assert!(matches!(events.first(), Some(Event::Round(RoundEvent::Started { .. }))));
        assert!(matches!(
            events.last(),
            Some(Event::Round(RoundEvent::PhaseChanged {
                phase: RoundPhase::Done
            }))
        ));

        let extracted: Vec<ImageSlot> = events
            .iter()
            .filter_map(|e| match e {
                Event::Extract(ExtractEvent::Completed { slot, .. }) => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(extracted, vec![ImageSlot::First, ImageSlot::Second]);

        let shared: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                Event::Compare(CompareEvent::SharedLabel { text }) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(shared, vec!["Sky"]);
    }

    #[tokio::test]
    async fn failed_round_emits_failure_event() {
        let extractor = ScriptedExtractor::new(vec![Err(model_failure())]);
        let (sender, receiver) = EventChannel::new();

        let _ = Comparison::new(&extractor)
            .run_with_events(&png(10, 10), &png(10, 10), &sender)
            .await;

        let events = receiver.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Round(RoundEvent::Failed {
                slot: Some(ImageSlot::First),
                ..
            })
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::Round(RoundEvent::Completed { .. }))));
    }

    #[tokio::test]
    async fn drive_records_outcome_in_round() {
        let extractor = ScriptedExtractor::new(vec![Ok(labels(&["Dog"])), Ok(labels(&["Dog"]))]);
        let comparison = Comparison::new(&extractor);

        let mut round = ComparisonRound::new();
        round.select(png(10, 10)).unwrap();
        round.select(png(12, 10)).unwrap();

        let outcome = comparison.drive(&mut round, &null_sender()).await.unwrap();
        assert_eq!(outcome.result().map(|r| r.percentage), Some(100.0));
        assert_eq!(round.phase(), RoundPhase::Done);
    }

    #[tokio::test]
    async fn drive_records_failures_as_outcome() {
        let extractor = ScriptedExtractor::new(vec![Err(model_failure())]);
        let comparison = Comparison::new(&extractor);

        let mut round = ComparisonRound::new();
        round.select(png(10, 10)).unwrap();
        round.select(png(10, 10)).unwrap();

        let outcome = comparison.drive(&mut round, &null_sender()).await.unwrap();
        match outcome {
            RoundOutcome::Failed { slot, message } => {
                assert_eq!(*slot, Some(ImageSlot::First));
                assert!(message.contains("model crashed"));
            }
            RoundOutcome::Compared(_) => panic!("expected a failed round"),
        }
    }

    #[tokio::test]
    async fn drive_requires_two_selections() {
        let extractor = ScriptedExtractor::new(vec![]);
        let mut round = ComparisonRound::new();
        round.select(png(10, 10)).unwrap();

        let error = Comparison::new(&extractor)
            .drive(&mut round, &null_sender())
            .await
            .unwrap_err();

        assert!(matches!(error, LabelCompareError::Round(RoundError::NotReady)));
        assert!(extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn reset_reports_new_generation() {
        let extractor = ScriptedExtractor::new(vec![Ok(labels(&["Dog"])), Ok(labels(&["Dog"]))]);
        let comparison = Comparison::new(&extractor);
        let (sender, receiver) = EventChannel::new();

        let mut round = ComparisonRound::new();
        round.select(png(10, 10)).unwrap();
        round.select(png(10, 10)).unwrap();
        comparison.drive(&mut round, &null_sender()).await.unwrap();

        let generation = comparison.reset(&mut round, &sender);

        assert_eq!(generation, 1);
        assert_eq!(round.phase(), RoundPhase::AwaitingFirstImage);
        assert!(round.outcome().is_none());

        let events = receiver.drain();
        assert!(matches!(
            events.as_slice(),
            [
                Event::Round(RoundEvent::Reset { generation: 1 }),
                Event::Round(RoundEvent::PhaseChanged {
                    phase: RoundPhase::AwaitingFirstImage
                }),
            ]
        ));
    }

    #[tokio::test]
    async fn run_comparison_returns_similarity() {
        let extractor = ScriptedExtractor::new(vec![
            Ok(LabelSet::new(vec![Label::new("cat", 0.9), Label::new("dog", 0.8)])),
            Ok(LabelSet::new(vec![Label::new("fish", 0.9), Label::new("bird", 0.7)])),
        ]);

        let result = run_comparison(&extractor, &png(10, 10), &png(10, 10))
            .await
            .unwrap();

        assert_eq!(result.percentage, 0.0);
        assert!(result.shared_labels.is_empty());
    }

    #[tokio::test]
    async fn heuristic_labeler_finds_identical_images_identical() {
        let labeler = HeuristicLabeler::default();
        let result = run_comparison(&labeler, &png(64, 48), &png(64, 48))
            .await
            .unwrap();

        assert_eq!(result.percentage, 100.0);
        assert!(!result.shared_labels.is_empty());
    }

    #[tokio::test]
    async fn label_single_image() {
        let extractor = ScriptedExtractor::new(vec![Ok(labels(&["Dog"]))]);
        let image = Comparison::new(&extractor).label(&png(1600, 800)).await.unwrap();

        assert_eq!(image.resized_size, (800, 400));
        assert_eq!(image.labels.len(), 1);
    }
}
