//! Round-scoped state for one comparison.
//!
//! A round collects two image selections, runs once, and holds its outcome
//! until the caller resets it. Every reset bumps the generation so an
//! outcome computed for an earlier round can be recognised and dropped.

use super::ComparisonReport;
use crate::core::preprocess::ImageReference;
use crate::core::similarity::SimilarityResult;
use crate::error::RoundError;
use crate::events::RoundPhase;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which of the two images something refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSlot {
    First,
    Second,
}

impl std::fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSlot::First => write!(f, "first image"),
            ImageSlot::Second => write!(f, "second image"),
        }
    }
}

/// How a round ended
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// Both images were labeled and compared
    Compared(ComparisonReport),
    /// The round failed; there is no result
    Failed {
        slot: Option<ImageSlot>,
        message: String,
    },
}

impl RoundOutcome {
    pub fn result(&self) -> Option<&SimilarityResult> {
        match self {
            RoundOutcome::Compared(report) => Some(&report.result),
            RoundOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RoundOutcome::Compared(_))
    }
}

/// States of a round
#[derive(Debug, Clone)]
pub enum RoundState {
    AwaitingFirstImage,
    AwaitingSecondImage {
        first: ImageReference,
    },
    Comparing {
        first: ImageReference,
        second: ImageReference,
    },
    Done {
        first: ImageReference,
        second: ImageReference,
        outcome: RoundOutcome,
    },
}

/// The work a round hands out once both images are selected.
#[derive(Debug, Clone)]
pub struct RoundTicket {
    /// Generation the ticket was issued in
    pub generation: u64,
    pub first: ImageReference,
    pub second: ImageReference,
}

/// The two image slots and outcome of the current comparison
#[derive(Debug, Clone)]
pub struct ComparisonRound {
    state: RoundState,
    generation: u64,
}

impl ComparisonRound {
    pub fn new() -> Self {
        Self {
            state: RoundState::AwaitingFirstImage,
            generation: 0,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        match self.state {
            RoundState::AwaitingFirstImage => RoundPhase::AwaitingFirstImage,
            RoundState::AwaitingSecondImage { .. } => RoundPhase::AwaitingSecondImage,
            RoundState::Comparing { .. } => RoundPhase::Comparing,
            RoundState::Done { .. } => RoundPhase::Done,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    /// Store a selected image in the next free slot.
    ///
    /// The second selection moves the round to `Comparing`. Selecting while
    /// comparing or done fails with [`RoundError::SlotsFull`].
    pub fn select(&mut self, reference: ImageReference) -> Result<RoundPhase, RoundError> {
        let next = match std::mem::replace(&mut self.state, RoundState::AwaitingFirstImage) {
            RoundState::AwaitingFirstImage => RoundState::AwaitingSecondImage { first: reference },
            RoundState::AwaitingSecondImage { first } => RoundState::Comparing {
                first,
                second: reference,
            },
            full => {
                self.state = full;
                return Err(RoundError::SlotsFull);
            }
        };

        self.state = next;
        debug!(generation = self.generation, phase = %self.phase(), "Image selected");
        Ok(self.phase())
    }

    /// Hand out the pair to compare. Only valid while `Comparing`.
    pub fn ticket(&self) -> Result<RoundTicket, RoundError> {
        match &self.state {
            RoundState::Comparing { first, second } => Ok(RoundTicket {
                generation: self.generation,
                first: first.clone(),
                second: second.clone(),
            }),
            _ => Err(RoundError::NotReady),
        }
    }

    /// Record the outcome for the ticket issued in `generation`.
    ///
    /// Outcomes from an earlier generation are rejected with
    /// [`RoundError::Stale`] and leave the round untouched.
    pub fn complete(&mut self, generation: u64, outcome: RoundOutcome) -> Result<(), RoundError> {
        if generation != self.generation {
            return Err(RoundError::Stale {
                got: generation,
                current: self.generation,
            });
        }

        match std::mem::replace(&mut self.state, RoundState::AwaitingFirstImage) {
            RoundState::Comparing { first, second } => {
                self.state = RoundState::Done {
                    first,
                    second,
                    outcome,
                };
                Ok(())
            }
            other => {
                self.state = other;
                Err(RoundError::NotReady)
            }
        }
    }

    /// Discard both images and any outcome; returns the new generation.
    pub fn reset(&mut self) -> u64 {
        self.state = RoundState::AwaitingFirstImage;
        self.generation += 1;
        debug!(generation = self.generation, "Round reset");
        self.generation
    }

    pub fn outcome(&self) -> Option<&RoundOutcome> {
        match &self.state {
            RoundState::Done { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// Currently selected images
    pub fn references(&self) -> (Option<&ImageReference>, Option<&ImageReference>) {
        match &self.state {
            RoundState::AwaitingFirstImage => (None, None),
            RoundState::AwaitingSecondImage { first } => (Some(first), None),
            RoundState::Comparing { first, second } | RoundState::Done { first, second, .. } => {
                (Some(first), Some(second))
            }
        }
    }
}

impl Default for ComparisonRound {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str) -> ImageReference {
        ImageReference::from_path(format!("/photos/{}", name))
    }

    fn failed() -> RoundOutcome {
        RoundOutcome::Failed {
            slot: Some(ImageSlot::First),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn selections_fill_slots_in_order() {
        let mut round = ComparisonRound::new();
        assert_eq!(round.phase(), RoundPhase::AwaitingFirstImage);

        assert_eq!(round.select(reference("a.jpg")).unwrap(), RoundPhase::AwaitingSecondImage);
        assert_eq!(round.select(reference("b.jpg")).unwrap(), RoundPhase::Comparing);

        let (first, second) = round.references();
        assert_eq!(first, Some(&reference("a.jpg")));
        assert_eq!(second, Some(&reference("b.jpg")));
    }

    #[test]
    fn third_selection_is_rejected() {
        let mut round = ComparisonRound::new();
        round.select(reference("a.jpg")).unwrap();
        round.select(reference("b.jpg")).unwrap();

        assert_eq!(round.select(reference("c.jpg")), Err(RoundError::SlotsFull));
        assert_eq!(round.phase(), RoundPhase::Comparing);
        assert_eq!(round.references().1, Some(&reference("b.jpg")));
    }

    #[test]
    fn ticket_needs_two_images() {
        let mut round = ComparisonRound::new();
        assert!(matches!(round.ticket(), Err(RoundError::NotReady)));

        round.select(reference("a.jpg")).unwrap();
        assert!(matches!(round.ticket(), Err(RoundError::NotReady)));

        round.select(reference("b.jpg")).unwrap();
        let ticket = round.ticket().unwrap();
        assert_eq!(ticket.generation, 0);
        assert_eq!(ticket.first, reference("a.jpg"));
    }

    #[test]
    fn complete_moves_to_done() {
        let mut round = ComparisonRound::new();
        round.select(reference("a.jpg")).unwrap();
        round.select(reference("b.jpg")).unwrap();
        let ticket = round.ticket().unwrap();

        round.complete(ticket.generation, failed()).unwrap();

        assert_eq!(round.phase(), RoundPhase::Done);
        let outcome = round.outcome().unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.result().is_none());
        assert_eq!(round.select(reference("c.jpg")), Err(RoundError::SlotsFull));
    }

    #[test]
    fn reset_discards_everything() {
        let mut round = ComparisonRound::new();
        round.select(reference("a.jpg")).unwrap();
        round.select(reference("b.jpg")).unwrap();
        round.complete(0, failed()).unwrap();

        assert_eq!(round.reset(), 1);
        assert_eq!(round.phase(), RoundPhase::AwaitingFirstImage);
        assert!(round.outcome().is_none());
        assert_eq!(round.references(), (None, None));
    }

    #[test]
    fn stale_outcome_is_ignored() {
        let mut round = ComparisonRound::new();
        round.select(reference("a.jpg")).unwrap();
        round.select(reference("b.jpg")).unwrap();
        let stale = round.ticket().unwrap();

        round.reset();
        round.select(reference("c.jpg")).unwrap();
        round.select(reference("d.jpg")).unwrap();

        assert_eq!(
            round.complete(stale.generation, failed()),
            Err(RoundError::Stale { got: 0, current: 1 })
        );
        assert_eq!(round.phase(), RoundPhase::Comparing);

        let fresh = round.ticket().unwrap();
        assert_eq!(fresh.first, reference("c.jpg"));
        assert!(round.complete(fresh.generation, failed()).is_ok());
    }

    #[test]
    fn complete_outside_comparing_is_not_ready() {
        let mut round = ComparisonRound::new();
        assert_eq!(round.complete(0, failed()), Err(RoundError::NotReady));
        assert_eq!(round.phase(), RoundPhase::AwaitingFirstImage);
    }

    #[test]
    fn slot_display() {
        assert_eq!(ImageSlot::First.to_string(), "first image");
        assert_eq!(ImageSlot::Second.to_string(), "second image");
    }
}
