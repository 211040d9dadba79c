//! # Comparison Module
//!
//! Orchestrates one comparison round.
//!
//! ## Round Phases
//! 1. **AwaitingFirstImage** - nothing selected yet
//! 2. **AwaitingSecondImage** - first image stored
//! 3. **Comparing** - preprocess + label the first image, then the second,
//!    then compare the label sets
//! 4. **Done** - holds the result or the failure until reset
//!
//! ## Ordering
//! Labeling is strictly sequential: the second image is only preprocessed
//! once the first image's labels are in. A failure on the first image means
//! the second image is never labeled.

mod executor;
mod state;

pub use executor::{
    run_comparison, Comparison, ComparisonBuilder, ComparisonReport, ImageLabels,
};
pub use state::{ComparisonRound, ImageSlot, RoundOutcome, RoundState, RoundTicket};
