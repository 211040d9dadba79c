//! # Label Similarity
//!
//! Compares two photos by the descriptive labels an image-labeling model
//! assigns to them.
//!
//! ## How It Works
//! Each image is decoded and scaled to a preview size, labeled by a
//! [`LabelExtractor`](core::labels::LabelExtractor), and the two label sets
//! are scored by how many label texts they share.
//!
//! ## Architecture
//! - `core` - The comparison engine (UI-agnostic)
//! - `events` - Event-driven progress reporting
//! - `error` - User-friendly error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{LabelCompareError, Result};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the library
///
/// Honors `RUST_LOG`; without it, logs at `debug` when `verbose` is set and
/// `warn` otherwise. Calling it twice keeps the first subscriber.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
