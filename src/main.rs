//! # label-compare CLI
//!
//! Command-line interface for label-based photo comparison.
//!
//! ## Usage
//! ```bash
//! label-compare compare first.jpg second.jpg
//! label-compare compare first.jpg second.jpg --output json
//! ```

mod cli;

use label_similarity::Result;

fn main() -> Result<()> {
    cli::run()
}
