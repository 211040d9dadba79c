//! # Events Module
//!
//! Event-driven progress reporting for comparison rounds.
//!
//! ## Design
//! The core library emits events through channels, allowing any caller
//! (CLI, GUI, mobile shell) to subscribe and display progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Extract(ExtractEvent::Completed { slot, label_count }) => {
//!                 println!("{} has {} labels", slot, label_count)
//!             }
//!             _ => {}
//!         }
//!     }
//! });
//!
//! comparison.run_with_events(&first, &second, &sender).await?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
