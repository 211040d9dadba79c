//! Event channel implementation using crossbeam-channel.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Sends events from a running comparison.
///
/// Cheap to clone and safe to move across threads.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Wrap a raw crossbeam sender.
    pub fn new(sender: Sender<Event>) -> Self {
        Self { inner: sender }
    }

    /// Send an event. If the receiver is gone the event is dropped.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receives events on the caller side.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Returns an iterator over received events
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }

    /// Drain everything currently queued
    pub fn drain(&self) -> Vec<Event> {
        self.inner.try_iter().collect()
    }
}

/// Constructor for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create a new unbounded event channel.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }

    /// Create a bounded event channel with the specified capacity.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        EventChannel
    }
}

/// A sender whose receiver is already dropped, for runs nobody watches.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
