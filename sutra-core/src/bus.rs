//! In-process pub/sub bus.
//!
//! A `Topic<T>` fans published messages out to any number of subscribers.
//! Subscribers are plain `crossbeam_channel::Receiver`s, so node event
//! loops can multiplex them with `select!`. Disconnected subscribers are
//! pruned lazily on publish.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// A named fan-out channel.
///
/// Cloning a `Topic` clones a handle to the same subscriber list, so a
/// publisher created before a subscriber still reaches it.
#[derive(Clone)]
pub struct Topic<T> {
    name: String,
    subscribers: Arc<Mutex<Vec<Sender<T>>>>,
}

impl<T: Clone> Topic<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Topic name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .expect("bus subscriber list poisoned")
            .push(tx);
        rx
    }

    /// Deliver a message to every live subscriber.
    pub fn publish(&self, msg: T) {
        let mut subs = self
            .subscribers
            .lock()
            .expect("bus subscriber list poisoned");
        subs.retain(|tx| tx.send(msg.clone()).is_ok());
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("bus subscriber list poisoned")
            .len()
    }
}
