//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so lifecycle tasks (subsystem
//! runners, stop listeners, the shutdown coordinator, the forced-exit watcher)
//! can publish without blocking.
//!
//! ```text
//!   run task(s)  ──┐
//!   stop task(s) ──┼──► Bus ──► subscriber listener ──► SubscriberSet ──► LogWriter, ...
//!   coordinator  ──┤
//!   watcher      ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; events without receivers are dropped.
//! - One ring buffer of `capacity` events is shared by all receivers; a lagging
//!   receiver observes `RecvError::Lagged(n)`.
//! - A receiver only sees events published after it subscribed.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver for subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
