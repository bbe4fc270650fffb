//! # Runtime events emitted by the orchestrator and its lifecycle tasks.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Run events**: serving, shutdown requested/started, forced exit, stopped
//! - **Subsystem events**: starting, exited, stopping, stopped, failures
//! - **Error events**: hook and configuration failures
//! - **Subscriber events**: overflow and panics in subscriber workers
//!
//! The [`Event`] struct carries metadata such as timestamp, subsystem name,
//! reason and a stable error label.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use appvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::SubsystemFailed)
//!     .with_subsystem("http")
//!     .with_reason("address already in use");
//!
//! assert_eq!(ev.kind, EventKind::SubsystemFailed);
//! assert_eq!(ev.subsystem.as_deref(), Some("http"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::RuntimeError;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subsystem`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subsystem`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Run events ===
    /// A before-run hook failed; nothing was started.
    ///
    /// Sets:
    /// - `reason`: hook error
    /// - `label`: error label
    StartupFailed,

    /// Every subsystem was spawned.
    ///
    /// Sets:
    /// - `reason`: build info, when a version was set
    Serving,

    /// Termination signal observed.
    ShutdownRequested,

    /// Shutdown path entered (signal, failure or cancelled context); before-shutdown hooks run next.
    ShutdownStarted,

    /// Forced-exit watcher waits for a repeated signal.
    GraceWindowOpened,

    /// Repeated signal observed; the process is terminated without waiting.
    ForceExit,

    /// Every lifecycle task finished.
    AllStopped,

    // === Subsystem events ===
    /// Subsystem `run` is about to be called.
    ///
    /// Sets:
    /// - `subsystem`: subsystem name
    SubsystemStarting,

    /// Subsystem `run` returned without error.
    ///
    /// Sets:
    /// - `subsystem`: subsystem name
    SubsystemExited,

    /// Subsystem `run` returned an error.
    ///
    /// Sets:
    /// - `subsystem`: subsystem name
    /// - `reason`: failure message
    /// - `label`: error label
    SubsystemFailed,

    /// Subsystem received its stop signal; `shutdown` is being called.
    ///
    /// Sets:
    /// - `subsystem`: subsystem name
    SubsystemStopping,

    /// Subsystem `shutdown` returned without error.
    ///
    /// Sets:
    /// - `subsystem`: subsystem name
    SubsystemStopped,

    /// Subsystem `shutdown` returned an error.
    ///
    /// Sets:
    /// - `subsystem`: subsystem name
    /// - `reason`: failure message
    /// - `label`: error label
    SubsystemShutdownFailed,

    // === Error events ===
    /// A before-shutdown hook failed; stop signals are still sent.
    ///
    /// Sets:
    /// - `reason`: hook error
    /// - `label`: error label
    ShutdownHookFailed,

    /// Any other lifecycle failure (no subsystems, panicked task, signal registration).
    ///
    /// Sets:
    /// - `reason`: failure message
    /// - `label`: error label
    LifecycleError,
}

impl EventKind {
    /// Returns `true` for the last event of a lifecycle (`AllStopped`, `StartupFailed`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::AllStopped | EventKind::StartupFailed)
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the subsystem (or subscriber), if applicable.
    pub subsystem: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, build info).
    pub reason: Option<Arc<str>>,
    /// Stable error label, see `as_label` on the error types.
    pub label: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            subsystem: None,
            reason: None,
            label: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a subsystem name.
    #[inline]
    pub fn with_subsystem(mut self, name: impl Into<Arc<str>>) -> Self {
        self.subsystem = Some(name.into());
        self
    }

    /// Attaches a stable error label.
    #[inline]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Builds the event reporting a lifecycle task error.
    pub fn from_error(err: &RuntimeError) -> Self {
        let (kind, reason) = match err {
            RuntimeError::Subsystem { source, .. } => (EventKind::SubsystemFailed, source.to_string()),
            RuntimeError::SubsystemShutdown { source, .. } => {
                (EventKind::SubsystemShutdownFailed, source.to_string())
            }
            RuntimeError::BeforeRun(e) => (EventKind::StartupFailed, e.to_string()),
            RuntimeError::BeforeShutdown(e) => (EventKind::ShutdownHookFailed, e.to_string()),
            other => (EventKind::LifecycleError, other.to_string()),
        };

        let ev = Event::new(kind)
            .with_reason(reason)
            .with_label(err.as_label());
        match err.subsystem() {
            Some(name) => ev.with_subsystem(name),
            None => ev,
        }
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_subsystem(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_subsystem(subscriber)
            .with_reason(info)
    }
}
