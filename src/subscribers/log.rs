//! # LogWriter: lifecycle events as `tracing` records.
//!
//! Always installed by the [`OrchestratorBuilder`](crate::OrchestratorBuilder).
//! The application decides where records go by installing a `tracing`
//! subscriber (e.g. `tracing_subscriber::fmt`).
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  appvisor: serving; press Ctrl+C to stop
//! ERROR appvisor: subsystem failed subsystem="bus" label="subsystem_failed" error="execution failed: broker gone"
//! INFO  appvisor: shutting down gracefully, press Ctrl+C again to force stop
//! INFO  appvisor: subsystem stopped subsystem="http"
//! INFO  appvisor: stopped
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "appvisor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let subsystem = e.subsystem.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let label = e.label.unwrap_or("-");

        match e.kind {
            EventKind::Serving => {
                info!(target: TARGET, build = reason, "serving; press Ctrl+C to stop");
            }
            EventKind::StartupFailed => {
                error!(target: TARGET, label, error = reason, "startup aborted");
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, "termination signal received");
            }
            EventKind::ShutdownStarted => {
                debug!(target: TARGET, "running before-shutdown hooks");
            }
            EventKind::GraceWindowOpened => {
                info!(target: TARGET, "shutting down gracefully, press Ctrl+C again to force stop");
            }
            // Logged synchronously by the watcher: the process is gone before delivery.
            EventKind::ForceExit => {}
            EventKind::AllStopped => {
                info!(target: TARGET, "stopped");
            }
            EventKind::SubsystemStarting => {
                debug!(target: TARGET, subsystem, "subsystem starting");
            }
            EventKind::SubsystemExited => {
                info!(target: TARGET, subsystem, "subsystem exited");
            }
            EventKind::SubsystemStopping => {
                debug!(target: TARGET, subsystem, "subsystem stopping");
            }
            EventKind::SubsystemStopped => {
                info!(target: TARGET, subsystem, "subsystem stopped");
            }
            EventKind::SubsystemFailed => {
                error!(target: TARGET, subsystem, label, error = reason, "subsystem failed");
            }
            EventKind::SubsystemShutdownFailed => {
                error!(target: TARGET, subsystem, label, error = reason, "subsystem shutdown failed");
            }
            EventKind::ShutdownHookFailed => {
                error!(target: TARGET, label, error = reason, "before-shutdown hook failed");
            }
            EventKind::LifecycleError => {
                error!(target: TARGET, label, error = reason, "lifecycle error");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, subscriber = subsystem, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: TARGET, subscriber = subsystem, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
