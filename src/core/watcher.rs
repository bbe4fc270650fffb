//! # Forced-exit watcher.
//!
//! One watcher runs per [`Orchestrator::run`](crate::Orchestrator::run) and
//! turns a repeated termination signal into an immediate process exit.
//!
//! ## State machine
//! ```text
//!            shutdown token cancelled               next signal
//!  Armed ─────────────────────────────► GraceWindow ───────────► ForceKill
//!    │   (signal, subsystem failure,        │                    (log, cancel graceful wait,
//!    │    cancelled caller token)           │                     exit(force_exit_code))
//!    └──────── finished ──────────────────► └──── finished ────► return
//! ```
//!
//! `finished` is cancelled by the orchestrator once graceful shutdown
//! completed, so the watcher never outlives its run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::core::signals::SignalSource;
use crate::events::{Bus, Event, EventKind};

/// Process exit hook: receives the exit status.
///
/// The default calls [`std::process::exit`].
pub type ExitFn = Arc<dyn Fn(i32) + Send + Sync>;

/// Exit hook terminating the process.
pub(crate) fn process_exit() -> ExitFn {
    Arc::new(|code| std::process::exit(code))
}

/// Watcher states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Waiting for the shutdown path to begin.
    Armed,
    /// Shutdown in progress; waiting for a repeated signal.
    GraceWindow,
    /// Repeated signal observed; the exit hook was called.
    ForceKill,
}

pub(crate) struct ForceExitWatcher {
    pub(crate) signals: Arc<dyn SignalSource>,
    pub(crate) exit: ExitFn,
    pub(crate) exit_code: i32,
    pub(crate) bus: Bus,
    /// Cancelled on `ForceKill` so the orchestrator stops waiting for in-flight shutdowns.
    pub(crate) forced: CancellationToken,
}

impl ForceExitWatcher {
    /// Drives the state machine; returns the state it ended in.
    pub(crate) async fn run(
        self,
        shutdown: CancellationToken,
        finished: CancellationToken,
    ) -> WatcherState {
        let mut state = WatcherState::Armed;
        loop {
            state = match state {
                WatcherState::Armed => tokio::select! {
                    biased;
                    _ = finished.cancelled() => return state,
                    _ = shutdown.cancelled() => WatcherState::GraceWindow,
                },
                WatcherState::GraceWindow => {
                    self.bus.publish(Event::new(EventKind::GraceWindowOpened));
                    tokio::select! {
                        biased;
                        _ = finished.cancelled() => return state,
                        res = self.signals.wait() => match res {
                            Ok(()) => WatcherState::ForceKill,
                            Err(err) => {
                                self.bus.publish(
                                    Event::new(EventKind::LifecycleError)
                                        .with_label("signal_listener_failed")
                                        .with_reason(err.to_string()),
                                );
                                return state;
                            }
                        },
                    }
                }
                WatcherState::ForceKill => {
                    error!(target: "appvisor", code = self.exit_code, "shutting down immediately");
                    self.bus.publish(Event::new(EventKind::ForceExit));
                    self.forced.cancel();
                    (self.exit)(self.exit_code);
                    return state;
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signals::ManualSignals;
    use std::sync::Mutex;

    fn watcher(signals: Arc<ManualSignals>, exits: Arc<Mutex<Vec<i32>>>) -> ForceExitWatcher {
        ForceExitWatcher {
            signals,
            exit: Arc::new(move |code| exits.lock().unwrap().push(code)),
            exit_code: 3,
            bus: Bus::new(16),
            forced: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn finished_before_shutdown_stays_armed() {
        let exits = Arc::new(Mutex::new(Vec::new()));
        let w = watcher(Arc::new(ManualSignals::new()), exits.clone());
        let finished = CancellationToken::new();
        finished.cancel();

        let state = w.run(CancellationToken::new(), finished).await;
        assert_eq!(state, WatcherState::Armed);
        assert!(exits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn graceful_completion_abandons_grace_window() {
        let exits = Arc::new(Mutex::new(Vec::new()));
        let w = watcher(Arc::new(ManualSignals::new()), exits.clone());
        let mut rx = w.bus.subscribe();
        let shutdown = CancellationToken::new();
        let finished = CancellationToken::new();

        let handle = tokio::spawn(w.run(shutdown.clone(), finished.clone()));
        shutdown.cancel();
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::GraceWindowOpened);
        finished.cancel();

        assert_eq!(handle.await.unwrap(), WatcherState::GraceWindow);
        assert!(exits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_signal_forces_exit() {
        let exits = Arc::new(Mutex::new(Vec::new()));
        let signals = Arc::new(ManualSignals::new());
        let w = watcher(signals.clone(), exits.clone());
        let forced = w.forced.clone();
        let shutdown = CancellationToken::new();

        shutdown.cancel();
        signals.raise();

        let state = w.run(shutdown, CancellationToken::new()).await;
        assert_eq!(state, WatcherState::ForceKill);
        assert_eq!(*exits.lock().unwrap(), [3]);
        assert!(forced.is_cancelled());
    }
}
