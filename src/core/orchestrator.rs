//! # Orchestrator: runs subsystems, sequences hooks, drives graceful shutdown.
//!
//! The [`Orchestrator`] owns the configured subsystems, the two hook chains,
//! the event bus and the signal source. One call to [`Orchestrator::run`] is
//! one lifecycle: start everything, wait for a reason to stop, stop everything.
//!
//! ## High-level architecture
//! ```text
//! run(ctx)
//!   ├─► before-run hooks (ctx) ──── Err ──► StartupFailed, return Err(BeforeRun)
//!   │
//!   ├─► shutdown = ctx.child_token()
//!   ├─► signal listener: first signal ─► ShutdownRequested, shutdown.cancel()
//!   │
//!   ├─► JoinSet (any task returning Err cancels `shutdown`):
//!   │     for each subsystem S:
//!   │       run task   : S.run()                       ─► SubsystemExited | SubsystemFailed
//!   │       stop task  : stop[S].cancelled() ─► S.shutdown(deadline) ─► SubsystemStopped | ...Failed
//!   │     coordinator  : no subsystems ─► Err(NoSubsystems)
//!   │                    shutdown.cancelled() ─► before-shutdown hooks ─► cancel every stop[S]
//!   │
//!   ├─► ForceExitWatcher (Armed ─► GraceWindow ─► ForceKill)
//!   │
//!   └─► drain JoinSet (each error ─► event)  ── or ── forced exit ─► abort remaining tasks
//!         └─► finished.cancel(), AllStopped, flush subscribers, return Ok(())
//! ```
//!
//! ## Rules
//! - Before-run hooks finish before any subsystem starts.
//! - Before-shutdown hooks finish before any stop token is cancelled; a failing
//!   hook still lets every stop token fire.
//! - Stop tokens fire together, with no order between subsystems.
//! - After subsystems started, errors are events, never return values.
//! - `run` returns only after every subscriber handled the final event
//!   (`AllStopped` or `StartupFailed`). Subscribers are detached afterwards, so
//!   an orchestrator drives a single lifecycle.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::Config;
use crate::core::signals::SignalSource;
use crate::core::watcher::{ExitFn, ForceExitWatcher};
use crate::error::{HookError, RuntimeError, SubsystemError};
use crate::events::{Bus, Event, EventKind};
use crate::hooks::HookChain;
use crate::subscribers::panic_message;
use crate::subsystems::SubsystemRef;

type LifecycleSet = JoinSet<Result<(), RuntimeError>>;

/// Build metadata reported when the orchestrator starts serving.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildInfo {
    /// Release version.
    pub version: String,
    /// Who built the binary.
    pub build_user: String,
    /// When the binary was built.
    pub build_time: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "version={} build_user={} build_time={}",
            self.version, self.build_user, self.build_time
        )
    }
}

/// Runs subsystems concurrently and coordinates their graceful shutdown.
pub struct Orchestrator {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    pub(crate) subsystems: Vec<SubsystemRef>,
    pub(crate) before_run: HookChain,
    pub(crate) before_shutdown: HookChain,
    pub(crate) signals: Arc<dyn SignalSource>,
    pub(crate) exit: ExitFn,
    pub(crate) version: Option<BuildInfo>,
    /// Bus listener feeding the subscribers; taken and awaited when `run` ends.
    pub(crate) delivery: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Returns the runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Subscribes to lifecycle events published from now on.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Configured subsystems, in registration order.
    pub fn subsystems(&self) -> &[SubsystemRef] {
        &self.subsystems
    }

    /// Build metadata, if set.
    pub fn version(&self) -> Option<&BuildInfo> {
        self.version.as_ref()
    }

    /// Records build metadata.
    pub fn set_version(
        &mut self,
        version: impl Into<String>,
        build_user: impl Into<String>,
        build_time: impl Into<String>,
    ) {
        self.version = Some(BuildInfo {
            version: version.into(),
            build_user: build_user.into(),
            build_time: build_time.into(),
        });
    }

    /// Appends a hook run before any subsystem starts.
    pub fn add_before_run_hook<F, Fut>(&mut self, hook: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.before_run.push(hook);
    }

    /// Appends a hook run before any subsystem is told to stop.
    pub fn add_before_shutdown_hook<F, Fut>(&mut self, hook: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.before_shutdown.push(hook);
    }

    /// Runs every subsystem until a termination signal, a subsystem failure
    /// or cancellation of `ctx`, then shuts everything down.
    ///
    /// Returns `Err` only when a before-run hook fails (nothing was started).
    /// Every later failure is published as an event and `Ok(())` is returned
    /// once all subsystems stopped and every subscriber (the built-in
    /// [`LogWriter`](crate::LogWriter) included) has handled the final event.
    pub async fn run(&self, ctx: CancellationToken) -> Result<(), RuntimeError> {
        if let Err(err) = self.before_run.run(&ctx).await {
            let err = RuntimeError::BeforeRun(err);
            self.bus.publish(Event::from_error(&err));
            self.flush_events().await;
            return Err(err);
        }

        let shutdown = ctx.child_token();
        let finished = CancellationToken::new();
        let forced = CancellationToken::new();
        self.signal_listener(&shutdown);

        let mut set = LifecycleSet::new();
        let stops = self.spawn_subsystems(&mut set, &shutdown);
        self.spawn_coordinator(&mut set, &shutdown, stops);

        let watcher = ForceExitWatcher {
            signals: Arc::clone(&self.signals),
            exit: Arc::clone(&self.exit),
            exit_code: self.cfg.force_exit_code,
            bus: self.bus.clone(),
            forced: forced.clone(),
        };
        tokio::spawn(watcher.run(shutdown.clone(), finished.clone()));

        let mut serving = Event::new(EventKind::Serving);
        if let Some(version) = &self.version {
            serving = serving.with_reason(version.to_string());
        }
        self.bus.publish(serving);

        let forced_exit = tokio::select! {
            _ = drain(&mut set, &self.bus, &shutdown) => false,
            _ = forced.cancelled() => true,
        };
        if forced_exit {
            set.abort_all();
        }

        finished.cancel();
        self.bus.publish(Event::new(EventKind::AllStopped));
        self.flush_events().await;
        Ok(())
    }

    /// Waits until the subscriber listener delivered the terminal event and
    /// every subscriber worker drained its queue.
    async fn flush_events(&self) {
        let delivery = self
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = delivery {
            let _ = handle.await;
        }
    }

    /// Cancels `shutdown` on the first termination signal.
    fn signal_listener(&self, shutdown: &CancellationToken) {
        let signals = Arc::clone(&self.signals);
        let token = shutdown.clone();
        let bus = self.bus.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                res = signals.wait() => match res {
                    Ok(()) => {
                        bus.publish(Event::new(EventKind::ShutdownRequested));
                        token.cancel();
                    }
                    Err(err) => bus.publish(
                        Event::new(EventKind::LifecycleError)
                            .with_label("signal_listener_failed")
                            .with_reason(err.to_string()),
                    ),
                },
            }
        });
    }

    /// Spawns a run task and a stop task per subsystem; returns the stop tokens.
    fn spawn_subsystems(
        &self,
        set: &mut LifecycleSet,
        shutdown: &CancellationToken,
    ) -> Vec<CancellationToken> {
        let mut stops = Vec::with_capacity(self.subsystems.len());

        for sub in &self.subsystems {
            let s = Arc::clone(sub);
            let bus = self.bus.clone();
            spawn_guarded(set, shutdown, async move {
                bus.publish(Event::new(EventKind::SubsystemStarting).with_subsystem(s.name()));
                s.run().await.map_err(|source| RuntimeError::Subsystem {
                    name: s.name().to_string(),
                    source,
                })?;
                bus.publish(Event::new(EventKind::SubsystemExited).with_subsystem(s.name()));
                Ok(())
            });

            let stop = CancellationToken::new();
            let s = Arc::clone(sub);
            let bus = self.bus.clone();
            let deadline = self.cfg.shutdown_deadline();
            let wait = stop.clone();
            spawn_guarded(set, shutdown, async move {
                wait.cancelled().await;
                bus.publish(Event::new(EventKind::SubsystemStopping).with_subsystem(s.name()));
                shutdown_within(&s, deadline).await.map_err(|source| {
                    RuntimeError::SubsystemShutdown {
                        name: s.name().to_string(),
                        source,
                    }
                })?;
                bus.publish(Event::new(EventKind::SubsystemStopped).with_subsystem(s.name()));
                Ok(())
            });

            stops.push(stop);
        }
        stops
    }

    /// Waits for the shutdown path, runs before-shutdown hooks, then fires every stop token.
    fn spawn_coordinator(
        &self,
        set: &mut LifecycleSet,
        shutdown: &CancellationToken,
        stops: Vec<CancellationToken>,
    ) {
        let empty = self.subsystems.is_empty();
        let hooks = self.before_shutdown.clone();
        let token = shutdown.clone();
        let bus = self.bus.clone();

        spawn_guarded(set, shutdown, async move {
            if empty {
                return Err(RuntimeError::NoSubsystems);
            }

            token.cancelled().await;
            bus.publish(Event::new(EventKind::ShutdownStarted));
            let res = hooks.run(&token).await;

            for stop in stops {
                stop.cancel();
            }
            res.map_err(RuntimeError::BeforeShutdown)
        });
    }
}

/// Spawns `fut` into `set`; an `Err` result cancels `shutdown`.
fn spawn_guarded<F>(set: &mut LifecycleSet, shutdown: &CancellationToken, fut: F)
where
    F: Future<Output = Result<(), RuntimeError>> + Send + 'static,
{
    let token = shutdown.clone();
    set.spawn(async move {
        let res = fut.await;
        if res.is_err() {
            token.cancel();
        }
        res
    });
}

/// Calls `shutdown` with a token cancelled after `deadline` (if any).
///
/// A subsystem that only returns after the deadline fired is reported as
/// [`SubsystemError::DeadlineExceeded`]; its own error wins otherwise.
async fn shutdown_within(
    sub: &SubsystemRef,
    deadline: Option<std::time::Duration>,
) -> Result<(), SubsystemError> {
    let ctx = CancellationToken::new();
    if let Some(d) = deadline {
        let timer = ctx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(d) => {}
                _ = timer.cancelled() => {}
            }
            timer.cancel();
        });
    }

    let guard = ctx.clone().drop_guard();
    let res = sub.shutdown(ctx.clone()).await;
    let expired = ctx.is_cancelled();
    drop(guard);

    match (res, deadline) {
        (Ok(()), Some(timeout)) if expired => Err(SubsystemError::DeadlineExceeded { timeout }),
        (res, _) => res,
    }
}

/// Joins every lifecycle task, publishing one event per failure.
///
/// A panicked task counts as a failure and cancels `shutdown` as well.
async fn drain(set: &mut LifecycleSet, bus: &Bus, shutdown: &CancellationToken) {
    while let Some(joined) = set.join_next().await {
        let err = match joined {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => err,
            Err(join_err) if join_err.is_panic() => {
                shutdown.cancel();
                RuntimeError::Panicked {
                    reason: panic_message(join_err.into_panic().as_ref()),
                }
            }
            Err(_) => continue,
        };
        bus.publish(Event::from_error(&err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::SubsystemFn;
    use std::time::Duration;

    fn waits_for_deadline() -> SubsystemRef {
        SubsystemFn::arc(
            "slow",
            || async { Ok::<_, SubsystemError>(()) },
            |ctx: CancellationToken| async move {
                ctx.cancelled().await;
                Ok::<_, SubsystemError>(())
            },
        )
    }

    #[tokio::test]
    async fn late_shutdown_is_reported_as_deadline_exceeded() {
        let sub = waits_for_deadline();
        let res = shutdown_within(&sub, Some(Duration::from_millis(20))).await;

        assert!(matches!(
            res,
            Err(SubsystemError::DeadlineExceeded { timeout }) if timeout == Duration::from_millis(20)
        ));
    }

    #[tokio::test]
    async fn prompt_shutdown_is_ok() {
        let sub: SubsystemRef = SubsystemFn::arc(
            "fast",
            || async { Ok::<_, SubsystemError>(()) },
            |_ctx: CancellationToken| async { Ok::<_, SubsystemError>(()) },
        );
        assert!(shutdown_within(&sub, Some(Duration::from_secs(5))).await.is_ok());
        assert!(shutdown_within(&sub, None).await.is_ok());
    }

    #[tokio::test]
    async fn own_error_wins_over_deadline() {
        let sub: SubsystemRef = SubsystemFn::arc(
            "broken",
            || async { Ok::<_, SubsystemError>(()) },
            |ctx: CancellationToken| async move {
                ctx.cancelled().await;
                Err::<(), _>(SubsystemError::fail("flush failed"))
            },
        );
        let res = shutdown_within(&sub, Some(Duration::from_millis(20))).await;
        assert!(matches!(res, Err(SubsystemError::Fail { .. })));
    }
}
