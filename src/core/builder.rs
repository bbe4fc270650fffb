use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use tokio_util::sync::CancellationToken;

use crate::{
    core::Config,
    error::HookError,
    events::Bus,
    extensions::Registry,
    hooks::HookChain,
    subscribers::{LogWriter, Subscribe, SubscriberSet},
    subsystems::SubsystemRef,
};
use super::{
    orchestrator::{BuildInfo, Orchestrator},
    signals::{OsSignals, SignalSource},
    watcher::{ExitFn, process_exit},
};

/// Builder for constructing an [`Orchestrator`].
pub struct OrchestratorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    subsystems: Vec<SubsystemRef>,
    before_run: HookChain,
    before_shutdown: HookChain,
    signals: Arc<dyn SignalSource>,
    exit: ExitFn,
    version: Option<BuildInfo>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    ///
    /// Defaults: OS signals, `std::process::exit` on forced exit, [`LogWriter`] installed.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: vec![Arc::new(LogWriter::new())],
            subsystems: Vec::new(),
            before_run: HookChain::new(),
            before_shutdown: HookChain::new(),
            signals: Arc::new(OsSignals::new()),
            exit: process_exit(),
            version: None,
        }
    }

    /// Adds event subscribers next to the built-in [`LogWriter`].
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers.extend(subscribers);
        self
    }

    /// Adds a subsystem.
    pub fn with_subsystem(mut self, subsystem: SubsystemRef) -> Self {
        self.subsystems.push(subsystem);
        self
    }

    /// Adds several subsystems, keeping their order.
    pub fn with_subsystems(mut self, subsystems: impl IntoIterator<Item = SubsystemRef>) -> Self {
        self.subsystems.extend(subsystems);
        self
    }

    /// Appends a before-run hook.
    pub fn before_run<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.before_run.push(hook);
        self
    }

    /// Appends a before-shutdown hook.
    pub fn before_shutdown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.before_shutdown.push(hook);
        self
    }

    /// Wires an extension registry into the lifecycle.
    ///
    /// Appends a before-run hook booting the registry and a before-shutdown
    /// hook shutting it down, so extensions drain while every subsystem is
    /// still alive. Hook order follows the call order on this builder.
    pub fn with_extensions(self, registry: Arc<Registry>) -> Self {
        let boot = Arc::clone(&registry);
        self.before_run(move |_ctx| {
            let registry = Arc::clone(&boot);
            async move { registry.boot().await.map_err(HookError::from) }
        })
        .before_shutdown(move |_ctx| {
            let registry = Arc::clone(&registry);
            async move { registry.shutdown().await.map_err(HookError::from) }
        })
    }

    /// Replaces the termination signal source.
    pub fn with_signals(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = signals;
        self
    }

    /// Replaces the forced-exit hook (defaults to `std::process::exit`).
    pub fn with_exit_handler<F>(mut self, exit: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit = Arc::new(exit);
        self
    }

    /// Records build metadata.
    pub fn with_version(
        mut self,
        version: impl Into<String>,
        build_user: impl Into<String>,
        build_time: impl Into<String>,
    ) -> Self {
        self.version = Some(BuildInfo {
            version: version.into(),
            build_user: build_user.into(),
            build_time: build_time.into(),
        });
        self
    }

    /// Builds the orchestrator.
    ///
    /// Spawns the subscriber workers and the bus listener feeding them, so it
    /// must be called from within a tokio runtime.
    pub fn build(self) -> Orchestrator {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let delivery = subscriber_listener(&bus, subs);

        Orchestrator {
            cfg: self.cfg,
            bus,
            subsystems: self.subsystems,
            before_run: self.before_run,
            before_shutdown: self.before_shutdown,
            signals: self.signals,
            exit: self.exit,
            version: self.version,
            delivery: Mutex::new(Some(delivery)),
        }
    }
}

/// Forwards bus events to the subscriber set until a terminal event, then
/// closes the subscriber queues and waits for the workers to drain them.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let last = ev.kind.is_terminal();
                    subs.emit(ev);
                    if last {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
        subs.shutdown().await;
    })
}

impl Orchestrator {
    /// Starts building an orchestrator.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }
}
