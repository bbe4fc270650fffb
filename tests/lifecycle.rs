use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::Receiver;
use tokio_util::sync::CancellationToken;

use appvisor::{
    Config, Event, EventKind, Extension, ExtensionError, HookError, ManualSignals, Orchestrator,
    OrchestratorBuilder, Registry, RuntimeError, Subscribe, Subsystem, SubsystemError,
    SubsystemFn, SubsystemRef,
};

type Log = Arc<Mutex<Vec<String>>>;
type Exits = Arc<Mutex<Vec<i32>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{entry} missing from {log:?}"))
}

/// Subsystem that records its calls; `run` blocks until `shutdown` unless it fails.
struct Probe {
    name: &'static str,
    log: Log,
    stop: CancellationToken,
    fail: bool,
}

impl Probe {
    fn stopping(name: &'static str, log: &Log) -> SubsystemRef {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
            stop: CancellationToken::new(),
            fail: false,
        })
    }

    fn failing(name: &'static str, log: &Log) -> SubsystemRef {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
            stop: CancellationToken::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl Subsystem for Probe {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self) -> Result<(), SubsystemError> {
        self.log.lock().unwrap().push(format!("{}:run", self.name));
        if self.fail {
            return Err(SubsystemError::fail("broker gone"));
        }
        self.stop.cancelled().await;
        Ok(())
    }

    async fn shutdown(&self, _ctx: CancellationToken) -> Result<(), SubsystemError> {
        self.log.lock().unwrap().push(format!("{}:shutdown", self.name));
        self.stop.cancel();
        Ok(())
    }
}

struct Recorder {
    name: &'static str,
    log: Log,
}

#[async_trait]
impl Extension for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    async fn boot(&self) -> Result<(), ExtensionError> {
        self.log.lock().unwrap().push(format!("{}:boot", self.name));
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExtensionError> {
        self.log.lock().unwrap().push(format!("{}:shutdown", self.name));
        Ok(())
    }
}

fn hook(
    log: &Log,
    name: &'static str,
    fail: bool,
) -> impl Fn(CancellationToken) -> std::pin::Pin<Box<dyn Future<Output = Result<(), HookError>> + Send>>
+ Send
+ Sync
+ 'static {
    let log = Arc::clone(log);
    move |_ctx| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(name.to_string());
            if fail { Err(HookError::fail(format!("{name} failed"))) } else { Ok(()) }
        })
    }
}

/// Builder wired to programmatic signals and a recording exit handler.
fn builder(cfg: Config, signals: &Arc<ManualSignals>, exits: &Exits) -> OrchestratorBuilder {
    let exits = Arc::clone(exits);
    Orchestrator::builder(cfg)
        .with_signals(Arc::clone(signals) as Arc<dyn appvisor::SignalSource>)
        .with_exit_handler(move |code| exits.lock().unwrap().push(code))
}

async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("lifecycle did not complete in time")
}

async fn wait_for(rx: &mut Receiver<Event>, kind: EventKind) -> Event {
    within(async {
        loop {
            let ev = rx.recv().await.expect("bus closed");
            if ev.kind == kind {
                return ev;
            }
        }
    })
    .await
}

#[tokio::test]
async fn zero_subsystems_reports_and_returns() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let orch = builder(Config::default(), &signals, &exits).build();
    let mut rx = orch.subscribe();

    within(orch.run(CancellationToken::new())).await.unwrap();

    let ev = wait_for(&mut rx, EventKind::LifecycleError).await;
    assert_eq!(ev.label, Some("no_subsystems"));
    assert!(exits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn single_subsystem_is_valid() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let orch = builder(Config::default(), &signals, &exits)
        .with_subsystem(Probe::stopping("http", &log))
        .build();

    signals.raise();
    within(orch.run(CancellationToken::new())).await.unwrap();

    assert!(entries(&log).contains(&"http:shutdown".to_string()));
}

#[tokio::test]
async fn failing_subsystem_stops_the_others() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let orch = builder(Config::default(), &signals, &exits)
        .with_subsystems([
            Probe::stopping("http", &log),
            Probe::failing("consumer", &log),
            Probe::stopping("grpc", &log),
        ])
        .build();
    let mut rx = orch.subscribe();

    within(orch.run(CancellationToken::new())).await.unwrap();

    let log = entries(&log);
    assert!(log.contains(&"http:shutdown".to_string()));
    assert!(log.contains(&"grpc:shutdown".to_string()));

    let ev = wait_for(&mut rx, EventKind::SubsystemFailed).await;
    assert_eq!(ev.subsystem.as_deref(), Some("consumer"));
    assert_eq!(ev.label, Some("subsystem_failed"));
}

#[tokio::test]
async fn immediate_failure_still_shuts_down_the_survivor() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let orch = builder(Config::default(), &signals, &exits)
        .with_subsystem(Probe::stopping("a", &log))
        .with_subsystem(Probe::failing("b", &log))
        .build();

    let res = within(orch.run(CancellationToken::new())).await;

    assert!(res.is_ok());
    assert!(entries(&log).contains(&"a:shutdown".to_string()));
}

#[tokio::test]
async fn before_run_hooks_precede_every_run() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let orch = builder(Config::default(), &signals, &exits)
        .before_run(hook(&log, "h1", false))
        .before_run(hook(&log, "h2", false))
        .before_run(hook(&log, "h3", false))
        .with_subsystems([Probe::stopping("a", &log), Probe::stopping("b", &log)])
        .build();

    signals.raise();
    within(orch.run(CancellationToken::new())).await.unwrap();

    let log = entries(&log);
    assert_eq!(log[..3], ["h1", "h2", "h3"]);
    assert!(position(&log, "a:run") > 2);
    assert!(position(&log, "b:run") > 2);
}

#[tokio::test]
async fn failing_before_run_hook_starts_nothing() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let orch = builder(Config::default(), &signals, &exits)
        .before_run(hook(&log, "h1", false))
        .before_run(hook(&log, "h2", true))
        .before_run(hook(&log, "h3", false))
        .with_subsystem(Probe::stopping("a", &log))
        .build();
    let mut rx = orch.subscribe();

    let err = within(orch.run(CancellationToken::new())).await.unwrap_err();

    assert!(matches!(err, RuntimeError::BeforeRun(_)));
    assert_eq!(err.as_label(), "before_run_hook_failed");
    assert_eq!(entries(&log), ["h1", "h2"]);
    assert_eq!(wait_for(&mut rx, EventKind::StartupFailed).await.reason.as_deref(), Some("h2 failed"));
}

#[tokio::test]
async fn before_shutdown_hooks_precede_every_shutdown() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let orch = builder(Config::default(), &signals, &exits)
        .before_shutdown(hook(&log, "s1", false))
        .before_shutdown(hook(&log, "s2", false))
        .with_subsystems([Probe::stopping("a", &log), Probe::stopping("b", &log)])
        .build();

    signals.raise();
    within(orch.run(CancellationToken::new())).await.unwrap();

    let log = entries(&log);
    let s1 = position(&log, "s1");
    let s2 = position(&log, "s2");
    assert!(s1 < s2);
    assert!(position(&log, "a:shutdown") > s2);
    assert!(position(&log, "b:shutdown") > s2);
}

#[tokio::test]
async fn failing_before_shutdown_hook_still_stops_everything() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let orch = builder(Config::default(), &signals, &exits)
        .before_shutdown(hook(&log, "s1", true))
        .before_shutdown(hook(&log, "s2", false))
        .with_subsystems([Probe::stopping("a", &log), Probe::stopping("b", &log)])
        .build();
    let mut rx = orch.subscribe();

    signals.raise();
    within(orch.run(CancellationToken::new())).await.unwrap();

    let log = entries(&log);
    assert!(!log.contains(&"s2".to_string()));
    assert!(position(&log, "a:shutdown") > position(&log, "s1"));
    assert!(position(&log, "b:shutdown") > position(&log, "s1"));

    let ev = wait_for(&mut rx, EventKind::ShutdownHookFailed).await;
    assert_eq!(ev.label, Some("before_shutdown_hook_failed"));
}

#[tokio::test]
async fn second_signal_forces_exit() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let cfg = Config {
        force_exit_code: 7,
        ..Config::default()
    };
    let stuck = SubsystemFn::arc(
        "stuck",
        || futures::future::pending::<Result<(), SubsystemError>>(),
        |_ctx: CancellationToken| futures::future::pending::<Result<(), SubsystemError>>(),
    );
    let orch = builder(cfg, &signals, &exits).with_subsystem(stuck).build();
    let mut rx = orch.subscribe();

    signals.raise();
    let (res, ()) = tokio::join!(within(orch.run(CancellationToken::new())), async {
        wait_for(&mut rx, EventKind::GraceWindowOpened).await;
        signals.raise();
    });

    assert!(res.is_ok());
    assert_eq!(*exits.lock().unwrap(), [7]);
}

#[tokio::test]
async fn cancelled_context_drives_graceful_shutdown() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let orch = builder(Config::default(), &signals, &exits)
        .with_subsystem(Probe::stopping("a", &log))
        .build();
    let mut rx = orch.subscribe();
    let ctx = CancellationToken::new();

    let (res, ()) = tokio::join!(within(orch.run(ctx.clone())), async {
        wait_for(&mut rx, EventKind::Serving).await;
        ctx.cancel();
    });

    assert!(res.is_ok());
    assert!(entries(&log).contains(&"a:shutdown".to_string()));
    assert!(exits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn registry_boots_before_run_and_drains_before_shutdown() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let registry = Arc::new(Registry::new());
    registry
        .register(Arc::new(Recorder {
            name: "probe",
            log: Arc::clone(&log),
        }))
        .await;

    let orch = builder(Config::default(), &signals, &exits)
        .with_extensions(Arc::clone(&registry))
        .with_subsystem(Probe::stopping("http", &log))
        .build();

    signals.raise();
    within(orch.run(CancellationToken::new())).await.unwrap();

    let log = entries(&log);
    assert!(position(&log, "probe:boot") < position(&log, "http:run"));
    assert!(position(&log, "probe:shutdown") < position(&log, "http:shutdown"));
    assert!(registry.is_booted());
}

#[tokio::test]
async fn shutdown_deadline_cancels_the_context() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let cfg = Config {
        shutdown_timeout: Duration::from_millis(50),
        ..Config::default()
    };
    let stop = CancellationToken::new();
    let run_stop = stop.clone();
    let slow = SubsystemFn::arc(
        "slow",
        move || {
            let stop = run_stop.clone();
            async move {
                stop.cancelled().await;
                Ok::<_, SubsystemError>(())
            }
        },
        move |ctx: CancellationToken| {
            let stop = stop.clone();
            async move {
                ctx.cancelled().await;
                stop.cancel();
                Err(SubsystemError::DeadlineExceeded {
                    timeout: Duration::from_millis(50),
                })
            }
        },
    );
    let orch = builder(cfg, &signals, &exits).with_subsystem(slow).build();
    let mut rx = orch.subscribe();

    signals.raise();
    within(orch.run(CancellationToken::new())).await.unwrap();

    let ev = wait_for(&mut rx, EventKind::SubsystemShutdownFailed).await;
    assert_eq!(ev.subsystem.as_deref(), Some("slow"));
    assert_eq!(ev.label, Some("subsystem_shutdown_failed"));
}

#[tokio::test]
async fn serving_event_reports_build_info() {
    let signals = Arc::new(ManualSignals::new());
    let exits: Exits = Default::default();
    let log = log();
    let mut orch = builder(Config::default(), &signals, &exits)
        .with_subsystem(Probe::stopping("a", &log))
        .build();
    orch.set_version("1.4.2", "ci", "2024-05-01");
    orch.add_before_run_hook(hook(&log, "late", false));
    let mut rx = orch.subscribe();

    signals.raise();
    within(orch.run(CancellationToken::new())).await.unwrap();

    let ev = wait_for(&mut rx, EventKind::Serving).await;
    assert_eq!(
        ev.reason.as_deref(),
        Some("version=1.4.2 build_user=ci build_time=2024-05-01")
    );
    assert_eq!(entries(&log)[0], "late");
}

/// Subscriber recording every delivered event kind.
struct Kinds(Arc<Mutex<Vec<EventKind>>>);

#[async_trait]
impl Subscribe for Kinds {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "kinds"
    }
}

/// Runs a lifecycle with one failing subsystem on a dedicated runtime and
/// drops the runtime as soon as `run` returned.
fn run_failing_lifecycle(extra: Vec<Arc<dyn Subscribe>>) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    rt.block_on(async move {
        let signals = Arc::new(ManualSignals::new());
        let exits: Exits = Default::default();
        let orch = builder(Config::default(), &signals, &exits)
            .with_subscribers(extra)
            .with_subsystem(Probe::failing("consumer", &log()))
            .build();
        orch.run(CancellationToken::new()).await.unwrap();
    });
    drop(rt);
}

#[test]
fn subscribers_see_final_events_before_run_returns() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    run_failing_lifecycle(vec![Arc::new(Kinds(Arc::clone(&seen)))]);

    let seen = seen.lock().unwrap();
    assert!(seen.contains(&EventKind::SubsystemFailed), "{seen:?}");
    assert_eq!(seen.last(), Some(&EventKind::AllStopped), "{seen:?}");
}

#[test]
fn startup_failure_is_delivered_before_run_returns() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let sink = Arc::clone(&seen);
    rt.block_on(async move {
        let signals = Arc::new(ManualSignals::new());
        let exits: Exits = Default::default();
        let orch = builder(Config::default(), &signals, &exits)
            .with_subscribers(vec![Arc::new(Kinds(sink))])
            .before_run(hook(&log(), "migrate", true))
            .with_subsystem(Probe::stopping("http", &log()))
            .build();
        assert!(orch.run(CancellationToken::new()).await.is_err());
    });
    drop(rt);

    assert_eq!(*seen.lock().unwrap(), [EventKind::StartupFailed]);
}

/// `io::Write` sink shared with the test.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn log_writer_records_failures_before_run_returns() {
    let out = Captured::default();
    let writer = out.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::new("appvisor=debug"))
        .finish();

    tracing::subscriber::with_default(subscriber, || run_failing_lifecycle(Vec::new()));

    let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
    assert!(text.contains("subsystem failed"), "{text}");
    assert!(text.contains("broker gone"), "{text}");
    assert!(text.contains("consumer"), "{text}");
    assert!(text.contains("stopped"), "{text}");
}
