//! # appvisor
//!
//! **Appvisor** is a process-lifecycle library for long-running Rust services.
//!
//! It runs a set of independent subsystems (HTTP servers, consumers, workers)
//! concurrently, sequences user hooks around startup and shutdown, and turns
//! termination signals into a coordinated graceful stop with an escape hatch:
//! a second signal during shutdown terminates the process at once.
//! A small extension [`Registry`] boots pluggable components in order and
//! shuts them all down, collecting every failure.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Subsystem   │   │  Subsystem   │   │  Extension   │
//!     │   (http)     │   │  (consumer)  │   │  (registry)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼ (before-run / before-shutdown hooks)
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - HookChain x2 (before-run, before-shutdown)                     │
//! │  - SignalSource (SIGINT/SIGTERM or programmatic)                  │
//! │  - ForceExitWatcher (Armed ─► GraceWindow ─► ForceKill)           │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     run task           stop task         coordinator         │
//!     S.run()            S.shutdown()      hooks, then stops   │
//!        │                  │                  │               │
//!        ▼                  ▼                  ▼               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                           (per-sub queues)
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                    LogWriter   worker2    workerN
//!                    (tracing)
//! ```
//!
//! ### Lifecycle
//! ```text
//! run(ctx)
//!   ├─► before-run hooks ── Err ──► return Err(RuntimeError::BeforeRun)
//!   ├─► spawn S.run() for every subsystem
//!   ├─► wait for: signal | S.run() error | ctx cancelled
//!   ├─► before-shutdown hooks (an error is reported, stop continues)
//!   ├─► cancel every stop token ─► S.shutdown() concurrently
//!   └─► all tasks joined ─► Ok(())
//!
//! second signal while stopping ─► exit(force_exit_code)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Orchestration** | Run subsystems and drive a graceful shutdown.                 | [`Orchestrator`], [`OrchestratorBuilder`]   |
//! | **Subsystems**    | Units of work with `run` and `shutdown`.                      | [`Subsystem`], [`SubsystemFn`], [`CancellableSubsystem`] |
//! | **Hooks**         | Ordered callbacks before run and before shutdown.             | [`HookChain`]                               |
//! | **Extensions**    | Ordered boot, aggregated shutdown, late registration.         | [`Extension`], [`Registry`]                 |
//! | **Signals**       | OS or programmatic termination signals, forced exit.          | [`SignalSource`], [`ManualSignals`]         |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, ...).           | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | Typed errors with stable labels.                              | [`RuntimeError`], [`SubsystemError`]        |
//! | **Configuration** | Centralize runtime settings.                                  | [`Config`]                                  |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use appvisor::{CancellableSubsystem, Config, Orchestrator, Registry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = CancellableSubsystem::arc("worker", |stop: CancellationToken| async move {
//!         stop.cancelled().await;
//!         Ok::<_, appvisor::SubsystemError>(())
//!     });
//!
//!     let orchestrator = Orchestrator::builder(Config::default())
//!         .with_extensions(Registry::global())
//!         .with_subsystem(worker)
//!         .with_version("1.4.2", "ci", "2024-05-01T10:00:00Z")
//!         .build();
//!
//!     orchestrator.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod extensions;
mod hooks;
mod subscribers;
mod subsystems;

// ---- Public re-exports ----

pub use core::{
    BuildInfo, Config, ExitFn, ManualSignals, Orchestrator, OrchestratorBuilder, OsSignals,
    SignalSource, WatcherState,
};
pub use error::{
    ExtensionError, HookError, RegistryError, RuntimeError, ShutdownErrors, SubsystemError,
};
pub use events::{Bus, Event, EventKind};
pub use extensions::{Extension, ExtensionRef, NoopExtension, Registry};
pub use hooks::{Hook, HookChain};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use subsystems::{CancellableSubsystem, Subsystem, SubsystemFn, SubsystemRef};
