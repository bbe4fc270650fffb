//! Runtime core: orchestration and lifecycle.
//!
//! Internal modules:
//! - [`orchestrator`]: runs subsystems, sequences hooks, drives shutdown;
//! - [`builder`]: assembles an orchestrator and its event plumbing;
//! - [`signals`]: termination signal sources (OS and programmatic);
//! - [`watcher`]: forced-exit state machine;
//! - [`config`]: runtime settings.

mod builder;
mod config;
mod orchestrator;
mod signals;
mod watcher;

pub use builder::OrchestratorBuilder;
pub use config::Config;
pub use orchestrator::{BuildInfo, Orchestrator};
pub use signals::{ManualSignals, OsSignals, SignalSource};
pub use watcher::{ExitFn, WatcherState};
