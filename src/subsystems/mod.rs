//! # Subsystem abstractions.
//!
//! - [`Subsystem`] - trait for long-running units with `run`/`shutdown`
//! - [`SubsystemRef`] - shared handle (`Arc<dyn Subsystem>`)
//! - [`SubsystemFn`], [`CancellableSubsystem`] - closure-backed implementations

mod subsystem;
mod subsystem_fn;

pub use subsystem::{Subsystem, SubsystemRef};
pub use subsystem_fn::{CancellableSubsystem, SubsystemFn};
