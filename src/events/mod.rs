//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the orchestrator's lifecycle tasks, the forced-exit
//!   watcher, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the orchestrator's subscriber listener (fans out to the
//!   `SubscriberSet`) and any receiver obtained from
//!   [`Orchestrator::subscribe`](crate::Orchestrator::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
