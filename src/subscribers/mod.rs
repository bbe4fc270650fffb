//! # Lifecycle event subscribers.
//!
//! ```text
//! lifecycle task ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                                ┌───────┴───────┐
//!                                                                ▼               ▼
//!                                                            LogWriter     custom Subscribe
//! ```
//!
//! - [`Subscribe`]: trait for custom handlers (metrics, alerts, audit).
//! - [`SubscriberSet`]: per-subscriber queues and workers.
//! - [`LogWriter`]: built-in `tracing` writer.

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
