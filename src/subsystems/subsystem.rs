//! # Subsystem abstraction.
//!
//! A subsystem is a long-running unit of the service (an HTTP listener, a
//! message-bus consumer) with a blocking [`run`](Subsystem::run) and a
//! [`shutdown`](Subsystem::shutdown) that makes `run` return.
//!
//! ## Contract
//! - `run` returns exactly once per call: `Ok(())` on a clean stop, `Err` on failure.
//! - `shutdown` is called at most once per orchestrator run and must
//!   eventually make a pending `run` return.
//! - `shutdown` receives a token that is cancelled when the configured
//!   deadline ([`Config::shutdown_timeout`](crate::Config::shutdown_timeout))
//!   expires; implementations should give up once it fires.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SubsystemError;

/// # Independently runnable unit of the service.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use appvisor::{Subsystem, SubsystemError};
///
/// struct Consumer {
///     stop: CancellationToken,
/// }
///
/// #[async_trait]
/// impl Subsystem for Consumer {
///     fn name(&self) -> &str { "consumer" }
///
///     async fn run(&self) -> Result<(), SubsystemError> {
///         self.stop.cancelled().await;
///         Ok(())
///     }
///
///     async fn shutdown(&self, _ctx: CancellationToken) -> Result<(), SubsystemError> {
///         self.stop.cancel();
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Subsystem: Send + Sync + 'static {
    /// Returns a stable, human-readable subsystem name.
    fn name(&self) -> &str;

    /// Runs until stopped or failed.
    async fn run(&self) -> Result<(), SubsystemError>;

    /// Requests a stop; `ctx` is cancelled when the shutdown deadline expires.
    async fn shutdown(&self, ctx: CancellationToken) -> Result<(), SubsystemError>;
}

/// Shared handle to a subsystem.
pub type SubsystemRef = Arc<dyn Subsystem>;
