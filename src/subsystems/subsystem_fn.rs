//! # Closure-backed subsystems.
//!
//! - [`SubsystemFn`] pairs a `run` closure with a `shutdown` closure, for
//!   wrapping an existing server/consumer handle.
//! - [`CancellableSubsystem`] hands a stop token to a single closure;
//!   `shutdown` cancels it. Every `run` call builds a fresh future.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use appvisor::{CancellableSubsystem, Subsystem, SubsystemError, SubsystemRef};
//!
//! let ticker: SubsystemRef = CancellableSubsystem::arc("ticker", |stop: CancellationToken| async move {
//!     while !stop.is_cancelled() {
//!         tokio::select! {
//!             _ = stop.cancelled() => {}
//!             _ = tokio::time::sleep(Duration::from_secs(1)) => {}
//!         }
//!     }
//!     Ok::<_, SubsystemError>(())
//! });
//!
//! assert_eq!(ticker.name(), "ticker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SubsystemError;
use crate::subsystems::Subsystem;

/// Subsystem built from a `run` closure and a `shutdown` closure.
pub struct SubsystemFn<R, S> {
    name: Cow<'static, str>,
    run: R,
    shutdown: S,
}

impl<R, S> SubsystemFn<R, S> {
    /// Creates a new closure-backed subsystem.
    pub fn new(name: impl Into<Cow<'static, str>>, run: R, shutdown: S) -> Self {
        Self {
            name: name.into(),
            run,
            shutdown,
        }
    }

    /// Creates the subsystem and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, run: R, shutdown: S) -> Arc<Self> {
        Arc::new(Self::new(name, run, shutdown))
    }
}

#[async_trait]
impl<R, RF, S, SF> Subsystem for SubsystemFn<R, S>
where
    R: Fn() -> RF + Send + Sync + 'static,
    RF: Future<Output = Result<(), SubsystemError>> + Send + 'static,
    S: Fn(CancellationToken) -> SF + Send + Sync + 'static,
    SF: Future<Output = Result<(), SubsystemError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), SubsystemError> {
        (self.run)().await
    }

    async fn shutdown(&self, ctx: CancellationToken) -> Result<(), SubsystemError> {
        (self.shutdown)(ctx).await
    }
}

/// Subsystem driven by a stop token.
///
/// `run` calls the closure with the stop token; `shutdown` cancels it and
/// returns immediately.
pub struct CancellableSubsystem<F> {
    name: Cow<'static, str>,
    stop: CancellationToken,
    f: F,
}

impl<F> CancellableSubsystem<F> {
    /// Creates a new token-driven subsystem.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            stop: CancellationToken::new(),
            f,
        }
    }

    /// Creates the subsystem and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Subsystem for CancellableSubsystem<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SubsystemError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), SubsystemError> {
        (self.f)(self.stop.clone()).await
    }

    async fn shutdown(&self, _ctx: CancellationToken) -> Result<(), SubsystemError> {
        self.stop.cancel();
        Ok(())
    }
}
