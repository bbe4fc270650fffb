//! # Lifecycle hook chains.
//!
//! A [`HookChain`] is an ordered list of async callbacks run at one lifecycle
//! point. The orchestrator owns two of them:
//! - **before-run**: runs with the caller's token before any subsystem starts;
//! - **before-shutdown**: runs with the (already cancelled) shutdown token
//!   before any subsystem receives its stop signal.
//!
//! ## Rules
//! - Pure FIFO: registration order is execution order, no dedup, no priority.
//! - The first failing hook aborts the rest of the chain and its error is returned.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::HookError;

/// A single lifecycle hook.
pub type Hook =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<(), HookError>> + Send + Sync>;

/// Ordered sequence of hooks.
///
/// Cloning is cheap (hooks are shared handles).
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Hook>,
}

impl HookChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook.
    ///
    /// ## Example
    /// ```rust
    /// use tokio_util::sync::CancellationToken;
    /// use appvisor::{HookChain, HookError};
    ///
    /// let mut chain = HookChain::new();
    /// chain.push(|_ctx: CancellationToken| async { Ok::<_, HookError>(()) });
    /// assert_eq!(chain.len(), 1);
    /// ```
    pub fn push<F, Fut>(&mut self, hook: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.hooks.push(Arc::new(move |ctx| hook(ctx).boxed()));
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs every hook in order, stopping at the first failure.
    pub async fn run(&self, ctx: &CancellationToken) -> Result<(), HookError> {
        for hook in &self.hooks {
            hook(ctx.clone()).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for HookChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("len", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recording(
        log: &Log,
        name: &'static str,
        fail: bool,
    ) -> impl Fn(CancellationToken) -> BoxFuture<'static, Result<(), HookError>> + Send + Sync + 'static
    {
        let log = Arc::clone(log);
        move |_ctx| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                if fail { Err(HookError::fail(name)) } else { Ok(()) }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = HookChain::new();
        chain.push(recording(&log, "first", false));
        chain.push(recording(&log, "second", false));
        chain.push(recording(&log, "third", false));

        chain.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn first_failure_aborts_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = HookChain::new();
        chain.push(recording(&log, "first", false));
        chain.push(recording(&log, "second", true));
        chain.push(recording(&log, "third", false));

        let err = chain.run(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "second");
        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
    }

    #[tokio::test]
    async fn hooks_see_the_lifecycle_token() {
        let mut chain = HookChain::new();
        chain.push(|ctx: CancellationToken| async move {
            if ctx.is_cancelled() {
                Ok(())
            } else {
                Err(HookError::fail("expected a cancelled token"))
            }
        });

        let token = CancellationToken::new();
        token.cancel();
        assert!(chain.run(&token).await.is_ok());
    }
}
