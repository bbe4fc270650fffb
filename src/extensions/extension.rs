//! # Extension abstraction.
//!
//! An extension is a self-contained feature (health probe, profiling
//! endpoint, version endpoint) that wants one `boot` and one `shutdown` call
//! per process. Both methods default to no-ops, so a feature only implements
//! the side it needs.
//!
//! Extensions receive nothing from the registry beyond the call itself; they
//! reach shared resources (an HTTP router, a config handle) through their own
//! fields.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ExtensionError;

/// # Feature with its own boot/shutdown behavior.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use async_trait::async_trait;
/// use appvisor::{Extension, ExtensionError};
///
/// /// Readiness flag flipped off before subsystems stop.
/// #[derive(Default)]
/// struct Readiness {
///     ready: AtomicBool,
/// }
///
/// #[async_trait]
/// impl Extension for Readiness {
///     fn name(&self) -> &str { "readiness" }
///
///     async fn boot(&self) -> Result<(), ExtensionError> {
///         self.ready.store(true, Ordering::SeqCst);
///         Ok(())
///     }
///
///     async fn shutdown(&self) -> Result<(), ExtensionError> {
///         self.ready.store(false, Ordering::SeqCst);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Extension: Send + Sync + 'static {
    /// Human-readable name (for logs and aggregated errors).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once per process, in registration order.
    async fn boot(&self) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Called once per process, in registration order, even if an earlier extension failed.
    async fn shutdown(&self) -> Result<(), ExtensionError> {
        Ok(())
    }
}

/// Shared handle to an extension.
pub type ExtensionRef = Arc<dyn Extension>;

/// Extension that does nothing; embed or register it as a placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExtension;

impl Extension for NoopExtension {}
