//! # Extension registry - ordered boot/shutdown of extensions.
//!
//! ## Architecture
//! ```text
//! register(ext) ──► lock ─► push ─► read `booted` ─► unlock
//!                                        └─ booted? ─► ext.boot()   (late boot, logged on error)
//!
//! boot()     ──► snapshot ─► ext[0].boot() ─► ext[1].boot() ─► ... ─► lock ─► booted = true
//!                               └─ first error aborts, `booted` stays false
//!
//! shutdown() ──► snapshot ─► ext[0].shutdown() ─► ext[1].shutdown() ─► ... ─► ShutdownErrors
//! ```
//!
//! ## Rules
//! - Registration order is boot order and shutdown order.
//! - `boot` flips the flag only after a complete pass; a retry restarts from the first extension.
//! - Extensions registered while a boot pass runs are booted by that pass.
//! - `shutdown` never short-circuits: every extension is called, every failure is kept.
//! - The lock guards the list and the flag only; it is never held across an extension call,
//!   so it is a plain `std` mutex and the read accessors are synchronous.
//! - `register` is async only for the late boot; the append itself never waits.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::error::{RegistryError, ShutdownErrors};
use crate::extensions::ExtensionRef;

static GLOBAL: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

#[derive(Default)]
struct State {
    extensions: Vec<ExtensionRef>,
    booted: bool,
}

/// Ordered registry of extensions with a one-way boot flag.
#[derive(Default)]
pub struct Registry {
    state: Mutex<State>,
}

impl Registry {
    /// Creates an isolated registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    // Extension calls never happen under the lock, so a poisoned state is still consistent.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `ext`; boots it right away if the registry already booted.
    ///
    /// Always succeeds: a late boot failure is logged and the extension stays registered.
    pub async fn register(&self, ext: ExtensionRef) {
        let booted = {
            let mut state = self.state();
            state.extensions.push(Arc::clone(&ext));
            state.booted
        };

        if booted {
            debug!(extension = ext.name(), "late registration, booting now");
            if let Err(err) = ext.boot().await {
                error!(extension = ext.name(), error = %err, "extension boot failed");
            }
        }
    }

    /// Boots every extension in registration order.
    ///
    /// No-op once booted. Returns the first failure; the registry then stays
    /// un-booted and a later call starts over from the first extension.
    pub async fn boot(&self) -> Result<(), RegistryError> {
        let mut next = 0;
        loop {
            let pending: Vec<ExtensionRef> = {
                let mut state = self.state();
                if state.booted {
                    return Ok(());
                }
                if next == state.extensions.len() {
                    state.booted = true;
                    return Ok(());
                }
                state.extensions[next..].to_vec()
            };

            for ext in pending {
                ext.boot().await.map_err(|source| RegistryError::Boot {
                    extension: ext.name().to_string(),
                    source,
                })?;
                next += 1;
            }
        }
    }

    /// Shuts every extension down in registration order, collecting all failures.
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        let mut errors = ShutdownErrors::new();
        for ext in self.extensions() {
            if let Err(err) = ext.shutdown().await {
                debug!(extension = ext.name(), error = %err, "extension shutdown failed");
                errors.push(ext.name(), err);
            }
        }
        errors.into_result().map_err(RegistryError::Shutdown)
    }

    /// Snapshot of registered extensions, in registration order.
    pub fn extensions(&self) -> Vec<ExtensionRef> {
        self.state().extensions.clone()
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.state().extensions.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.state().extensions.is_empty()
    }

    /// Returns `true` once a boot pass completed.
    pub fn is_booted(&self) -> bool {
        self.state().booted
    }
}
