//! Error types used by the appvisor runtime, subsystems, hooks and extensions.
//!
//! - [`RuntimeError`] - errors raised by the orchestrator itself.
//! - [`SubsystemError`] - errors raised by a subsystem's `run` or `shutdown`.
//! - [`HookError`] - errors raised by before-run / before-shutdown hooks.
//! - [`ExtensionError`] - errors raised by a single extension.
//! - [`RegistryError`] - errors raised by a registry boot or shutdown pass.
//! - [`ShutdownErrors`] - ordered collection of extension shutdown failures.
//!
//! Every enum provides `as_label` (stable snake_case label for logs/metrics).

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the orchestrator.
///
/// Only [`RuntimeError::BeforeRun`] is ever returned from
/// [`Orchestrator::run`](crate::Orchestrator::run); the other variants are
/// reported as events once subsystems have started.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A before-run hook failed; no subsystem was started.
    #[error("before-run hook failed: {0}")]
    BeforeRun(#[source] HookError),

    /// A before-shutdown hook failed; remaining hooks were skipped.
    #[error("before-shutdown hook failed: {0}")]
    BeforeShutdown(#[source] HookError),

    /// A subsystem's `run` returned an error.
    #[error("subsystem {name} failed: {source}")]
    Subsystem {
        /// Subsystem name.
        name: String,
        /// Underlying failure.
        #[source]
        source: SubsystemError,
    },

    /// A subsystem's `shutdown` returned an error.
    #[error("subsystem {name} shutdown failed: {source}")]
    SubsystemShutdown {
        /// Subsystem name.
        name: String,
        /// Underlying failure.
        #[source]
        source: SubsystemError,
    },

    /// The orchestrator was started without any subsystem.
    #[error("no subsystems registered")]
    NoSubsystems,

    /// A lifecycle task panicked.
    #[error("lifecycle task panicked: {reason}")]
    Panicked {
        /// Panic payload, when it was a string.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::NoSubsystems.as_label(), "no_subsystems");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::BeforeRun(_) => "before_run_hook_failed",
            RuntimeError::BeforeShutdown(_) => "before_shutdown_hook_failed",
            RuntimeError::Subsystem { .. } => "subsystem_failed",
            RuntimeError::SubsystemShutdown { .. } => "subsystem_shutdown_failed",
            RuntimeError::NoSubsystems => "no_subsystems",
            RuntimeError::Panicked { .. } => "lifecycle_panicked",
        }
    }

    /// Name of the subsystem involved, if any.
    pub fn subsystem(&self) -> Option<&str> {
        match self {
            RuntimeError::Subsystem { name, .. } | RuntimeError::SubsystemShutdown { name, .. } => {
                Some(name.as_str())
            }
            _ => None,
        }
    }
}

/// # Errors produced by a subsystem.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SubsystemError {
    /// The subsystem failed while running or stopping.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The shutdown deadline expired before the subsystem stopped.
    ///
    /// Reported by the orchestrator when `shutdown` returns `Ok` only after
    /// its deadline token fired; subsystems may also return it themselves.
    #[error("shutdown deadline of {timeout:?} exceeded")]
    DeadlineExceeded {
        /// Configured deadline.
        timeout: Duration,
    },

    /// `shutdown` was called on a subsystem that never started.
    #[error("subsystem is not running")]
    NotRunning,

    /// I/O failure (bind, accept, broker connection, ...).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SubsystemError {
    /// Convenience constructor for [`SubsystemError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        SubsystemError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubsystemError::Fail { .. } => "subsystem_fail",
            SubsystemError::DeadlineExceeded { .. } => "subsystem_deadline_exceeded",
            SubsystemError::NotRunning => "subsystem_not_running",
            SubsystemError::Io(_) => "subsystem_io",
        }
    }
}

/// # Errors produced by lifecycle hooks.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HookError {
    /// The hook failed.
    #[error("{error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// A registry boot/shutdown pass wired as a hook failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl HookError {
    /// Convenience constructor for [`HookError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        HookError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HookError::Fail { .. } => "hook_fail",
            HookError::Registry(e) => e.as_label(),
        }
    }
}

/// # Errors produced by a single extension.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// The extension failed to boot or shut down.
    #[error("{error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExtensionError {
    /// Convenience constructor for [`ExtensionError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        ExtensionError::Fail {
            error: error.into(),
        }
    }
}

/// # Errors produced by a registry pass.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// An extension failed to boot; the remaining extensions were not booted.
    #[error("extension {extension} failed to boot: {source}")]
    Boot {
        /// Name of the failing extension.
        extension: String,
        /// Underlying failure.
        #[source]
        source: ExtensionError,
    },

    /// One or more extensions failed to shut down.
    #[error(transparent)]
    Shutdown(#[from] ShutdownErrors),
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::Boot { .. } => "extension_boot_failed",
            RegistryError::Shutdown(_) => "extension_shutdown_failed",
        }
    }
}

/// Ordered collection of extension shutdown failures.
///
/// Every failure is kept, in the order the extensions were shut down.
/// Displays one `name: error` pair per line.
#[derive(Debug, Default)]
pub struct ShutdownErrors {
    errors: Vec<(String, ExtensionError)>,
}

impl ShutdownErrors {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the failure of `extension`.
    pub fn push(&mut self, extension: impl Into<String>, err: ExtensionError) {
        self.errors.push((extension.into(), err));
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if nothing failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates over `(extension, error)` pairs in shutdown order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtensionError)> {
        self.errors.iter().map(|(name, err)| (name.as_str(), err))
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ShutdownErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, err)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{name}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ShutdownErrors {}
