//! # Termination signal sources.
//!
//! [`SignalSource`] abstracts "wait for the next termination signal" so the
//! orchestrator can be driven by real OS signals ([`OsSignals`]) or by code
//! ([`ManualSignals`]) in tests and embedded setups.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//!
//! **Windows:**
//! - `Ctrl-C` via `tokio::signal::windows::ctrl_c`

use async_trait::async_trait;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard, Semaphore};

/// Source of termination signals.
#[async_trait]
pub trait SignalSource: Send + Sync + 'static {
    /// Completes when the next termination signal arrives.
    ///
    /// Returns `Err` if the listener could not be installed.
    async fn wait(&self) -> std::io::Result<()>;
}

/// Process signals.
///
/// The OS listeners are installed on the first [`wait`](SignalSource::wait)
/// and kept for the lifetime of the value, so a signal delivered between two
/// waits is queued for the next one instead of being dropped.
#[derive(Debug, Default)]
pub struct OsSignals {
    streams: Mutex<Option<Streams>>,
}

impl OsSignals {
    /// Creates a source; listeners are installed lazily.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the listeners if needed and returns them locked.
    async fn streams(&self) -> std::io::Result<MappedMutexGuard<'_, Streams>> {
        let mut guard = self.streams.lock().await;
        if guard.is_none() {
            *guard = Some(Streams::install()?);
        }
        MutexGuard::try_map(guard, Option::as_mut)
            .map_err(|_| std::io::Error::other("signal listeners missing"))
    }
}

#[async_trait]
impl SignalSource for OsSignals {
    async fn wait(&self) -> std::io::Result<()> {
        self.streams().await?.recv().await;
        Ok(())
    }
}

#[cfg(unix)]
#[derive(Debug)]
struct Streams {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Streams {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv()  => {},
            _ = self.sigterm.recv() => {},
        }
    }
}

#[cfg(not(unix))]
#[derive(Debug)]
struct Streams {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl Streams {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) {
        self.ctrl_c.recv().await;
    }
}

/// Programmatic signal source.
///
/// Every [`raise`](ManualSignals::raise) is consumed by exactly one
/// [`wait`](SignalSource::wait); raises are counted, so a signal raised
/// before anyone waits is not lost.
///
/// ```rust
/// use appvisor::{ManualSignals, SignalSource};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let signals = ManualSignals::new();
/// signals.raise();
/// signals.wait().await.unwrap();
/// # }
/// ```
#[derive(Debug)]
pub struct ManualSignals {
    pending: Semaphore,
}

impl ManualSignals {
    /// Creates a source with no pending signal.
    pub fn new() -> Self {
        Self {
            pending: Semaphore::new(0),
        }
    }

    /// Delivers one termination signal.
    pub fn raise(&self) {
        self.pending.add_permits(1);
    }
}

impl Default for ManualSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalSource for ManualSignals {
    async fn wait(&self) -> std::io::Result<()> {
        self.pending
            .acquire()
            .await
            .map(|permit| permit.forget())
            .map_err(std::io::Error::other)
    }
}
