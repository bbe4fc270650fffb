//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the orchestrator runtime.
//!
//! ## Sentinel values
//! - `shutdown_timeout = 0s` → no deadline on subsystem shutdown
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Global configuration for the orchestrator runtime.
///
/// ## Field semantics
/// - `shutdown_timeout`: Deadline handed to every subsystem `shutdown` (`0s` = none)
/// - `force_exit_code`: Process exit status used on a forced exit
/// - `bus_capacity`: Event bus ring buffer size (min 1)
///
/// All fields are public. Prefer the accessors to avoid spreading sentinel
/// checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Deadline for each subsystem's `shutdown`.
    ///
    /// The token passed to [`Subsystem::shutdown`](crate::Subsystem::shutdown)
    /// is cancelled once it elapses. `Duration::ZERO` disables the deadline.
    pub shutdown_timeout: Duration,

    /// Exit status used when a repeated termination signal forces the process down.
    pub force_exit_code: i32,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events observe `Lagged` and
    /// skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the subsystem shutdown deadline as an `Option`.
    ///
    /// - `None` → wait as long as the subsystem needs
    /// - `Some(d)` → shutdown token cancelled after `d`
    #[inline]
    pub fn shutdown_deadline(&self) -> Option<Duration> {
        if self.shutdown_timeout == Duration::ZERO {
            None
        } else {
            Some(self.shutdown_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `shutdown_timeout = 0s` (no deadline)
    /// - `force_exit_code = 1`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::ZERO,
            force_exit_code: 1,
            bus_capacity: 1024,
        }
    }
}
