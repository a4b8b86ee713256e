//! Pool configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls on the returned config
//! 2. Environment variables (`from_env()` only)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use tpool_runtime::config::PoolConfig;
//!
//! let config = PoolConfig::from_env()
//!     .num_workers(8)
//!     .grace_period(Duration::from_millis(200));
//! ```

pub mod defaults;

use std::time::Duration;
use tpool_core::constants::MAX_WORKERS;
use tpool_core::env::{env_get, env_get_str};
use tpool_core::error::{PoolError, PoolResult};

/// Pool configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads (0 is allowed: jobs queue but never run)
    pub num_workers: usize,
    /// Teardown phase 1: broadcast continuously for this long
    pub grace_period: Duration,
    /// Teardown phase 2: sleep between broadcasts
    pub poll_interval: Duration,
    /// Teardown phase 1: spacing between broadcasts
    pub wake_interval: Duration,
    /// Suspended worker re-check interval
    pub pause_poll: Duration,
    /// Max time an idle worker blocks before re-checking its flags
    pub idle_timeout: Duration,
    /// Worker thread name prefix; threads are named `{prefix}-{id}`
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `TPOOL_NUM_WORKERS` - Number of worker threads
    /// - `TPOOL_GRACE_PERIOD_MS` - Teardown grace period
    /// - `TPOOL_POLL_INTERVAL_MS` - Teardown poll interval after the grace period
    /// - `TPOOL_WAKE_INTERVAL_MS` - Broadcast spacing during the grace period
    /// - `TPOOL_PAUSE_POLL_MS` - Suspended worker re-check interval
    /// - `TPOOL_IDLE_TIMEOUT_MS` - Idle worker re-check interval
    /// - `TPOOL_THREAD_NAME` - Worker thread name prefix
    pub fn from_env() -> Self {
        Self {
            num_workers: env_get("TPOOL_NUM_WORKERS", defaults::num_workers()),
            grace_period: Duration::from_millis(env_get(
                "TPOOL_GRACE_PERIOD_MS",
                defaults::GRACE_PERIOD_MS,
            )),
            poll_interval: Duration::from_millis(env_get(
                "TPOOL_POLL_INTERVAL_MS",
                defaults::POLL_INTERVAL_MS,
            )),
            wake_interval: Duration::from_millis(env_get(
                "TPOOL_WAKE_INTERVAL_MS",
                defaults::WAKE_INTERVAL_MS,
            )),
            pause_poll: Duration::from_millis(env_get(
                "TPOOL_PAUSE_POLL_MS",
                defaults::PAUSE_POLL_MS,
            )),
            idle_timeout: Duration::from_millis(env_get(
                "TPOOL_IDLE_TIMEOUT_MS",
                defaults::IDLE_TIMEOUT_MS,
            )),
            thread_name: env_get_str("TPOOL_THREAD_NAME", defaults::THREAD_NAME),
        }
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            num_workers: defaults::num_workers(),
            grace_period: Duration::from_millis(defaults::GRACE_PERIOD_MS),
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            wake_interval: Duration::from_millis(defaults::WAKE_INTERVAL_MS),
            pause_poll: Duration::from_millis(defaults::PAUSE_POLL_MS),
            idle_timeout: Duration::from_millis(defaults::IDLE_TIMEOUT_MS),
            thread_name: defaults::THREAD_NAME.to_string(),
        }
    }

    // ── Builder methods ──

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn grace_period(mut self, d: Duration) -> Self {
        self.grace_period = d;
        self
    }

    pub fn poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }

    pub fn wake_interval(mut self, d: Duration) -> Self {
        self.wake_interval = d;
        self
    }

    pub fn pause_poll(mut self, d: Duration) -> Self {
        self.pause_poll = d;
        self
    }

    pub fn idle_timeout(mut self, d: Duration) -> Self {
        self.idle_timeout = d;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> PoolResult<()> {
        if self.num_workers > MAX_WORKERS {
            return Err(PoolError::InvalidConfig("num_workers exceeds maximum"));
        }
        if self.poll_interval.is_zero() {
            return Err(PoolError::InvalidConfig("poll_interval must be non-zero"));
        }
        if self.pause_poll.is_zero() {
            return Err(PoolError::InvalidConfig("pause_poll must be non-zero"));
        }
        if self.idle_timeout.is_zero() {
            return Err(PoolError::InvalidConfig("idle_timeout must be non-zero"));
        }
        if self.thread_name.is_empty() {
            return Err(PoolError::InvalidConfig("thread_name must not be empty"));
        }
        if self.thread_name.contains('\0') {
            return Err(PoolError::InvalidConfig("thread_name must not contain NUL"));
        }
        Ok(())
    }
}
