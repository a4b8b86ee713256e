//! Compile-time defaults for `PoolConfig`

use tpool_core::constants::{DEFAULT_THREAD_NAME, MAX_WORKERS};

/// Worker count when neither the caller nor `TPOOL_NUM_WORKERS` sets one
pub fn num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_WORKERS)
}

/// Phase-1 teardown window: broadcast continuously for this long
pub const GRACE_PERIOD_MS: u64 = 1000;

/// Phase-2 teardown: sleep between broadcasts once the grace period is over
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Phase-1 teardown: spacing between broadcasts
pub const WAKE_INTERVAL_MS: u64 = 1;

/// How long a suspended worker parks before re-checking its flags
pub const PAUSE_POLL_MS: u64 = 100;

/// Longest an idle worker blocks on the wake signal before re-checking flags
pub const IDLE_TIMEOUT_MS: u64 = 1000;

pub const THREAD_NAME: &str = DEFAULT_THREAD_NAME;
