//! Worker wake signal
//!
//! A binary, level-triggered gate that idle workers block on while the job
//! queue is empty. It is a blocking hint, not a counter: two signals with no
//! wait in between collapse into one pending wake-up. The job queue makes up
//! for that by re-signalling after every pull that leaves work behind.

use std::time::Duration;

/// Binary gate idle workers wait on
///
/// Wake sources (push, pull with work remaining, teardown broadcast) call
/// `signal_one()` or `signal_all()`. Waiters call `wait()`, which consumes
/// the open gate.
pub trait WakeSignal: Send + Sync {
    /// Open the gate and wake at least one waiter
    fn signal_one(&self);

    /// Open the gate and wake every waiter
    fn signal_all(&self);

    /// Block until the gate is open, then close it
    ///
    /// Returns:
    /// - `true` if the gate was consumed by this caller
    /// - `false` if `timeout` elapsed first
    fn wait(&self, timeout: Option<Duration>) -> bool;

    /// Force the gate closed
    fn reset(&self);

    /// Whether the gate is currently open (hint, may be stale)
    fn is_open(&self) -> bool;

    /// Number of threads currently blocked in `wait()` (hint, may be stale)
    fn waiters(&self) -> usize;
}

// Platform-specific implementations
mod fallback;
pub use fallback::CondvarSignal;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexSignal;
        pub use futex_linux::FutexSignal as PlatformSignal;
    } else {
        pub use fallback::CondvarSignal as PlatformSignal;
    }
}

/// Create a new platform-appropriate wake signal, initially closed
pub fn new_wake_signal() -> Box<dyn WakeSignal> {
    Box::new(PlatformSignal::new())
}
