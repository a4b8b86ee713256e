//! # tpool-runtime
//!
//! Platform-specific runtime for the tpool worker pool.
//!
//! This crate provides:
//! - Wake signal for idle workers (futex on Linux, condvar elsewhere)
//! - FIFO job queue paired with the wake signal
//! - Worker thread loop with pause/resume
//! - The pool itself: submission, idle barrier, two-phase teardown
//! - Configuration with environment overrides

pub mod config;
pub mod wake;
pub mod queue;
pub mod worker;
pub mod pool;

// Re-exports
pub use config::PoolConfig;
pub use pool::ThreadPool;
pub use queue::JobQueue;
pub use wake::{new_wake_signal, WakeSignal};
pub use worker::current_worker_id;
