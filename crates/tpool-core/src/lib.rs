//! # tpool-core
//!
//! Core types for the tpool worker pool.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Wake signals, the job queue and the worker threads live in `tpool-runtime`.
//!
//! ## Modules
//!
//! - `job` - Unit of work (action plus its argument)
//! - `state` - Worker lifecycle states
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod job;
pub mod state;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use job::Job;
pub use state::WorkerState;
pub use error::{AllocError, PoolError, PoolResult, WorkerError};
pub use env::{env_get, env_get_bool, env_get_opt, env_get_str};

/// Constants shared by the runtime
pub mod constants {
    /// Maximum workers (OS threads) per pool
    pub const MAX_WORKERS: usize = 1024;

    /// Default worker thread name prefix
    pub const DEFAULT_THREAD_NAME: &str = "tpool";
}
