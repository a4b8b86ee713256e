//! # tpool - fixed-size worker pool
//!
//! Runs caller-submitted jobs on a fixed set of OS threads, decoupling
//! submission from execution.
//!
//! ## Features
//!
//! - **FIFO**: jobs are pulled in submission order
//! - **Unbounded queue**: `submit` never blocks waiting for a worker
//! - **Idle barrier**: `wait()` returns once nothing is queued or running
//! - **Pause/resume**: cooperative, checked at the top of each worker loop
//! - **Teardown**: bounded grace period, then unbounded polling; never
//!   returns with a worker still running
//!
//! ## Quick Start
//!
//! ```ignore
//! use tpool::ThreadPool;
//!
//! fn main() -> Result<(), tpool::PoolError> {
//!     let pool = ThreadPool::new(4)?;
//!
//!     for i in 0..40 {
//!         pool.submit(|n: usize| println!("working on {}", n), i)?;
//!     }
//!
//!     pool.wait();
//!     pool.destroy();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   submit(action, arg)
//!          │
//!          ▼
//! ┌──────────────────────────┐    signal_one     ┌──────────────┐
//! │         JobQueue         │ ────────────────► │  WakeSignal  │
//! │  Mutex<VecDeque<Job>>    │                   │ (binary gate)│
//! └──────────────────────────┘                   └──────────────┘
//!          │ pull                                        │ wait
//!          ▼                                             ▼
//!    ┌───────────┐      ┌───────────┐      ┌───────────┐
//!    │  Worker 0 │      │  Worker 1 │ ...  │  Worker N │
//!    └───────────┘      └───────────┘      └───────────┘
//!          │ busy/alive counts, idle barrier
//!          ▼
//!    ┌──────────────────────────────────────────────────┐
//!    │                    ThreadPool                    │
//!    │      wait / pause / resume / destroy             │
//!    └──────────────────────────────────────────────────┘
//! ```

// Re-export core types
pub use tpool_core::{AllocError, Job, PoolError, PoolResult, WorkerError, WorkerState};

// Re-export kprint macros for debug logging
pub use tpool_core::{kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use tpool_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use tpool_core::{env_get, env_get_bool, env_get_opt, env_get_str};

// Re-export runtime types
pub use tpool_runtime::{
    current_worker_id,
    JobQueue,
    PoolConfig,
    ThreadPool,
    WakeSignal,
};
