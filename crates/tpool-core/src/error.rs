//! Error types for the worker pool

use core::fmt;

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors that can occur in pool operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Memory for the queue, a job or the worker table could not be reserved
    Alloc(AllocError),

    /// Worker thread error
    Worker(WorkerError),

    /// Configuration rejected by `validate()`
    InvalidConfig(&'static str),

    /// A bounded wait expired
    Timeout,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Alloc(e) => write!(f, "allocation error: {}", e),
            PoolError::Worker(e) => write!(f, "worker error: {}", e),
            PoolError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            PoolError::Timeout => write!(f, "operation timed out"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Allocation failures, by the structure that could not grow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Job queue storage
    Queue,

    /// A single job slot in the queue
    Job,

    /// Worker table
    Workers,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::Queue => write!(f, "could not allocate job queue"),
            AllocError::Job => write!(f, "could not allocate job"),
            AllocError::Workers => write!(f, "could not allocate worker table"),
        }
    }
}

impl From<AllocError> for PoolError {
    fn from(e: AllocError) -> Self {
        PoolError::Alloc(e)
    }
}

/// Worker thread related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// Failed to spawn worker thread
    SpawnFailed,

    /// Worker thread panicked
    Panicked,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::SpawnFailed => write!(f, "failed to spawn worker thread"),
            WorkerError::Panicked => write!(f, "worker thread panicked"),
        }
    }
}

impl From<WorkerError> for PoolError {
    fn from(e: WorkerError) -> Self {
        PoolError::Worker(e)
    }
}
