//! Worker lifecycle state

use core::fmt;

/// State of a pool worker
///
/// ```text
/// Starting ──► Idle ◄──► Running
///               ▲ │
///               │ ▼
///            Suspended          any ──► Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Thread spawned, not yet counted alive
    Starting = 0,

    /// Blocked on the wake signal waiting for work
    Idle = 1,

    /// Executing a job
    Running = 2,

    /// Parked by `pause()` until `resume()`
    Suspended = 3,

    /// Loop exited; terminal
    Stopped = 4,
}

impl WorkerState {
    /// Check if the worker thread has left its loop
    #[inline]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, WorkerState::Stopped)
    }

    /// Check if the worker is currently executing a job
    #[inline]
    pub const fn is_busy(&self) -> bool {
        matches!(self, WorkerState::Running)
    }
}

impl From<u8> for WorkerState {
    fn from(v: u8) -> Self {
        match v {
            0 => WorkerState::Starting,
            1 => WorkerState::Idle,
            2 => WorkerState::Running,
            3 => WorkerState::Suspended,
            4 => WorkerState::Stopped,
            _ => WorkerState::Starting,
        }
    }
}

impl From<WorkerState> for u8 {
    fn from(state: WorkerState) -> u8 {
        state as u8
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Starting => "starting",
            WorkerState::Idle => "idle",
            WorkerState::Running => "running",
            WorkerState::Suspended => "suspended",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}
