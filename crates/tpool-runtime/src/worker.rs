//! Worker thread management
//!
//! Each worker is one named OS thread bound to its pool for the pool's
//! whole life. The loop is: wait for work, honour pause, pull one job, run
//! it, report idle. It leaves the loop only once the pool clears its
//! keep-alive flag, or when a job panics and unwinds the thread.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tpool_core::{kdebug, kerror, ktrace, WorkerError, WorkerState};

use crate::pool::PoolShared;

/// Handle to one worker thread
pub struct Worker {
    id: usize,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawn worker `id` running the pool loop
    pub(crate) fn spawn(shared: Arc<PoolShared>, id: usize) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("{}-{}", shared.config.thread_name, id))
            .spawn(move || worker_loop(shared, id))?;
        Ok(Worker { id, handle })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Kick a suspended worker so it re-checks its flags now
    #[inline]
    pub(crate) fn unpark(&self) {
        self.handle.thread().unpark();
    }

    /// Wait for the thread to exit
    pub(crate) fn join(self) -> Result<(), WorkerError> {
        self.handle.join().map_err(|_| WorkerError::Panicked)
    }
}

thread_local! {
    static CURRENT_WORKER_ID: std::cell::Cell<Option<usize>> = const { std::cell::Cell::new(None) };
}

/// Id of the pool worker running the current thread, if any
///
/// Lets a job tell which worker picked it up.
#[inline]
pub fn current_worker_id() -> Option<usize> {
    CURRENT_WORKER_ID.with(|cell| cell.get())
}

/// Restores pool bookkeeping when the loop exits, including by unwinding
/// out of a panicking job.
struct WorkerGuard<'a> {
    shared: &'a PoolShared,
    id: usize,
    busy: bool,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        let panicked = thread::panicking();
        if panicked {
            self.shared.record_panic();
            kerror!("worker {} terminated by a panicking job", self.id);
        }
        self.shared.set_state(self.id, WorkerState::Stopped);
        self.shared.unregister(self.busy);
        kdebug!("worker {} exiting", self.id);
    }
}

/// Worker thread main loop
fn worker_loop(shared: Arc<PoolShared>, id: usize) {
    CURRENT_WORKER_ID.with(|cell| cell.set(Some(id)));

    shared.set_state(id, WorkerState::Idle);
    shared.register_alive();
    let mut guard = WorkerGuard {
        shared: &shared,
        id,
        busy: false,
    };
    kdebug!("worker {} started", id);

    let idle_timeout = shared.config.idle_timeout;

    while shared.keep_alive() {
        // A timed-out wait still falls through when the queue holds work:
        // the gate may have been consumed by a worker that was then paused.
        let woke = shared.queue.wait(Some(idle_timeout));

        if !shared.keep_alive() {
            break;
        }
        if !woke && shared.queue.is_empty() {
            continue;
        }

        // Checked last, right before the pull, so a pause that lands while
        // this worker was waking still holds the job back.
        if shared.is_paused() {
            suspend(&shared, id);
            if !shared.keep_alive() {
                break;
            }
        }

        // Counted busy before the pull, so the idle barrier never sees an
        // empty queue and zero busy workers while a job is in hand.
        shared.begin_job();
        guard.busy = true;
        shared.set_state(id, WorkerState::Running);

        if let Some(job) = shared.queue.pull() {
            ktrace!("worker {} running job #{}", id, job.seq());
            job.run();
        }

        shared.set_state(id, WorkerState::Idle);
        guard.busy = false;
        shared.finish_job();
    }
}

/// Park until the pool is resumed or torn down
fn suspend(shared: &PoolShared, id: usize) {
    shared.set_state(id, WorkerState::Suspended);
    ktrace!("worker {} suspended", id);

    while shared.is_paused() && shared.keep_alive() {
        thread::park_timeout(shared.config.pause_poll);
    }

    shared.set_state(id, WorkerState::Idle);
    ktrace!("worker {} resumed", id);
}
