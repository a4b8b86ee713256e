//! Fixed-size worker pool
//!
//! The pool owns the job queue and its workers, and exposes submission,
//! the idle barrier (`wait`), pause/resume and teardown.
//!
//! # Teardown
//!
//! `destroy()` (or drop) clears keep-alive, then:
//! 1. broadcasts the wake signal every `wake_interval` until every worker
//!    has exited or `grace_period` has passed;
//! 2. keeps broadcasting every `poll_interval` for as long as a worker is
//!    still alive (one may be deep inside a long job);
//! 3. drops whatever is still queued and joins the threads.
//!
//! Phase 2 has no deadline: teardown always completes once running jobs
//! return, and never returns with a worker still attached.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tpool_core::error::{AllocError, PoolError, PoolResult, WorkerError};
use tpool_core::{kdebug, kerror, kinfo, kwarn, Job, WorkerState};

use crate::config::PoolConfig;
use crate::queue::JobQueue;
use crate::worker::Worker;

/// Live/busy worker counts, guarded together for the idle barrier
#[derive(Debug, Default)]
struct Counts {
    alive: usize,
    busy: usize,
}

/// State shared between the pool handle and its workers
pub(crate) struct PoolShared {
    pub(crate) queue: JobQueue,
    pub(crate) config: PoolConfig,

    counts: Mutex<Counts>,
    /// Signalled when busy drops to 0 with an empty queue
    all_idle: Condvar,
    /// Signalled when a worker registers or exits
    alive_changed: Condvar,

    keep_alive: AtomicBool,
    paused: AtomicBool,
    panicked: AtomicUsize,

    /// Per-worker `WorkerState`, indexed by worker id
    states: Box<[AtomicU8]>,
}

impl PoolShared {
    // Counts are only touched in short non-panicking sections, but the
    // worker guard takes the lock while unwinding, which poisons it.
    fn counts(&self) -> MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub(crate) fn keep_alive(&self) -> bool {
        self.keep_alive.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_state(&self, id: usize, state: WorkerState) {
        if let Some(slot) = self.states.get(id) {
            slot.store(state.into(), Ordering::Release);
        }
    }

    pub(crate) fn register_alive(&self) {
        let mut counts = self.counts();
        counts.alive += 1;
        self.alive_changed.notify_all();
    }

    pub(crate) fn unregister(&self, was_busy: bool) {
        let mut counts = self.counts();
        if was_busy {
            counts.busy -= 1;
        }
        counts.alive -= 1;
        self.alive_changed.notify_all();
        if counts.busy == 0 {
            self.all_idle.notify_all();
        }
    }

    pub(crate) fn begin_job(&self) {
        self.counts().busy += 1;
    }

    pub(crate) fn finish_job(&self) {
        let mut counts = self.counts();
        counts.busy -= 1;
        if counts.busy == 0 && self.queue.is_empty() {
            self.all_idle.notify_all();
        }
    }

    pub(crate) fn record_panic(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Idle barrier predicate; caller holds the counts lock
    #[inline]
    fn is_idle(&self, counts: &Counts) -> bool {
        counts.busy == 0 && self.queue.is_empty()
    }
}

/// Fixed-size pool of worker threads executing submitted jobs in FIFO order
///
/// Jobs are fire-and-forget: nothing is returned to the submitter. Use
/// [`wait`](ThreadPool::wait) to block until all submitted work is done.
///
/// # Example
///
/// ```ignore
/// let pool = ThreadPool::new(4)?;
/// for i in 0..100 {
///     pool.submit(|n: usize| println!("job {}", n), i)?;
/// }
/// pool.wait();
/// pool.destroy();
/// ```
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: Vec<Worker>,
    terminated: bool,
}

impl ThreadPool {
    /// Create a pool of `num_workers` threads with default settings
    /// (environment overrides apply to everything except the count)
    pub fn new(num_workers: usize) -> PoolResult<Self> {
        Self::with_config(PoolConfig::from_env().num_workers(num_workers))
    }

    /// Create a pool from an explicit configuration
    ///
    /// Blocks until every worker has registered alive. On failure any
    /// workers already started are stopped and joined before returning.
    pub fn with_config(config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        let n = config.num_workers;

        let mut workers = Vec::new();
        workers.try_reserve_exact(n).map_err(|_| AllocError::Workers)?;

        let states = (0..n)
            .map(|_| AtomicU8::new(WorkerState::Starting.into()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let shared = Arc::new(PoolShared {
            queue: JobQueue::try_with_capacity(n.max(1))?,
            config,
            counts: Mutex::new(Counts::default()),
            all_idle: Condvar::new(),
            alive_changed: Condvar::new(),
            keep_alive: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            panicked: AtomicUsize::new(0),
            states,
        });

        for id in 0..n {
            match Worker::spawn(Arc::clone(&shared), id) {
                Ok(worker) => {
                    kdebug!("created worker {} in pool", id);
                    workers.push(worker);
                }
                Err(e) => {
                    kerror!("failed to spawn worker {}: {}", id, e);
                    let mut partial = ThreadPool {
                        shared,
                        workers,
                        terminated: false,
                    };
                    partial.terminate();
                    return Err(WorkerError::SpawnFailed.into());
                }
            }
        }

        {
            let mut counts = shared.counts();
            while counts.alive < n {
                counts = shared
                    .alive_changed
                    .wait(counts)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        kdebug!("pool ready: {} workers", n);

        Ok(ThreadPool {
            shared,
            workers,
            terminated: false,
        })
    }

    /// Queue `action(arg)` for execution on some worker
    ///
    /// Never blocks waiting for a worker. Fails only if the queue cannot
    /// grow, in which case nothing is queued.
    pub fn submit<A, F>(&self, action: F, arg: A) -> PoolResult<()>
    where
        A: Send + 'static,
        F: FnOnce(A) + Send + 'static,
    {
        self.submit_job(Job::new(action, arg))
    }

    /// Queue a closure for execution on some worker
    pub fn execute<F>(&self, f: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_job(Job::from_fn(f))
    }

    /// Queue a pre-built job
    pub fn submit_job(&self, job: Job) -> PoolResult<()> {
        self.shared.queue.push(job).map(|_| ())
    }

    /// Block until the queue is empty and no worker is running a job
    ///
    /// Jobs submitted after this returns are not covered. On a pool with
    /// no live workers and queued jobs this never returns; use
    /// [`wait_timeout`](ThreadPool::wait_timeout) there.
    pub fn wait(&self) {
        let shared = &self.shared;
        let mut counts = shared.counts();
        while !shared.is_idle(&counts) {
            counts = shared
                .all_idle
                .wait(counts)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait`](ThreadPool::wait), giving up after `timeout`
    ///
    /// Fails with [`PoolError::Timeout`] if the pool is still busy when
    /// `timeout` runs out.
    pub fn wait_timeout(&self, timeout: Duration) -> PoolResult<()> {
        let shared = &self.shared;
        let deadline = Instant::now() + timeout;
        let mut counts = shared.counts();
        while !shared.is_idle(&counts) {
            let now = Instant::now();
            if now >= deadline {
                return Err(PoolError::Timeout);
            }
            counts = shared
                .all_idle
                .wait_timeout(counts, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        Ok(())
    }

    /// Suspend all workers at their next flag check
    ///
    /// A job already running finishes first, and a worker already past its
    /// pause check may still start one more job. Submissions are still
    /// accepted and run after [`resume`](ThreadPool::resume).
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
        kdebug!("pool paused");
    }

    /// Let suspended workers continue
    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
        for worker in &self.workers {
            worker.unpark();
        }
        kdebug!("pool resumed");
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.shared.is_paused()
    }

    /// Number of workers currently executing a job
    pub fn working_count(&self) -> usize {
        self.shared.counts().busy
    }

    /// Number of worker threads still in their loop
    pub fn alive_count(&self) -> usize {
        self.shared.counts().alive
    }

    /// Configured worker count
    #[inline]
    pub fn num_workers(&self) -> usize {
        self.shared.config.num_workers
    }

    /// Jobs waiting to be pulled
    pub fn queued_jobs(&self) -> usize {
        self.shared.queue.len()
    }

    /// Workers lost to a panicking job
    pub fn panicked_count(&self) -> usize {
        self.shared.panicked.load(Ordering::Relaxed)
    }

    /// Lifecycle state of worker `id`
    pub fn worker_state(&self, id: usize) -> Option<WorkerState> {
        self.shared
            .states
            .get(id)
            .map(|s| WorkerState::from(s.load(Ordering::Acquire)))
    }

    /// Stop all workers and release the pool
    ///
    /// Waits for running jobs to return; jobs still queued are discarded.
    /// Call [`wait`](ThreadPool::wait) first to drain them instead. Must
    /// not be called from inside a job of this pool.
    pub fn destroy(mut self) {
        self.terminate();
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        let shared = &self.shared;
        let config = &shared.config;
        shared.keep_alive.store(false, Ordering::Release);

        // Phase 1: broadcast until everyone is out or the grace period ends.
        let start = Instant::now();
        while self.alive_count() > 0 && start.elapsed() < config.grace_period {
            self.broadcast();
            if config.wake_interval.is_zero() {
                thread::yield_now();
            } else {
                thread::sleep(config.wake_interval);
            }
        }

        // Phase 2: poll without a deadline.
        let lingering = self.alive_count();
        if lingering > 0 {
            kwarn!(
                "{} worker(s) still busy after {:?} grace period, polling every {:?}",
                lingering,
                config.grace_period,
                config.poll_interval
            );
            while self.alive_count() > 0 {
                self.broadcast();
                thread::sleep(config.poll_interval);
            }
        }

        let discarded = shared.queue.clear();
        let total = self.workers.len();
        for worker in self.workers.drain(..) {
            let id = worker.id();
            if let Err(e) = worker.join() {
                kdebug!("worker {} joined: {}", id, e);
            }
        }

        kinfo!(
            "pool destroyed: {} workers stopped, {} queued job(s) discarded",
            total,
            discarded
        );
    }

    fn broadcast(&self) {
        self.shared.queue.wake_all();
        for worker in &self.workers {
            worker.unpark();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_queue::SegQueue;
    use std::sync::mpsc;

    fn test_config(n: usize) -> PoolConfig {
        PoolConfig::new()
            .num_workers(n)
            .grace_period(Duration::from_millis(200))
            .poll_interval(Duration::from_millis(10))
            .pause_poll(Duration::from_millis(5))
            .thread_name("tpool-test")
    }

    fn pool(n: usize) -> ThreadPool {
        ThreadPool::with_config(test_config(n)).unwrap()
    }

    #[test]
    fn test_init_blocks_until_all_alive() {
        let pool = pool(4);
        assert_eq!(pool.num_workers(), 4);
        assert_eq!(pool.alive_count(), 4);
        assert_eq!(pool.working_count(), 0);
        for id in 0..4 {
            assert_ne!(pool.worker_state(id), Some(WorkerState::Starting));
        }
        assert_eq!(pool.worker_state(4), None);
        pool.destroy();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = test_config(1).thread_name("");
        assert!(matches!(
            ThreadPool::with_config(config),
            Err(tpool_core::PoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_nul_thread_name_is_an_error_not_a_panic() {
        let config = test_config(2).thread_name("web\0pool");
        let result = std::panic::catch_unwind(|| ThreadPool::with_config(config).map(|_| ()));
        assert!(matches!(
            result,
            Ok(Err(tpool_core::PoolError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_all_jobs_complete() {
        let pool = pool(4);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..1000 {
            let d = Arc::clone(&done);
            pool.execute(move || {
                d.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.wait();
        assert_eq!(done.load(Ordering::SeqCst), 1000);
        pool.destroy();
    }

    #[test]
    fn test_single_worker_runs_in_submission_order() {
        let pool = pool(1);
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..200usize {
            let log = Arc::clone(&log);
            pool.submit(move |n| log.lock().unwrap().push(n), i).unwrap();
        }
        pool.wait();
        let log = log.lock().unwrap();
        assert_eq!(*log, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_wait_leaves_pool_idle() {
        for workers in 1..=4 {
            for jobs in [0usize, 1, 64] {
                let pool = pool(workers);
                for _ in 0..jobs {
                    pool.execute(|| thread::sleep(Duration::from_micros(200))).unwrap();
                }
                pool.wait();
                assert_eq!(pool.queued_jobs(), 0, "workers={workers} jobs={jobs}");
                assert_eq!(pool.working_count(), 0, "workers={workers} jobs={jobs}");
            }
        }
    }

    #[test]
    fn test_no_job_pulled_twice() {
        for workers in [1usize, 2, 8] {
            let pool = pool(workers);
            let log = Arc::new(SegQueue::new());
            let jobs = 500usize;
            for i in 0..jobs {
                let log = Arc::clone(&log);
                // Each job owns its own lock around the append.
                let entry_lock = Mutex::new(());
                pool.submit(
                    move |n| {
                        let _held = entry_lock.lock().unwrap();
                        log.push(n);
                    },
                    i,
                )
                .unwrap();
            }
            pool.wait();

            let mut seen = Vec::with_capacity(jobs);
            while let Some(n) = log.pop() {
                seen.push(n);
            }
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), jobs, "workers={workers}");
            assert_eq!(log.len(), 0);
        }
    }

    #[test]
    fn test_wait_is_idempotent() {
        let pool = pool(2);
        pool.execute(|| {}).unwrap();
        pool.wait();

        let start = Instant::now();
        pool.wait();
        pool.wait();
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_working_count_tracks_running_jobs() {
        let pool = pool(3);
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));

        for _ in 0..2 {
            let rx = Arc::clone(&release_rx);
            pool.execute(move || {
                let _ = rx.lock().unwrap().recv_timeout(Duration::from_secs(5));
            })
            .unwrap();
        }

        let start = Instant::now();
        while pool.working_count() < 2 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(pool.working_count(), 2);
        assert!((0..3).any(|id| pool.worker_state(id) == Some(WorkerState::Running)));
        assert_eq!(pool.wait_timeout(Duration::from_millis(20)), Err(PoolError::Timeout));

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        assert!(pool.wait_timeout(Duration::from_secs(5)).is_ok());
        assert_eq!(pool.working_count(), 0);
    }

    #[test]
    fn test_pause_holds_jobs_until_resume() {
        let pool = pool(2);
        let stamps = Arc::new(Mutex::new(Vec::new()));

        pool.pause();
        assert!(pool.is_paused());
        for _ in 0..3 {
            let stamps = Arc::clone(&stamps);
            pool.execute(move || stamps.lock().unwrap().push(Instant::now())).unwrap();
        }

        thread::sleep(Duration::from_millis(200));
        assert!(stamps.lock().unwrap().is_empty());
        assert_eq!(pool.queued_jobs(), 3);

        let resumed_at = Instant::now();
        pool.resume();
        assert!(pool.wait_timeout(Duration::from_secs(2)).is_ok());

        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 3);
        assert!(stamps.iter().all(|t| *t >= resumed_at));
    }

    #[test]
    fn test_repeated_pause_never_runs_held_jobs() {
        let config = test_config(2).idle_timeout(Duration::from_millis(1));
        let pool = ThreadPool::with_config(config).unwrap();
        let held = Arc::new(AtomicBool::new(false));
        let ran_while_held = Arc::new(AtomicUsize::new(0));

        for _ in 0..200 {
            held.store(true, Ordering::SeqCst);
            pool.pause();

            let h = Arc::clone(&held);
            let r = Arc::clone(&ran_while_held);
            pool.execute(move || {
                if h.load(Ordering::SeqCst) {
                    r.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();

            thread::sleep(Duration::from_micros(200));
            held.store(false, Ordering::SeqCst);
            pool.resume();
            assert!(pool.wait_timeout(Duration::from_secs(2)).is_ok());
        }

        assert_eq!(ran_while_held.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pause_reaches_suspended_state() {
        let pool = pool(2);
        pool.pause();
        pool.execute(|| {}).unwrap();

        let start = Instant::now();
        while !(0..2).any(|id| pool.worker_state(id) == Some(WorkerState::Suspended))
            && start.elapsed() < Duration::from_secs(2)
        {
            thread::sleep(Duration::from_millis(1));
        }
        assert!((0..2).any(|id| pool.worker_state(id) == Some(WorkerState::Suspended)));

        pool.resume();
        assert!(pool.wait_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_destroy_idle_pool_is_fast() {
        let config = test_config(4).grace_period(Duration::from_secs(1));
        let pool = ThreadPool::with_config(config).unwrap();
        let start = Instant::now();
        pool.destroy();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_destroy_waits_for_long_running_job() {
        let config = test_config(2)
            .grace_period(Duration::from_millis(50))
            .poll_interval(Duration::from_millis(20));
        let pool = ThreadPool::with_config(config).unwrap();

        let finished = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&finished);
        pool.execute(move || {
            thread::sleep(Duration::from_millis(300));
            f.store(true, Ordering::SeqCst);
        })
        .unwrap();

        let start = Instant::now();
        while pool.working_count() == 0 && start.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(1));
        }

        pool.destroy();
        assert!(finished.load(Ordering::SeqCst));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_destroy_while_paused_terminates() {
        let pool = pool(2);
        pool.pause();
        pool.execute(|| {}).unwrap();
        let start = Instant::now();
        pool.destroy();
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_zero_workers_queue_but_never_run() {
        let pool = pool(0);
        assert_eq!(pool.alive_count(), 0);

        let ran = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ran);
        pool.execute(move || r.store(true, Ordering::SeqCst)).unwrap();

        assert_eq!(pool.wait_timeout(Duration::from_millis(50)), Err(PoolError::Timeout));
        assert_eq!(pool.queued_jobs(), 1);
        pool.destroy();
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panicking_job_loses_one_worker_only() {
        let pool = pool(2);
        pool.execute(|| panic!("job failure")).unwrap();

        let start = Instant::now();
        while pool.panicked_count() == 0 && start.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(pool.panicked_count(), 1);

        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let d = Arc::clone(&done);
            pool.execute(move || {
                d.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert!(pool.wait_timeout(Duration::from_secs(2)).is_ok());
        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(pool.alive_count(), 1);
        assert_eq!(pool.working_count(), 0);

        let start = Instant::now();
        pool.destroy();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_panicked_worker_joins_with_error() {
        let mut pool = pool(1);
        pool.execute(|| panic!("job failure")).unwrap();

        let start = Instant::now();
        while pool.alive_count() > 0 && start.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(pool.alive_count(), 0);

        let worker = pool.workers.pop().unwrap();
        assert_eq!(worker.join(), Err(WorkerError::Panicked));
        pool.destroy();
    }

    #[test]
    fn test_independent_pools() {
        let a = pool(1);
        let b = pool(1);
        a.pause();

        let (tx, rx) = mpsc::channel();
        b.submit(move |v| tx.send(v).unwrap(), 42).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(42));
        assert!(a.is_paused());
        assert!(!b.is_paused());

        a.destroy();
        b.destroy();
    }

    #[test]
    fn test_jobs_run_on_named_worker_threads() {
        let pool = pool(2);
        let (tx, rx) = mpsc::channel();
        pool.execute(move || {
            let name = thread::current().name().map(str::to_string);
            tx.send((name, crate::worker::current_worker_id())).unwrap();
        })
        .unwrap();

        let (name, id) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let id = id.expect("job ran outside a worker");
        assert_eq!(name, Some(format!("tpool-test-{}", id)));
        assert!(crate::worker::current_worker_id().is_none());
    }

    #[test]
    fn test_drop_without_destroy_stops_workers() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let pool = pool(2);
            let d = Arc::clone(&done);
            pool.execute(move || {
                d.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
            pool.wait();
        }
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
