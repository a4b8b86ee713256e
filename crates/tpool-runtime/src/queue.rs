//! FIFO job queue paired with a wake signal
//!
//! The queue is the authority on "is there work": the wake signal only
//! lets idle workers block. Every push opens the gate once, and every pull
//! that leaves work behind opens it again, so the gate is re-synchronized
//! with "queue non-empty" on each mutation and a collapsed wake-up never
//! strands a job.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tpool_core::error::{AllocError, PoolResult};
use tpool_core::{ktrace, Job};

use crate::wake::{new_wake_signal, WakeSignal};

struct QueueInner {
    jobs: VecDeque<Job>,
    /// Sequence number handed to the next pushed job
    next_seq: u64,
}

/// Unbounded, insertion-ordered queue of pending jobs
pub struct JobQueue {
    inner: Mutex<QueueInner>,
    wake: Box<dyn WakeSignal>,
}

impl JobQueue {
    /// Create an empty queue with the platform wake signal
    pub fn new() -> Self {
        Self::with_signal(new_wake_signal())
    }

    /// Create an empty queue around a specific wake signal
    pub fn with_signal(wake: Box<dyn WakeSignal>) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                jobs: VecDeque::new(),
                next_seq: 1,
            }),
            wake,
        }
    }

    /// Create an empty queue with room for `capacity` jobs reserved up front
    pub fn try_with_capacity(capacity: usize) -> PoolResult<Self> {
        let mut jobs = VecDeque::new();
        jobs.try_reserve(capacity).map_err(|_| AllocError::Queue)?;
        Ok(Self {
            inner: Mutex::new(QueueInner { jobs, next_seq: 1 }),
            wake: new_wake_signal(),
        })
    }

    // Jobs run outside the lock, so a panic can never leave the deque
    // half-mutated; recovering a poisoned guard is sound.
    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a job to the tail and wake one idle worker
    ///
    /// Returns the job's sequence number. Fails without queueing anything
    /// if the queue cannot grow.
    pub fn push(&self, mut job: Job) -> PoolResult<u64> {
        let mut inner = self.lock();
        inner.jobs.try_reserve(1).map_err(|_| AllocError::Job)?;

        let seq = inner.next_seq;
        inner.next_seq += 1;
        job.set_seq(seq);
        inner.jobs.push_back(job);

        self.wake.signal_one();
        ktrace!("queued job #{} (len={})", seq, inner.jobs.len());
        Ok(seq)
    }

    /// Remove and return the head job, if any
    ///
    /// Re-opens the gate when work remains so a second idle worker is
    /// released for it.
    pub fn pull(&self) -> Option<Job> {
        let mut inner = self.lock();
        let job = inner.jobs.pop_front()?;
        if !inner.jobs.is_empty() {
            self.wake.signal_one();
        }
        Some(job)
    }

    /// Discard all pending jobs and close the gate
    ///
    /// Returns the number of jobs dropped without running.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut inner = self.lock();
            std::mem::take(&mut inner.jobs)
        };
        self.wake.reset();
        // Jobs are dropped outside the lock; their captures may run
        // arbitrary destructors.
        dropped.len()
    }

    /// Block until work may be available, or `timeout` elapses
    #[inline]
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        self.wake.wait(timeout)
    }

    /// Release every blocked waiter (teardown)
    #[inline]
    pub fn wake_all(&self) {
        self.wake.signal_all();
    }

    /// Number of threads blocked waiting for work
    #[inline]
    pub fn waiters(&self) -> usize {
        self.wake.waiters()
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wake::CondvarSignal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Instant;

    fn recording_job(log: &Arc<Mutex<Vec<usize>>>, n: usize) -> Job {
        let log = Arc::clone(log);
        Job::new(move |n| log.lock().unwrap().push(n), n)
    }

    #[test]
    fn test_fifo_order_and_sequence() {
        let queue = JobQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for n in 0..5 {
            assert_eq!(queue.push(recording_job(&log, n)).unwrap(), n as u64 + 1);
        }
        assert_eq!(queue.len(), 5);

        while let Some(job) = queue.pull() {
            job.run();
        }
        assert!(queue.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pull_empty_returns_none() {
        let queue = JobQueue::new();
        assert!(queue.pull().is_none());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_gate_tracks_non_empty() {
        let queue = JobQueue::with_signal(Box::new(CondvarSignal::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.push(recording_job(&log, 1)).unwrap();
        queue.push(recording_job(&log, 2)).unwrap();

        // Two pushes collapse into one open gate.
        assert!(queue.wait(Some(Duration::from_millis(10))));
        assert!(!queue.wait(Some(Duration::from_millis(10))));

        // Pulling with one job left behind re-opens it.
        assert!(queue.pull().is_some());
        assert!(queue.wait(Some(Duration::from_millis(10))));

        // Pulling the last job leaves it closed.
        assert!(queue.pull().is_some());
        assert!(!queue.wait(Some(Duration::from_millis(10))));
    }

    #[test]
    fn test_clear_discards_and_closes() {
        let queue = JobQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let r = Arc::clone(&ran);
            queue
                .push(Job::from_fn(move || {
                    r.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }

        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
        assert!(!queue.wait(Some(Duration::from_millis(10))));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_try_with_capacity() {
        let queue = JobQueue::try_with_capacity(64).unwrap();
        assert!(queue.is_empty());
    }

    /// One push while two consumers are blocked: exactly one wakes and takes
    /// it; the second push is not lost even though the gate had been
    /// consumed in between.
    #[test]
    fn test_single_push_with_two_blocked_consumers() {
        let queue = Arc::new(JobQueue::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let q = Arc::clone(&queue);
                thread::spawn(move || {
                    let deadline = Instant::now() + Duration::from_secs(5);
                    while Instant::now() < deadline {
                        if q.wait(Some(Duration::from_millis(50))) {
                            if let Some(job) = q.pull() {
                                job.run();
                                return true;
                            }
                        }
                    }
                    false
                })
            })
            .collect();

        let start = Instant::now();
        while queue.waiters() < 2 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(1));
        }

        let r = Arc::clone(&ran);
        queue.push(Job::from_fn(move || { r.fetch_add(1, Ordering::SeqCst); })).unwrap();
        while ran.load(Ordering::SeqCst) < 1 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        let r = Arc::clone(&ran);
        queue.push(Job::from_fn(move || { r.fetch_add(1, Ordering::SeqCst); })).unwrap();

        let results: Vec<bool> = consumers.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![true, true]);
        assert_eq!(ran.load(Ordering::SeqCst), 2);
        assert!(queue.is_empty());
    }
}
