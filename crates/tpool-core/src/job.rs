//! Unit of work executed by a pool worker
//!
//! A job is an action plus the single argument it is called with. Once
//! built it is moved into the queue and later out of it by exactly one
//! worker, which consumes it with [`Job::run`]. Ownership makes the
//! "no two owners" rule a compile-time property.

use core::fmt;

type Action = Box<dyn FnOnce() + Send + 'static>;

/// A queued unit of work
pub struct Job {
    /// Submission sequence number, assigned by the queue on push
    seq: u64,
    action: Action,
}

impl Job {
    /// Bind `action` to `arg`
    ///
    /// The argument is moved into the job and handed back to the action
    /// when a worker runs it.
    pub fn new<A, F>(action: F, arg: A) -> Self
    where
        A: Send + 'static,
        F: FnOnce(A) + Send + 'static,
    {
        Self::from_fn(move || action(arg))
    }

    /// Wrap a closure that already captures its argument
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Job {
            seq: 0,
            action: Box::new(f),
        }
    }

    /// Sequence number in submission order (0 until queued)
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[doc(hidden)]
    #[inline]
    pub fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Execute the action, consuming the job
    #[inline]
    pub fn run(self) {
        (self.action)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("seq", &self.seq).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_job_passes_argument() {
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        let job = Job::new(move |n: usize| s.store(n, Ordering::SeqCst), 7);
        assert_eq!(job.seq(), 0);
        job.run();
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_job_owns_non_copy_argument() {
        let (tx, rx) = std::sync::mpsc::channel();
        let job = Job::new(move |s: String| tx.send(s.len()).unwrap(), "hello".to_string());
        job.run();
        assert_eq!(rx.recv().unwrap(), 5);
    }

    #[test]
    fn test_debug_shows_seq() {
        let mut job = Job::from_fn(|| {});
        job.set_seq(3);
        assert!(format!("{:?}", job).contains("seq: 3"));
    }
}
