//! Condvar-based wake signal
//!
//! Portable implementation used on platforms without futex support, and
//! available everywhere for callers that want std-only blocking.

use super::WakeSignal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Mutex + condvar binary gate
pub struct CondvarSignal {
    /// Gate state: true = open
    open: Mutex<bool>,

    condvar: Condvar,

    /// Threads currently inside `wait()`
    waiters: AtomicUsize,
}

impl CondvarSignal {
    /// Create a new, closed gate
    pub fn new() -> Self {
        Self {
            open: Mutex::new(false),
            condvar: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    // The gate is a single bool, never left half-updated, so a poisoned
    // lock still holds a valid value.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CondvarSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeSignal for CondvarSignal {
    fn signal_one(&self) {
        let mut open = self.lock();
        *open = true;
        self.condvar.notify_one();
    }

    fn signal_all(&self) {
        let mut open = self.lock();
        *open = true;
        self.condvar.notify_all();
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut open = self.lock();
        self.waiters.fetch_add(1, Ordering::SeqCst);

        let consumed = loop {
            if *open {
                *open = false;
                break true;
            }
            match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        break false;
                    }
                    open = self
                        .condvar
                        .wait_timeout(open, d - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                None => {
                    open = self.condvar.wait(open).unwrap_or_else(PoisonError::into_inner);
                }
            }
        };

        self.waiters.fetch_sub(1, Ordering::SeqCst);
        consumed
    }

    fn reset(&self) {
        *self.lock() = false;
    }

    fn is_open(&self) -> bool {
        *self.lock()
    }

    fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }
}
