//! Linux futex-based wake signal
//!
//! Gate word semantics:
//! - 0 = closed (waiters sleep)
//! - 1 = open (the next waiter consumes it and returns)
//!
//! Waiting:
//! 1. Increment waiter count
//! 2. Try to consume the gate (CAS 1 -> 0); return on success
//! 3. FUTEX_WAIT while the word is still 0, then retry step 2
//! 4. Decrement waiter count on return
//!
//! Signalling:
//! 1. Store 1 into the gate word
//! 2. FUTEX_WAKE 1 or all waiters, skipped when nobody is waiting

use super::WakeSignal;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const CLOSED: u32 = 0;
const OPEN: u32 = 1;

/// Linux futex-based binary gate
pub struct FutexSignal {
    /// Gate word: 0 = closed, 1 = open
    gate: AtomicU32,

    /// Threads currently inside `wait()`
    waiters: AtomicUsize,
}

impl FutexSignal {
    /// Create a new, closed gate
    pub fn new() -> Self {
        Self {
            gate: AtomicU32::new(CLOSED),
            waiters: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn try_consume(&self) -> bool {
        self.gate
            .compare_exchange(OPEN, CLOSED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// FUTEX_WAIT while the gate word is CLOSED
    ///
    /// Returns on wake, timeout, EAGAIN (word already changed) or EINTR;
    /// the caller re-checks the gate in every case.
    fn futex_wait(&self, timeout: Option<Duration>) {
        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs() as libc::time_t,
            tv_nsec: d.subsec_nanos() as libc::c_long,
        });

        let timespec_ptr = match &timespec {
            Some(ts) => ts as *const libc::timespec,
            None => std::ptr::null(),
        };

        // Safety: the futex word outlives the call and the timespec pointer
        // is either null or points at a live stack value.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.gate.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                CLOSED,
                timespec_ptr,
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    fn futex_wake(&self, count: i32) {
        // Safety: FUTEX_WAKE only reads the address.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.gate.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                count,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    fn open_and_wake(&self, count: i32) {
        self.gate.store(OPEN, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) == 0 {
            return;
        }
        self.futex_wake(count);
    }
}

impl Default for FutexSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeSignal for FutexSignal {
    fn signal_one(&self) {
        self.open_and_wake(1);
    }

    fn signal_all(&self) {
        self.open_and_wake(i32::MAX);
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        self.waiters.fetch_add(1, Ordering::SeqCst);

        let consumed = loop {
            if self.try_consume() {
                break true;
            }
            let remaining = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        break false;
                    }
                    Some(d - now)
                }
                None => None,
            };
            self.futex_wait(remaining);
        };

        self.waiters.fetch_sub(1, Ordering::SeqCst);
        consumed
    }

    fn reset(&self) {
        self.gate.store(CLOSED, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.gate.load(Ordering::Acquire) == OPEN
    }

    fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }
}
