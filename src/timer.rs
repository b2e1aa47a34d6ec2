//! Time manager (§4.7): a deadline timer that sleeps cooperatively on a
//! condition variable rather than busy-polling, so it can also be woken
//! early — by the winning worker finishing, or by a tablebase hit at the
//! root cancelling the search outright.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

struct Shared {
    woken: Mutex<bool>,
    cv: Condvar,
}

/// A background timer thread that sets `stop` after `deadline_ms`, or
/// immediately if [`DeadlineTimer::notify`] is called first.
pub struct DeadlineTimer {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl DeadlineTimer {
    /// Start a timer for `deadline_ms` milliseconds. Returns `None` for a
    /// zero deadline (per §4.7, a deadline of 0 disables the timer
    /// entirely; the caller relies on `max_depth` or an explicit stop).
    #[must_use]
    pub fn start(deadline_ms: u64, stop: Arc<AtomicBool>) -> Option<Self> {
        if deadline_ms == 0 {
            return None;
        }

        let shared = Arc::new(Shared {
            woken: Mutex::new(false),
            cv: Condvar::new(),
        });
        let shared_thread = Arc::clone(&shared);
        let timeout = Duration::from_millis(deadline_ms);

        let handle = thread::spawn(move || {
            let mut woken = shared_thread.woken.lock();
            if !*woken {
                shared_thread.cv.wait_for(&mut woken, timeout);
            }
            stop.store(true, Ordering::Relaxed);
        });

        Some(DeadlineTimer {
            shared,
            handle: Some(handle),
        })
    }

    /// Wake the timer thread immediately, setting `stop` right away instead
    /// of waiting out the remaining deadline. Used when every worker has
    /// already joined, or a tablebase hit cancels the search outright.
    pub fn notify(&self) {
        *self.shared.woken.lock() = true;
        self.shared.cv.notify_all();
    }

    /// Block until the timer thread has exited (either the deadline fired
    /// or [`notify`](Self::notify) was called).
    pub fn join(mut self) {
        self.notify();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        // Wake the thread so it doesn't outlive its usefulness sleeping out
        // a deadline nobody will observe; don't block the dropping thread
        // waiting for it to exit.
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn fires_after_deadline() {
        let stop = Arc::new(AtomicBool::new(false));
        let timer = DeadlineTimer::start(30, Arc::clone(&stop)).expect("non-zero deadline");
        timer.join();
        assert!(stop.load(Ordering::Relaxed));
    }

    #[test]
    fn zero_deadline_returns_none() {
        let stop = Arc::new(AtomicBool::new(false));
        assert!(DeadlineTimer::start(0, stop).is_none());
    }

    #[test]
    fn notify_wakes_before_deadline() {
        let stop = Arc::new(AtomicBool::new(false));
        let timer = DeadlineTimer::start(60_000, Arc::clone(&stop)).expect("non-zero deadline");
        let start = Instant::now();
        timer.notify();
        timer.join();
        assert!(stop.load(Ordering::Relaxed));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
