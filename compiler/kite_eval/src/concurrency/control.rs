//! Cooperative stop and suspend flags for one evaluator.
//!
//! Nothing is preempted. The evaluator consults these flags at block and
//! loop-iteration boundaries and inside blocking operations (`sleep`,
//! `lock`, `wait`), which poll in short slices so a stop request is noticed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Longest a blocking operation waits before re-checking the stop flag.
pub(crate) const POLL_SLICE: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
pub struct WorkerControl {
    stop: AtomicBool,
    suspended: Mutex<bool>,
    changed: Condvar,
}

impl WorkerControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        let _guard = self.suspended.lock();
        self.changed.notify_all();
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn suspend(&self) {
        *self.suspended.lock() = true;
    }

    pub fn resume(&self) {
        *self.suspended.lock() = false;
        self.changed.notify_all();
    }

    pub fn is_suspended(&self) -> bool {
        *self.suspended.lock()
    }

    /// Block while suspended. Returns `false` if a stop was requested.
    pub fn wait_while_suspended(&self) -> bool {
        let mut suspended = self.suspended.lock();
        while *suspended && !self.is_stopped() {
            self.changed.wait(&mut suspended);
        }
        !self.is_stopped()
    }

    /// Sleep for `duration`, waking early on a stop request. Returns `false`
    /// if the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.suspended.lock();
        while !self.is_stopped() {
            if self.changed.wait_until(&mut guard, deadline).timed_out() {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_stop_interrupts_sleep() {
        let control = Arc::new(WorkerControl::new());
        let sleeper = Arc::clone(&control);
        let handle = thread::spawn(move || sleeper.sleep(Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(20));
        control.request_stop();
        assert_eq!(handle.join().ok(), Some(false));
    }

    #[test]
    fn test_short_sleep_completes() {
        assert!(WorkerControl::new().sleep(Duration::from_millis(1)));
    }

    #[test]
    fn test_resume_releases_suspended_worker() {
        let control = Arc::new(WorkerControl::new());
        control.suspend();
        let waiter = Arc::clone(&control);
        let handle = thread::spawn(move || waiter.wait_while_suspended());
        thread::sleep(Duration::from_millis(20));
        assert!(control.is_suspended());
        control.resume();
        assert_eq!(handle.join().ok(), Some(true));
    }
}
