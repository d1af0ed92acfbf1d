//! Monitors: re-entrant mutual exclusion plus wait/signal.
//!
//! Any value can be locked. The first lock on a value without a resource
//! attaches a [`Monitor`] to it, and since copies share the resource slot,
//! every copy of that value locks the same monitor. `monitor()` creates a
//! value that already has one.
//!
//! Ownership is per thread, which is per worker. Blocking calls wake every
//! [`POLL_SLICE`] to notice a stop request.

use std::any::Any;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use kite_value::{
    numeric, resource_error, type_mismatch, ControlAction, Node, Resource, ResourceSlot, Value,
};
use parking_lot::{Condvar, Mutex};

use super::{WorkerControl, POLL_SLICE};
use crate::builtins::target_cell;
use crate::evaluator::read;
use crate::intrinsics::monitor_class;
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::Evaluator;

pub(crate) const OPS: &[NativeSpec] = &[
    NativeSpec::new("monitor", monitor),
    NativeSpec::new("lock", lock),
    NativeSpec::new("try-lock", try_lock),
    NativeSpec::new("unlock", unlock),
    NativeSpec::new("wait", wait),
    NativeSpec::new("signal", signal),
];

#[derive(Debug, Default)]
struct MonitorState {
    owner: Option<ThreadId>,
    depth: usize,
    /// Bumped by every signal; waiters watch for a change.
    generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Monitor {
    state: Mutex<MonitorState>,
    available: Condvar,
    signalled: Condvar,
}

impl Resource for Monitor {
    fn kind(&self) -> &'static str {
        "monitor"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The calling thread does not own the monitor.
#[derive(Debug)]
pub(crate) struct NotHeld;

impl Monitor {
    /// Take the monitor, blocking while another thread holds it. Returns
    /// `false` if `control` was stopped first.
    pub(crate) fn lock(&self, control: &WorkerControl) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    return true;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    return true;
                }
                Some(_) => {
                    if control.is_stopped() {
                        return false;
                    }
                    self.available.wait_for(&mut state, POLL_SLICE);
                }
            }
        }
    }

    pub(crate) fn try_lock(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.owner {
            None => {
                state.owner = Some(me);
                state.depth = 1;
                true
            }
            Some(owner) if owner == me => {
                state.depth += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Undo one `lock`. The monitor is released when the count reaches zero.
    pub(crate) fn unlock(&self) -> Result<(), NotHeld> {
        let mut state = self.state.lock();
        if state.owner != Some(thread::current().id()) {
            return Err(NotHeld);
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            self.available.notify_one();
        }
        Ok(())
    }

    /// Release the monitor completely, wait for a signal (or `timeout`),
    /// then take it back at the same depth.
    ///
    /// Returns `Ok(Some(signalled))`, or `Ok(None)` if `control` was stopped.
    pub(crate) fn wait(
        &self,
        control: &WorkerControl,
        timeout: Option<Duration>,
    ) -> Result<Option<bool>, NotHeld> {
        let me = thread::current().id();
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(NotHeld);
        }
        let depth = state.depth;
        let generation = state.generation;
        state.owner = None;
        state.depth = 0;
        self.available.notify_one();

        let mut signalled = false;
        while !control.is_stopped() {
            if state.generation != generation {
                signalled = true;
                break;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    (deadline - now).min(POLL_SLICE)
                }
                None => POLL_SLICE,
            };
            self.signalled.wait_for(&mut state, slice);
        }

        loop {
            if control.is_stopped() {
                return Ok(None);
            }
            if state.owner.is_none() {
                state.owner = Some(me);
                state.depth = depth;
                return Ok(Some(signalled));
            }
            self.available.wait_for(&mut state, POLL_SLICE);
        }
    }

    /// Wake every waiter. Only the owner may signal.
    pub(crate) fn signal(&self) -> Result<(), NotHeld> {
        let mut state = self.state.lock();
        if state.owner != Some(thread::current().id()) {
            return Err(NotHeld);
        }
        state.generation = state.generation.wrapping_add(1);
        self.signalled.notify_all();
        Ok(())
    }
}

fn not_held() -> Flow {
    resource_error("lock-not-held", "the monitor is not held by this worker").into()
}

/// `monitor()`: a value to lock and wait on.
fn monitor(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("monitor", args, 0, Some(0))?;
    Ok(Value::object(Some(monitor_class().clone()), Vec::new())
        .with_resource(ResourceSlot::new(Monitor::default())))
}

/// The monitor of argument `index`, attaching one if the value has none.
fn monitor_arg(eval: &mut Evaluator, args: &[Node], index: usize) -> Result<ResourceSlot, Flow> {
    let value = eval.arg(args, index)?;
    let resource = match read(&value, |v| v.resource.clone())? {
        Some(resource) => resource,
        None => {
            let handle = target_cell(&value)?;
            let mut content = handle.write();
            content
                .resource
                .get_or_insert_with(|| ResourceSlot::new(Monitor::default()))
                .clone()
        }
    };
    if resource.downcast::<Monitor>().is_none() {
        return Err(type_mismatch("lockable value", resource.kind()).into());
    }
    Ok(resource)
}

fn with_monitor<R>(resource: &ResourceSlot, f: impl FnOnce(&Monitor) -> R) -> Result<R, Flow> {
    resource
        .downcast::<Monitor>()
        .map(f)
        .ok_or_else(|| type_mismatch("lockable value", resource.kind()).into())
}

/// `lock(target)`: blocks until this worker holds the target's monitor.
fn lock(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("lock", args, 1, Some(1))?;
    let resource = monitor_arg(eval, args, 0)?;
    let control = eval.control().clone();
    if !with_monitor(&resource, |monitor| monitor.lock(&control))? {
        return Err(ControlAction::Stop.into());
    }
    Ok(Value::null())
}

fn try_lock(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("try-lock", args, 1, Some(1))?;
    let resource = monitor_arg(eval, args, 0)?;
    Ok(Value::bool(with_monitor(&resource, Monitor::try_lock)?))
}

fn unlock(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("unlock", args, 1, Some(1))?;
    let resource = monitor_arg(eval, args, 0)?;
    with_monitor(&resource, Monitor::unlock)?.map_err(|NotHeld| not_held())?;
    Ok(Value::null())
}

/// `wait(target, timeout_ms?)`: `true` if woken by a signal, `false` on
/// timeout. The caller must hold the monitor.
fn wait(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("wait", args, 1, Some(2))?;
    let resource = monitor_arg(eval, args, 0)?;
    let timeout = eval.arg(args, 1)?;
    let timeout = if read(&timeout, Value::is_null)? {
        None
    } else {
        let millis = read(&timeout, numeric::to_count)??;
        Some(Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX)))
    };
    let control = eval.control().clone();
    match with_monitor(&resource, |monitor| monitor.wait(&control, timeout))? {
        Ok(Some(signalled)) => Ok(Value::bool(signalled)),
        Ok(None) => Err(ControlAction::Stop.into()),
        Err(NotHeld) => Err(not_held()),
    }
}

fn signal(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("signal", args, 1, Some(1))?;
    let resource = monitor_arg(eval, args, 0)?;
    with_monitor(&resource, Monitor::signal)?.map_err(|NotHeld| not_held())?;
    Ok(Value::null())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_lock_is_reentrant() {
        let monitor = Monitor::default();
        let control = WorkerControl::new();
        assert!(monitor.lock(&control));
        assert!(monitor.lock(&control));
        assert!(monitor.unlock().is_ok());
        assert!(monitor.unlock().is_ok());
        assert!(monitor.unlock().is_err());
    }

    #[test]
    fn test_try_lock_fails_while_held_elsewhere() {
        let monitor = Arc::new(Monitor::default());
        assert!(monitor.try_lock());
        let other = Arc::clone(&monitor);
        let taken = thread::spawn(move || other.try_lock()).join().ok();
        assert_eq!(taken, Some(false));
    }

    #[test]
    fn test_wait_times_out_and_reacquires() {
        let monitor = Monitor::default();
        let control = WorkerControl::new();
        assert!(monitor.lock(&control));
        let woke = monitor.wait(&control, Some(Duration::from_millis(10)));
        assert!(matches!(woke, Ok(Some(false))));
        assert!(monitor.unlock().is_ok());
    }

    #[test]
    fn test_signal_wakes_waiter() {
        let monitor = Arc::new(Monitor::default());
        let control = Arc::new(WorkerControl::new());
        let waiter = {
            let monitor = Arc::clone(&monitor);
            let control = Arc::clone(&control);
            thread::spawn(move || {
                assert!(monitor.lock(&control));
                let woke = monitor.wait(&control, Some(Duration::from_secs(10)));
                let _ = monitor.unlock();
                matches!(woke, Ok(Some(true)))
            })
        };
        // Keep signalling until the waiter has gone to sleep and been woken.
        let mut signalled = false;
        for _ in 0..500 {
            if monitor.try_lock() {
                let owned_waiting = monitor.signal().is_ok();
                let _ = monitor.unlock();
                signalled |= owned_waiting;
            }
            if waiter.is_finished() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(signalled);
        assert_eq!(waiter.join().ok(), Some(true));
    }

    #[test]
    fn test_stop_interrupts_blocked_lock() {
        let monitor = Arc::new(Monitor::default());
        let control = Arc::new(WorkerControl::new());
        let holder = WorkerControl::new();
        assert!(monitor.lock(&holder));
        let blocked = {
            let monitor = Arc::clone(&monitor);
            let control = Arc::clone(&control);
            thread::spawn(move || monitor.lock(&control))
        };
        thread::sleep(Duration::from_millis(30));
        control.request_stop();
        assert_eq!(blocked.join().ok(), Some(false));
    }
}
