//! `spawn` and the task handle.
//!
//! The handle `spawn` returns is an object of the intrinsic `task` class
//! with a [`TaskResource`] attached. Every copy of the handle shares the
//! resource; when the last one is dropped the worker is asked to stop and
//! joined.

use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use kite_value::{
    escaped_control, resource_error, type_mismatch, ControlAction, Node, Resource, ResourceSlot,
    Value,
};
use parking_lot::Mutex;

use super::{panic_message, WorkerControl, POLL_SLICE};
use crate::builtins::code_arg;
use crate::evaluator::{read, type_of};
use crate::intrinsics::task_class;
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::Evaluator;

pub(crate) const OPS: &[NativeSpec] = &[
    NativeSpec::new("spawn", spawn),
    NativeSpec::new("await", await_),
    NativeSpec::new("stop", stop),
    NativeSpec::new("suspend", suspend),
    NativeSpec::new("resume", resume),
    NativeSpec::new("sleep", sleep),
];

#[derive(Debug, Default)]
struct TaskState {
    handle: Option<JoinHandle<Value>>,
    /// The worker's result, or its panic message.
    outcome: Option<Result<Value, String>>,
}

/// A running or finished worker.
#[derive(Debug)]
pub(crate) struct TaskResource {
    control: Arc<WorkerControl>,
    thread: ThreadId,
    state: Mutex<TaskState>,
}

impl Resource for TaskResource {
    fn kind(&self) -> &'static str {
        "task"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl TaskResource {
    /// The outcome if the worker has finished, joining it the first time.
    fn poll(&self) -> Option<Result<Value, String>> {
        let mut state = self.state.lock();
        if state.handle.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = state.handle.take() {
                state.outcome = Some(handle.join().map_err(|payload| panic_message(&*payload)));
            }
        }
        match &state.outcome {
            Some(Ok(value)) => Some(Ok(value.deep_copy())),
            Some(Err(message)) => Some(Err(message.clone())),
            None => None,
        }
    }
}

impl Drop for TaskResource {
    fn drop(&mut self) {
        self.control.request_stop();
        let Some(handle) = self.state.get_mut().handle.take() else {
            return;
        };
        // The last handle may be dropped by the worker itself.
        if handle.thread().id() != thread::current().id() {
            let _ = handle.join();
        }
    }
}

/// The task behind a handle argument.
fn task_arg(eval: &mut Evaluator, args: &[Node], index: usize) -> Result<ResourceSlot, Flow> {
    let value = eval.arg(args, index)?;
    let resource = read(&value, |v| v.resource.clone())?;
    match resource {
        Some(resource) if resource.downcast::<TaskResource>().is_some() => Ok(resource),
        _ => Err(type_mismatch("task", &type_of(&value)).into()),
    }
}

fn with_task<R>(resource: &ResourceSlot, f: impl FnOnce(&TaskResource) -> R) -> Result<R, Flow> {
    resource
        .downcast::<TaskResource>()
        .map(f)
        .ok_or_else(|| type_mismatch("task", resource.kind()).into())
}

/// `spawn(code, args...)`: run `code` on a new worker.
fn spawn(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("spawn", args, 1, None)?;
    let code = code_arg(eval, args, 0)?;
    let call_args = eval.args_owned(args, 1)?;
    let control = Arc::new(WorkerControl::new());
    let mut worker = eval.seed().detached(Arc::clone(&control));

    let handle = thread::Builder::new()
        .name("kite-worker".to_string())
        .spawn(move || {
            let span = tracing::debug_span!("worker");
            let _entered = span.enter();
            match worker.call_code(&code, call_args, None) {
                Ok(value) => value.materialize(),
                Err(ControlAction::Stop) => Value::null(),
                Err(action) => Value::error(escaped_control(&action)),
            }
        })
        .map_err(|e| resource_error("spawn-failed", e.to_string()))?;

    tracing::debug!(thread = ?handle.thread().id(), "worker spawned");
    let task = TaskResource {
        control,
        thread: handle.thread().id(),
        state: Mutex::new(TaskState {
            handle: Some(handle),
            outcome: None,
        }),
    };
    let handle = Value::object(Some(task_class().clone()), Vec::new());
    Ok(handle.with_resource(ResourceSlot::new(task)))
}

/// `await(task)`: wait for the worker and return a copy of its result.
///
/// A stopped worker's result is `null`. Waiting on the current worker, or
/// on a worker that panicked, is an error.
fn await_(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("await", args, 1, Some(1))?;
    let resource = task_arg(eval, args, 0)?;
    if with_task(&resource, |task| task.thread == thread::current().id())? {
        return Err(resource_error("self-join", "a worker cannot await itself").into());
    }
    loop {
        match with_task(&resource, TaskResource::poll)? {
            Some(Ok(value)) => return Ok(value),
            Some(Err(message)) => return Err(resource_error("worker-panicked", message).into()),
            None => {}
        }
        eval.checkpoint()?;
        if !eval.control().sleep(POLL_SLICE) {
            return Err(ControlAction::Stop.into());
        }
    }
}

/// `stop()` stops the current evaluator; `stop(task)` asks a worker to stop.
fn stop(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("stop", args, 0, Some(1))?;
    if args.is_empty() {
        return Err(ControlAction::Stop.into());
    }
    let resource = task_arg(eval, args, 0)?;
    with_task(&resource, |task| task.control.request_stop())?;
    Ok(Value::null())
}

/// `suspend(task)`: the worker pauses at its next checkpoint.
fn suspend(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("suspend", args, 1, Some(1))?;
    let resource = task_arg(eval, args, 0)?;
    with_task(&resource, |task| task.control.suspend())?;
    Ok(Value::null())
}

fn resume(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("resume", args, 1, Some(1))?;
    let resource = task_arg(eval, args, 0)?;
    with_task(&resource, |task| task.control.resume())?;
    Ok(Value::null())
}

/// `sleep(ms)`. A stop request cuts the sleep short and stops the caller.
fn sleep(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("sleep", args, 1, Some(1))?;
    let millis = eval.count_arg(args, 0, 0)?;
    let millis = u64::try_from(millis).unwrap_or(u64::MAX);
    if !eval.control().sleep(Duration::from_millis(millis)) {
        return Err(ControlAction::Stop.into());
    }
    Ok(Value::null())
}
