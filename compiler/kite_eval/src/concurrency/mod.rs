//! Workers, monitors and data-parallel operations.
//!
//! A worker is an evaluator on its own OS thread. It shares the global
//! frame, the registry and the print handler with the evaluator that
//! started it, and nothing else: arguments are copied in and the result is
//! copied out. Workers are stopped cooperatively through [`WorkerControl`].

mod control;
mod monitor;
mod parallel;
mod task;

pub use control::WorkerControl;
pub(crate) use control::POLL_SLICE;
pub(crate) use monitor::OPS as MONITOR_OPS;
pub(crate) use parallel::OPS as PARALLEL_OPS;
pub(crate) use task::OPS as TASK_OPS;

use std::any::Any;

/// Text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "worker panicked".to_string()
    }
}
