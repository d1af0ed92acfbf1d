//! Kite Eval - scope stack, operation registry and evaluator.
//!
//! # Architecture
//!
//! - [`Environment`]: the scope stack. Every frame is a namespace object and
//!   every binding a member slot, so names resolve to aliases of cells.
//! - [`OperationRegistry`]: operation name to handler, instantiated lazily.
//!   The built-in catalog lives in `builtins` and `concurrency`.
//! - [`Evaluator`]: walks a plan [`Node`](kite_value::Node) tree, routing
//!   every call through the registry.
//! - [`WorkerControl`]: cooperative stop and suspend flags shared with
//!   workers.
//!
//! Values, slots and errors come from `kite_value` and are re-exported here
//! for convenience.

mod builtins;
mod concurrency;
mod config;
mod environment;
pub mod evaluator;
pub mod intrinsics;
mod members;
mod print_handler;
pub mod registry;
mod shared;

pub use kite_value::{
    ControlAction, EvalError, EvalErrorKind, EvalResult, Name, Node, Slot, SlotHandle, SlotRef,
    Value, ValueKind,
};

pub use builtins::catalog;
pub use concurrency::WorkerControl;
pub use config::{EvalConfig, EvalMode};
pub use environment::{Environment, Found, Frame, FrameKind};
pub use evaluator::{Evaluator, EvaluatorBuilder, ScopedEvaluator, WorkerSeed};
pub use print_handler::{
    buffer_handler, handler_for, silent_handler, stdout_handler, BufferPrintHandler, PrintHandler,
    SharedPrintHandler,
};
pub use registry::{Flow, NativeOp, NativeSpec, OpResult, Operation, OperationRegistry};
pub use shared::SharedRegistry;
