//! Tree-walking plan evaluator.
//!
//! # Evaluation
//!
//! [`Evaluator::evaluate`] maps a plan node to an [`EvalResult`]:
//!
//! - a literal evaluates to a fresh copy of itself,
//! - an identifier to an alias of the cell it is bound to (or to the lookup
//!   error, which carries the hint `set` uses to declare the name),
//! - a call to whatever its operation returns. Unknown operations evaluate to
//!   an `unknown-operation` error value.
//!
//! Calls whose arguments are all literals may be folded once through the
//! operation's `pre_fold`; the result is memoized in the node.
//!
//! # Control Flow
//!
//! `break`, `continue`, `return` and a cooperative stop travel in the `Err`
//! arm until a boundary absorbs them: loops absorb `break` and `continue`,
//! code calls absorb `return`. Whatever reaches [`Evaluator::run`] unabsorbed
//! becomes an `escaped-control` error value.
//!
//! # Frames
//!
//! Frames are pushed through the RAII guard in [`scope_guard`], which pops
//! them on every exit path and copies out local-only results first.

mod args;
mod builder;
mod scope_guard;

use std::sync::Arc;

use kite_ir::Name;
use kite_stack::ensure_sufficient_stack;
use kite_value::{
    escaped_control, recursion_limit_exceeded, unknown_operation, wrong_arg_count, CallNode,
    CodeValue, ControlAction, EvalResult, Node, SlotHandle, Value,
};

use crate::concurrency::WorkerControl;
use crate::environment::{Environment, FrameKind};
use crate::print_handler::SharedPrintHandler;
use crate::registry::OperationRegistry;
use crate::{EvalConfig, SharedRegistry};

pub use args::read;
pub(crate) use args::type_of;
pub use builder::EvaluatorBuilder;
pub use scope_guard::ScopedEvaluator;

/// One evaluation thread: a scope stack plus everything operations consult.
pub struct Evaluator {
    pub env: Environment,
    registry: SharedRegistry<OperationRegistry>,
    config: EvalConfig,
    print: SharedPrintHandler,
    control: Arc<WorkerControl>,
    depth: usize,
    read_only: usize,
}

/// Everything needed to start an evaluator on another thread.
///
/// Unlike [`Evaluator`] this is `Sync`, so a pool of workers can share one.
#[derive(Clone)]
pub struct WorkerSeed {
    global: SlotHandle,
    registry: SharedRegistry<OperationRegistry>,
    config: EvalConfig,
    print: SharedPrintHandler,
    control: Arc<WorkerControl>,
}

impl WorkerSeed {
    /// A fresh evaluator sharing the global frame, registry and output.
    ///
    /// Workers started from one seed share its control flags, so stopping
    /// the parent stops them too.
    pub fn evaluator(&self) -> Evaluator {
        Evaluator {
            env: Environment::with_global(self.global.clone()),
            registry: self.registry.clone(),
            config: self.config.clone(),
            print: Arc::clone(&self.print),
            control: Arc::clone(&self.control),
            depth: 0,
            read_only: 0,
        }
    }

    /// Like [`evaluator`](Self::evaluator), with its own control flags.
    pub fn detached(&self, control: Arc<WorkerControl>) -> Evaluator {
        Evaluator {
            control,
            ..self.evaluator()
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        EvaluatorBuilder::new().build()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::new()
    }

    #[inline]
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut EvalConfig {
        &mut self.config
    }

    #[inline]
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    #[inline]
    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print
    }

    #[inline]
    pub fn control(&self) -> &Arc<WorkerControl> {
        &self.control
    }

    /// Current nesting of calls and code invocations.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only > 0
    }

    pub fn println(&self, line: &str) {
        self.print.println(line);
    }

    /// What a worker started from this evaluator needs.
    pub fn seed(&self) -> WorkerSeed {
        WorkerSeed {
            global: self.env.global_handle(),
            registry: self.registry.clone(),
            config: self.config.clone(),
            print: Arc::clone(&self.print),
            control: Arc::clone(&self.control),
        }
    }

    /// Evaluate a whole plan and return an owned result.
    ///
    /// A top-level `return` supplies the result and a stop yields `null`;
    /// `break` or `continue` outside a loop become an error value.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, plan: &Node) -> Value {
        let value = match self.evaluate(plan) {
            Ok(value) | Err(ControlAction::Return(value)) => value,
            Err(ControlAction::Stop) => Value::null(),
            Err(action) => Value::error(escaped_control(&action)),
        };
        value.materialize()
    }

    /// Evaluate one plan node.
    pub fn evaluate(&mut self, node: &Node) -> EvalResult {
        match node {
            Node::Literal(value) => Ok(value.deep_copy()),
            Node::Ident(name) => Ok(self.env.lookup(*name)),
            Node::Call(call) => self.dispatch(call),
        }
    }

    fn dispatch(&mut self, call: &CallNode) -> EvalResult {
        let Some(op) = self.registry.lookup(call.op) else {
            return Ok(Value::error(unknown_operation(call.op.as_str())));
        };

        if self.config.fold_constants {
            if let Some(folded) = call.folded() {
                return Ok(folded.deep_copy());
            }
            if let Some(args) = call.literal_args() {
                if let Some(value) = op.pre_fold(&self.config, &args) {
                    tracing::trace!(op = op.name(), "folded");
                    return Ok(call.set_folded(value).deep_copy());
                }
            }
        }

        self.nested(|eval| op.evaluate(eval, &call.args))
    }

    /// Run `f` one level deeper, failing with `recursion-limit` past the
    /// configured depth.
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> EvalResult) -> EvalResult {
        if self.depth >= self.config.max_depth {
            return Ok(Value::error(recursion_limit_exceeded(self.depth)));
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| f(self));
        self.depth -= 1;
        result
    }

    /// Evaluate statements in order. The last result is the block's result;
    /// a control action ends the block early.
    pub fn eval_block(&mut self, nodes: &[Node]) -> EvalResult {
        let mut last = Value::null();
        for node in nodes {
            self.checkpoint()?;
            last = self.evaluate(node)?;
        }
        Ok(last)
    }

    /// Honor stop and suspend requests.
    pub fn checkpoint(&self) -> Result<(), ControlAction> {
        if self.control.is_stopped() {
            return Err(ControlAction::Stop);
        }
        if self.control.is_suspended() && !self.control.wait_while_suspended() {
            return Err(ControlAction::Stop);
        }
        Ok(())
    }

    /// Run `f` in a new frame of `kind`.
    pub fn with_frame(
        &mut self,
        kind: FrameKind,
        f: impl FnOnce(&mut Evaluator) -> EvalResult,
    ) -> EvalResult {
        let mut scoped = self.scoped(kind);
        let result = f(&mut *scoped);
        scoped.release(result)
    }

    /// Run `f` where undeclared names are not auto-declared.
    pub fn with_read_only<T>(&mut self, f: impl FnOnce(&mut Evaluator) -> T) -> T {
        self.read_only += 1;
        let result = f(self);
        self.read_only -= 1;
        result
    }

    /// Invoke a code value.
    ///
    /// Arguments are bound to the parameters in a new call frame; missing
    /// ones are `null`. With a receiver the call also gets an instance frame,
    /// which makes the receiver `this` and its members visible. `return` is
    /// absorbed here.
    #[tracing::instrument(level = "debug", skip_all, fields(params = code.params.len()))]
    pub fn call_code(
        &mut self,
        code: &CodeValue,
        args: Vec<Value>,
        receiver: Option<Value>,
    ) -> EvalResult {
        if args.len() > code.params.len() {
            return Ok(Value::error(wrong_arg_count(
                "code",
                code.params.len(),
                args.len(),
            )));
        }
        let body = Arc::clone(&code.body);
        self.nested(|eval| match receiver {
            Some(receiver) => {
                let mut scoped = eval.scoped_instance(receiver);
                let result = scoped.invoke(&code.params, args, &body);
                scoped.release(result)
            }
            None => eval.invoke(&code.params, args, &body),
        })
    }

    fn invoke(&mut self, params: &[Name], args: Vec<Value>, body: &Node) -> EvalResult {
        let result = self.with_frame(FrameKind::Call, |eval| {
            let mut args = args.into_iter();
            for &param in params {
                let value = args.next().unwrap_or_default();
                if let Err(error) = eval.env.declare(param, value) {
                    return Ok(Value::error(error));
                }
            }
            eval.evaluate(body)
        });
        match result {
            Ok(value) | Err(ControlAction::Return(value)) => Ok(value),
            Err(ControlAction::Stop) => Err(ControlAction::Stop),
            Err(action) => Ok(Value::error(escaped_control(&action))),
        }
    }
}

#[cfg(test)]
mod tests;
