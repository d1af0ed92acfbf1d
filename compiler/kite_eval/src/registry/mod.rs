//! Operation registry: operation name to handler.
//!
//! Every built-in implements [`Operation`]. The registry starts out holding
//! only factories; the handler for a name is created the first time a plan
//! invokes it and cached from then on, so a plan that uses five operations
//! instantiates five handlers no matter how large the catalog is.
//!
//! Embedders extend the catalog with [`OperationRegistry::register`]. A
//! registration made after a name was already instantiated replaces the
//! cached handler.

use std::fmt;
use std::sync::Arc;

use kite_ir::Name;
use kite_value::{ControlAction, EvalError, EvalResult, Node, Value};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{EvalConfig, Evaluator};

/// The dispatch contract every operation implements.
pub trait Operation: Send + Sync {
    /// The name plans invoke this operation by.
    fn name(&self) -> &'static str;

    /// Run the operation on unevaluated argument nodes.
    ///
    /// Each operation decides which arguments to evaluate, which to defer and
    /// which to treat as raw syntax. Failures are returned as error values;
    /// only control-flow operations return `Err`.
    fn evaluate(&self, eval: &mut Evaluator, args: &[Node]) -> EvalResult;

    /// Compute the result from literal arguments ahead of time.
    ///
    /// Must be free of side effects and agree with `evaluate`. Returning
    /// `None` leaves the node to be evaluated normally.
    fn pre_fold(&self, _config: &EvalConfig, _args: &[&Value]) -> Option<Value> {
        None
    }
}

/// Outcome of a native operation body before it is mapped onto
/// [`EvalResult`]: an error value short-circuits with `?` the same way a
/// control action does.
pub enum Flow {
    Control(ControlAction),
    Fail(Value),
}

impl From<ControlAction> for Flow {
    fn from(action: ControlAction) -> Self {
        Flow::Control(action)
    }
}

impl From<EvalError> for Flow {
    fn from(error: EvalError) -> Self {
        Flow::Fail(Value::error(error))
    }
}

pub type OpResult = Result<Value, Flow>;

pub type NativeFn = fn(&mut Evaluator, &[Node]) -> OpResult;
pub type FoldFn = fn(&EvalConfig, &[&Value]) -> Option<Value>;

/// Catalog entry for an operation implemented as plain functions.
#[derive(Copy, Clone)]
pub struct NativeSpec {
    pub name: &'static str,
    pub eval: NativeFn,
    pub fold: Option<FoldFn>,
}

impl NativeSpec {
    pub const fn new(name: &'static str, eval: NativeFn) -> Self {
        NativeSpec {
            name,
            eval,
            fold: None,
        }
    }

    pub const fn folding(name: &'static str, eval: NativeFn, fold: FoldFn) -> Self {
        NativeSpec {
            name,
            eval,
            fold: Some(fold),
        }
    }
}

/// An [`Operation`] backed by a [`NativeSpec`].
pub struct NativeOp {
    spec: NativeSpec,
}

impl NativeOp {
    pub fn new(spec: NativeSpec) -> Self {
        NativeOp { spec }
    }
}

impl Operation for NativeOp {
    fn name(&self) -> &'static str {
        self.spec.name
    }

    fn evaluate(&self, eval: &mut Evaluator, args: &[Node]) -> EvalResult {
        match (self.spec.eval)(eval, args) {
            Ok(value) | Err(Flow::Fail(value)) => Ok(value),
            Err(Flow::Control(action)) => Err(action),
        }
    }

    fn pre_fold(&self, config: &EvalConfig, args: &[&Value]) -> Option<Value> {
        self.spec.fold.and_then(|fold| fold(config, args))
    }
}

type Factory = Box<dyn Fn() -> Arc<dyn Operation> + Send + Sync>;

/// Name-keyed operation table with lazy, memoized instantiation.
pub struct OperationRegistry {
    factories: RwLock<FxHashMap<Name, Factory>>,
    instances: RwLock<FxHashMap<Name, Arc<dyn Operation>>>,
}

impl OperationRegistry {
    /// A registry with no operations.
    pub fn empty() -> Self {
        OperationRegistry {
            factories: RwLock::new(FxHashMap::default()),
            instances: RwLock::new(FxHashMap::default()),
        }
    }

    /// A registry holding the built-in catalog.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        for spec in crate::builtins::catalog() {
            registry.register_native(*spec);
        }
        registry
    }

    /// Register a catalog entry.
    pub fn register_native(&self, spec: NativeSpec) {
        self.register_factory(spec.name, move || Arc::new(NativeOp::new(spec)));
    }

    /// Register a handler under its own name.
    pub fn register(&self, op: Arc<dyn Operation>) {
        let name = op.name();
        self.register_factory(name, move || Arc::clone(&op));
    }

    fn register_factory(
        &self,
        name: &str,
        factory: impl Fn() -> Arc<dyn Operation> + Send + Sync + 'static,
    ) {
        let name = Name::intern(name);
        self.instances.write().remove(&name);
        self.factories.write().insert(name, Box::new(factory));
    }

    /// The handler for `name`, instantiating it on first use.
    pub fn lookup(&self, name: Name) -> Option<Arc<dyn Operation>> {
        if let Some(op) = self.instances.read().get(&name) {
            return Some(Arc::clone(op));
        }
        let op = {
            let factories = self.factories.read();
            let factory = factories.get(&name)?;
            factory()
        };
        tracing::trace!(op = name.as_str(), "instantiating operation");
        let mut instances = self.instances.write();
        Some(Arc::clone(instances.entry(name).or_insert(op)))
    }

    /// Whether an operation is registered under `name`.
    pub fn contains(&self, name: Name) -> bool {
        self.factories.read().contains_key(&name)
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.read().keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of handlers instantiated so far.
    pub fn instantiated(&self) -> usize {
        self.instances.read().len()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("registered", &self.factories.read().len())
            .field("instantiated", &self.instantiated())
            .finish()
    }
}

#[cfg(test)]
mod tests;
