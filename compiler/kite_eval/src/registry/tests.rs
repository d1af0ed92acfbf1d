use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::SharedRegistry;
use pretty_assertions::assert_eq;

fn answer(_: &mut Evaluator, _: &[Node]) -> OpResult {
    Ok(Value::int(42))
}

fn failing(_: &mut Evaluator, _: &[Node]) -> OpResult {
    Err(kite_value::division_by_zero().into())
}

#[test]
fn test_handlers_are_instantiated_on_first_use() {
    let registry = OperationRegistry::with_builtins();
    assert_eq!(registry.instantiated(), 0);
    assert!(registry.contains(Name::intern("add")));

    let first = registry.lookup(Name::intern("add"));
    let again = registry.lookup(Name::intern("add"));
    assert_eq!(registry.instantiated(), 1);
    assert!(matches!((first, again), (Some(a), Some(b)) if Arc::ptr_eq(&a, &b)));
}

#[test]
fn test_unknown_name_is_not_instantiated() {
    let registry = OperationRegistry::with_builtins();
    assert!(registry.lookup(Name::intern("no-such-op")).is_none());
    assert_eq!(registry.instantiated(), 0);
}

#[test]
fn test_registration_replaces_cached_handler() {
    let registry = OperationRegistry::empty();
    registry.register_native(NativeSpec::new("answer", failing));
    let before = registry.lookup(Name::intern("answer"));
    registry.register_native(NativeSpec::new("answer", answer));
    let after = registry.lookup(Name::intern("answer"));

    let mut eval = Evaluator::new();
    let run = |op: Option<Arc<dyn Operation>>, eval: &mut Evaluator| {
        op.map(|op| op.evaluate(eval, &[]))
    };
    let before = run(before, &mut eval);
    let after = run(after, &mut eval);
    assert!(matches!(before, Some(Ok(v)) if v.is_error()));
    assert!(matches!(after, Some(Ok(v)) if v.as_i64() == Some(42)));
}

#[test]
fn test_failure_becomes_error_value() {
    let op = NativeOp::new(NativeSpec::new("failing", failing));
    let result = op.evaluate(&mut Evaluator::new(), &[]);
    let code = result
        .ok()
        .and_then(|v| v.as_error().map(|e| e.error.code().to_string()));
    assert_eq!(code.as_deref(), Some("division-by-zero"));
}

#[test]
fn test_catalog_names_are_unique() {
    let mut names: Vec<&str> = crate::builtins::catalog().map(|spec| spec.name).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
}

struct Counting(AtomicUsize);

impl Operation for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn evaluate(&self, _: &mut Evaluator, _: &[Node]) -> EvalResult {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Value::int(i64::try_from(n).unwrap_or(i64::MAX)))
    }
}

#[test]
fn test_embedder_operations_keep_state() {
    let registry = SharedRegistry::new(OperationRegistry::with_builtins());
    registry.register(Arc::new(Counting(AtomicUsize::new(0))));
    let mut eval = Evaluator::builder()
        .mode(crate::EvalMode::Capture)
        .registry(registry)
        .build();
    let plan = Node::call(
        "seq",
        vec![Node::call("counting", vec![]), Node::call("counting", vec![])],
    );
    assert_eq!(eval.run(&plan).as_i64(), Some(2));
}
