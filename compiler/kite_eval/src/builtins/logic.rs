//! Comparison and boolean logic.

use std::cmp::Ordering;

use kite_value::numeric;
use kite_value::{type_mismatch, Node, Value};

use crate::evaluator::read;
use crate::registry::{NativeSpec, OpResult};
use crate::{EvalConfig, Evaluator};

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::folding("eq", eq, fold_eq),
    NativeSpec::folding("ne", ne, fold_ne),
    NativeSpec::folding("lt", lt, fold_lt),
    NativeSpec::folding("le", le, fold_le),
    NativeSpec::folding("gt", gt, fold_gt),
    NativeSpec::folding("ge", ge, fold_ge),
    NativeSpec::new("and", and),
    NativeSpec::new("or", or),
    NativeSpec::folding("not", not, fold_not),
];

/// Evaluate two operands and run `f` on their terminal values.
fn with_pair<R>(
    eval: &mut Evaluator,
    args: &[Node],
    name: &str,
    f: impl FnOnce(&Value, &Value) -> R,
) -> Result<R, crate::registry::Flow> {
    eval.expect_args(name, args, 2, Some(2))?;
    let left = eval.arg(args, 0)?;
    let right = eval.arg(args, 1)?;
    read(&left, |l| read(&right, |r| f(l, r)))?
}

fn eq(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    Ok(Value::bool(with_pair(eval, args, "eq", numeric::loose_eq)?))
}

fn ne(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    Ok(Value::bool(!with_pair(eval, args, "ne", numeric::loose_eq)?))
}

fn ordered(eval: &mut Evaluator, args: &[Node], name: &str, accept: fn(Ordering) -> bool) -> OpResult {
    let outcome = with_pair(eval, args, name, |l, r| {
        numeric::compare(l, r).ok_or_else(|| {
            type_mismatch(
                "comparable values",
                &format!("{} and {}", l.type_name(), r.type_name()),
            )
        })
    })?;
    Ok(Value::bool(accept(outcome?)))
}

fn lt(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    ordered(eval, args, "lt", Ordering::is_lt)
}

fn le(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    ordered(eval, args, "le", Ordering::is_le)
}

fn gt(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    ordered(eval, args, "gt", Ordering::is_gt)
}

fn ge(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    ordered(eval, args, "ge", Ordering::is_ge)
}

fn fold_compare(args: &[&Value], accept: fn(Ordering) -> bool) -> Option<Value> {
    match args {
        [l, r] => numeric::compare(l, r).map(|order| Value::bool(accept(order))),
        _ => None,
    }
}

fn fold_eq(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    match args {
        [l, r] if !l.is_error() && !r.is_error() => Some(Value::bool(numeric::loose_eq(l, r))),
        _ => None,
    }
}

fn fold_ne(config: &EvalConfig, args: &[&Value]) -> Option<Value> {
    let equal = fold_eq(config, args)?.as_bool()?;
    Some(Value::bool(!equal))
}

fn fold_lt(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_compare(args, Ordering::is_lt)
}

fn fold_le(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_compare(args, Ordering::is_le)
}

fn fold_gt(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_compare(args, Ordering::is_gt)
}

fn fold_ge(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_compare(args, Ordering::is_ge)
}

/// Short-circuit: stops at the first falsy operand. Error operands count as
/// false rather than failing the whole expression.
fn and(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    for index in 0..args.len() {
        if !eval.arg_raw(args, index)?.is_truthy() {
            return Ok(Value::bool(false));
        }
    }
    Ok(Value::bool(true))
}

fn or(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    for index in 0..args.len() {
        if eval.arg_raw(args, index)?.is_truthy() {
            return Ok(Value::bool(true));
        }
    }
    Ok(Value::bool(false))
}

fn not(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("not", args, 1, Some(1))?;
    Ok(Value::bool(!eval.arg_raw(args, 0)?.is_truthy()))
}

fn fold_not(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    match args {
        [value] => Some(Value::bool(!value.is_truthy())),
        _ => None,
    }
}
