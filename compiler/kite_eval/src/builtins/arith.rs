//! Arithmetic: `add`, `sub`, `mul`, `div`, `mod`, `neg`, `abs`, `min`, `max`.
//!
//! The binary operators fold left over any number of arguments, so
//! `add(1, 2, 3)` is `(1 + 2) + 3`.

use std::cmp::Ordering;

use kite_value::numeric::{self, ArithOp};
use kite_value::{type_mismatch, Node, Value};

use crate::evaluator::read;
use crate::registry::{NativeSpec, OpResult};
use crate::{EvalConfig, Evaluator};

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::folding("add", add, fold_add),
    NativeSpec::folding("sub", sub, fold_sub),
    NativeSpec::folding("mul", mul, fold_mul),
    NativeSpec::folding("div", div, fold_div),
    NativeSpec::folding("mod", rem, fold_rem),
    NativeSpec::folding("neg", neg, fold_neg),
    NativeSpec::folding("abs", abs, fold_abs),
    NativeSpec::new("min", min),
    NativeSpec::new("max", max),
];

fn binary(eval: &mut Evaluator, args: &[Node], op: ArithOp, name: &str) -> OpResult {
    eval.expect_args(name, args, 2, None)?;
    let mut acc = eval.arg_owned(args, 0)?;
    for index in 1..args.len() {
        let rhs = eval.arg(args, index)?;
        acc = read(&rhs, |rhs| numeric::arith(op, &acc, rhs))??;
    }
    Ok(acc)
}

fn fold_binary(op: ArithOp, args: &[&Value]) -> Option<Value> {
    let (first, rest) = args.split_first()?;
    if rest.is_empty() {
        return None;
    }
    rest.iter()
        .try_fold(first.deep_copy(), |acc, rhs| numeric::arith(op, &acc, rhs).ok())
}

fn add(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    binary(eval, args, ArithOp::Add, "add")
}

fn sub(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    binary(eval, args, ArithOp::Sub, "sub")
}

fn mul(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    binary(eval, args, ArithOp::Mul, "mul")
}

fn div(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    binary(eval, args, ArithOp::Div, "div")
}

fn rem(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    binary(eval, args, ArithOp::Rem, "mod")
}

fn fold_add(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_binary(ArithOp::Add, args)
}

fn fold_sub(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_binary(ArithOp::Sub, args)
}

fn fold_mul(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_binary(ArithOp::Mul, args)
}

fn fold_div(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_binary(ArithOp::Div, args)
}

fn fold_rem(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_binary(ArithOp::Rem, args)
}

fn neg(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("neg", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    Ok(read(&value, numeric::negate)??)
}

fn fold_neg(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    match args {
        [value] => numeric::negate(value).ok(),
        _ => None,
    }
}

fn abs(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("abs", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    Ok(read(&value, numeric::abs)??)
}

fn fold_abs(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    match args {
        [value] => numeric::abs(value).ok(),
        _ => None,
    }
}

fn extreme(eval: &mut Evaluator, args: &[Node], name: &str, keep: Ordering) -> OpResult {
    eval.expect_args(name, args, 1, None)?;
    let mut best = eval.arg_owned(args, 0)?;
    for index in 1..args.len() {
        let candidate = eval.arg_owned(args, index)?;
        match numeric::compare(&candidate, &best) {
            Some(order) if order == keep => best = candidate,
            Some(_) => {}
            None => {
                let got = format!("{} and {}", best.type_name(), candidate.type_name());
                return Err(type_mismatch("comparable values", &got).into());
            }
        }
    }
    Ok(best)
}

fn min(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    extreme(eval, args, "min", Ordering::Less)
}

fn max(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    extreme(eval, args, "max", Ordering::Greater)
}
