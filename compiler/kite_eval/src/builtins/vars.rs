//! Bindings and assignment.
//!
//! `set`, `append`, `extend` and `insert` take their target as a reference:
//! an identifier, `get(...)` or anything else that evaluates to an alias.
//! When the target is an undefined name the lookup error carries the
//! namespace it should have been found in, and the assignment declares the
//! name there unless the evaluator is in a read-only context.

use kite_ir::Name;
use kite_value::{
    assign, dangling_reference, type_mismatch, AssignMode, ErrorValue, Node, Value, ValueFlags,
    ValueKind,
};

use crate::evaluator::read;
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("set", set),
    NativeSpec::new("let", let_),
    NativeSpec::new("const", constant),
    NativeSpec::new("copy", copy),
    NativeSpec::new("ref", reference),
    NativeSpec::new("append", append),
    NativeSpec::new("extend", extend),
    NativeSpec::new("insert", insert),
    NativeSpec::new("readonly", readonly),
    NativeSpec::new("type", type_name),
    NativeSpec::new("defined", defined),
];

/// Assign `value` to `target` and return a reference to the assigned cell.
fn assign_to(
    eval: &mut Evaluator,
    target: Value,
    value: Value,
    mode: AssignMode,
) -> OpResult {
    if let ValueKind::Alias(slot) = &target.kind {
        let handle = slot.upgrade().ok_or_else(dangling_reference)?;
        assign(&handle, value, mode)?;
        return Ok(target);
    }

    let pending = target.as_error().and_then(ErrorValue::pending).cloned();
    match pending {
        Some(pending) if !eval.is_read_only() => {
            let (initial, rest) = match mode {
                AssignMode::Replace => (value, None),
                AssignMode::Append { .. } | AssignMode::Extend => (Value::null(), Some(value)),
            };
            let slot = eval
                .env
                .declare_in(&pending.namespace, pending.name, initial)?;
            if let Some(rest) = rest {
                let handle = slot.upgrade().ok_or_else(dangling_reference)?;
                assign(&handle, rest, mode)?;
            }
            tracing::trace!(name = pending.name.as_str(), "auto-declared");
            let alias = Value::alias(slot);
            if pending.namespace.ptr_eq(&eval.env.global_namespace()) {
                Ok(alias)
            } else {
                Ok(alias.with_flags(ValueFlags::LOCAL_ONLY))
            }
        }
        _ if target.is_error() => Err(Flow::Fail(target.materialize())),
        _ => Err(type_mismatch("assignable reference", target.type_name()).into()),
    }
}

/// The value argument of an assignment. Error values may be stored, but a
/// lookup failure is reported rather than bound.
fn assigned_value(eval: &mut Evaluator, args: &[Node], index: usize) -> OpResult {
    let value = eval.arg_raw(args, index)?;
    let pending = value
        .as_error()
        .is_some_and(|error| error.pending().is_some());
    if pending {
        return Err(Flow::Fail(value.materialize()));
    }
    Ok(value)
}

/// `set(target, value)`.
///
/// Assigning to an existing cell replaces its content with a copy of
/// `value`. Declaring a new name binds `value` as it is, so `set(r, list)`
/// makes `r` a reference to `list`.
fn set(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("set", args, 2, Some(2))?;
    let value = assigned_value(eval, args, 1)?;
    let target = eval.arg_raw(args, 0)?;
    assign_to(eval, target, value, AssignMode::Replace)
}

/// `let(name, value)`: declare in the innermost frame, shadowing outer
/// bindings.
fn let_(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("let", args, 1, Some(2))?;
    let name = eval.name_arg(args, 0)?;
    let value = assigned_value(eval, args, 1)?;
    declare_local(eval, name, value)
}

fn declare_local(eval: &mut Evaluator, name: Name, value: Value) -> OpResult {
    let slot = eval.env.declare(name, value)?;
    let alias = Value::alias(slot);
    if eval.env.depth() > 1 {
        Ok(alias.with_flags(ValueFlags::LOCAL_ONLY))
    } else {
        Ok(alias)
    }
}

/// A constant copy: the copy and everything inside it reject assignment.
fn constant(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("const", args, 1, Some(1))?;
    let value = eval.arg_owned(args, 0)?;
    Ok(value.into_const().deep_copy())
}

fn copy(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("copy", args, 1, Some(1))?;
    Ok(eval.arg(args, 0)?.deep_copy())
}

/// The reference an argument evaluates to. In argument position of `call`
/// and `method` this passes the reference itself instead of a copy.
fn reference(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("ref", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    if value.is_alias() {
        Ok(value)
    } else {
        Err(type_mismatch("assignable reference", value.type_name()).into())
    }
}

/// `append(target, value, position?)`.
fn append(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("append", args, 2, Some(3))?;
    let value = eval.arg(args, 1)?;
    let position = optional_position(eval, args, 2)?;
    let target = eval.arg_raw(args, 0)?;
    assign_to(eval, target, value, AssignMode::Append { position })
}

/// `insert(target, position, value)`.
fn insert(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("insert", args, 3, Some(3))?;
    let position = optional_position(eval, args, 1)?;
    let value = eval.arg(args, 2)?;
    let target = eval.arg_raw(args, 0)?;
    assign_to(eval, target, value, AssignMode::Append { position })
}

fn optional_position(
    eval: &mut Evaluator,
    args: &[Node],
    index: usize,
) -> Result<Option<usize>, Flow> {
    let value = eval.arg(args, index)?;
    if read(&value, Value::is_null)? {
        return Ok(None);
    }
    let count = read(&value, kite_value::numeric::to_count)??;
    Ok(Some(count))
}

/// `extend(target, composite)`.
fn extend(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("extend", args, 2, Some(2))?;
    let value = eval.arg(args, 1)?;
    let target = eval.arg_raw(args, 0)?;
    assign_to(eval, target, value, AssignMode::Extend)
}

/// Evaluate the body without auto-declaration: assigning to an undefined
/// name returns the lookup error instead.
fn readonly(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    Ok(eval.with_read_only(|eval| eval.eval_block(args))?)
}

fn type_name(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("type", args, 1, Some(1))?;
    let value = eval.arg_raw(args, 0)?;
    let name = value.with_resolved(Value::type_name).unwrap_or("error");
    Ok(Value::string(name))
}

fn defined(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("defined", args, 1, Some(1))?;
    let name = eval.name_arg(args, 0)?;
    Ok(Value::bool(eval.env.find(name).is_ok()))
}
