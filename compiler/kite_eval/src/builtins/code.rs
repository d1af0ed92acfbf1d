//! User code: building code values, calling them, and method dispatch.

use std::sync::Arc;

use kite_ir::Name;
use kite_value::{
    no_such_method, not_callable, type_mismatch, wrong_arg_count, Node, Slot, SlotHandle, Value,
    ValueFlags,
};

use super::code_arg;
use super::member_copies;
use crate::evaluator::{read, type_of};
use crate::members::{class_label, find_member, MemberLookup};
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("code", code),
    NativeSpec::new("quote", quote),
    NativeSpec::new("call", call),
    NativeSpec::new("apply", apply),
    NativeSpec::new("eval", eval_code),
    NativeSpec::new("method", method),
];

/// `code(param..., body)`. The body is kept unevaluated.
fn code(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    let Some((body, params)) = args.split_last() else {
        return Err(wrong_arg_count("code", 1, 0).into());
    };
    let params = (0..params.len())
        .map(|index| eval.name_arg(params, index))
        .collect::<Result<Vec<Name>, Flow>>()?;
    Ok(Value::code(params, Arc::new(body.duplicate())))
}

/// `quote(node)`: the node itself as a parameterless code value.
fn quote(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("quote", args, 1, Some(1))?;
    Ok(Value::code(Vec::new(), Arc::new(args[0].duplicate())))
}

/// Call arguments from `start` on. An argument written as `ref(x)` is
/// passed as a reference; everything else is copied.
fn call_args(eval: &mut Evaluator, args: &[Node], start: usize) -> Result<Vec<Value>, Flow> {
    let by_ref = Name::intern("ref");
    (start..args.len())
        .map(|index| match &args[index] {
            Node::Call(call) if call.op == by_ref => eval.arg(args, index),
            _ => eval.arg_owned(args, index),
        })
        .collect()
}

/// `call(code, args...)`.
fn call(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("call", args, 1, None)?;
    let code = code_arg(eval, args, 0)?;
    let args = call_args(eval, args, 1)?;
    Ok(eval.call_code(&code, args, None)?)
}

/// `apply(code, list)`: call with the list's members as arguments.
fn apply(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("apply", args, 2, Some(2))?;
    let code = code_arg(eval, args, 0)?;
    let list = eval.arg(args, 1)?;
    let args = read(&list, member_copies)?
        .ok_or_else(|| type_mismatch("list", &type_of(&list)))?;
    Ok(eval.call_code(&code, args, None)?)
}

/// `eval(code)`: run a code value's body in the current scope.
fn eval_code(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("eval", args, 1, Some(1))?;
    let code = code_arg(eval, args, 0)?;
    Ok(eval.evaluate(&code.body)?)
}

/// `method(receiver, name, args...)`.
fn method(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("method", args, 2, None)?;
    let receiver = eval.arg(args, 0)?;
    let name = eval.name_arg(args, 1)?;
    let args = call_args(eval, args, 2)?;
    invoke_method(eval, receiver, name, args)
}

/// Look `name` up on `receiver` and call it with the receiver as `this`.
///
/// A member that is not code is returned as it is when no arguments were
/// given, so `method(point, "x")` reads a field. A temporary receiver lives
/// only for the duration of the call and the result is copied out of it.
fn invoke_method(
    eval: &mut Evaluator,
    receiver: Value,
    name: Name,
    args: Vec<Value>,
) -> OpResult {
    if let Some(target) = receiver.as_alias() {
        let handle = target.resolve()?;
        let local = receiver.is_local_only();
        return call_member(eval, &handle, local, name, args);
    }
    let slot = Slot::new(receiver);
    let result = call_member(eval, &slot.handle(), false, name, args);
    result.map(Value::materialize)
}

fn call_member(
    eval: &mut Evaluator,
    receiver: &SlotHandle,
    local: bool,
    name: Name,
    args: Vec<Value>,
) -> OpResult {
    let member = match find_member(receiver, name) {
        MemberLookup::Found(slot) if local => {
            Value::alias(slot).with_flags(ValueFlags::LOCAL_ONLY)
        }
        MemberLookup::Found(slot) => Value::alias(slot),
        MemberLookup::Temp(value) => value,
        MemberLookup::Missing => {
            let label = class_label(&receiver.read());
            return Err(no_such_method(name.as_str(), &label).into());
        }
    };
    match read(&member, |v| v.as_code().cloned())? {
        Some(code) => {
            let this = Value::alias(receiver.downgrade());
            Ok(eval.call_code(&code, args, Some(this))?)
        }
        None if args.is_empty() => Ok(member),
        None => Err(not_callable(&type_of(&member)).into()),
    }
}
