//! Classes, instances and member access.

use kite_ir::Name;
use kite_value::{
    numeric, type_mismatch, undefined_name, ClassDescriptor, ClassRef, Node, PendingAssignment,
    Slot, SlotHandle, Value, ValueFlags, ValueKind,
};

use super::target_cell;
use crate::environment::FrameKind;
use crate::evaluator::{read, type_of};
use crate::intrinsics::intrinsic_class;
use crate::members::{class_label, find_member, MemberLookup};
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("class", class),
    NativeSpec::new("new", new),
    NativeSpec::new("object", object),
    NativeSpec::new("get", get),
    NativeSpec::new("has", has),
    NativeSpec::new("keys", keys),
    NativeSpec::new("is-a", is_a),
    NativeSpec::new("class-of", class_of),
];

/// `class(name, parent, body...)`.
///
/// The body runs in a block frame; every binding it declares (with `let`,
/// or `set` on a fresh name) becomes a class member in declaration order.
fn class(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("class", args, 2, None)?;
    let name = eval.name_arg(args, 0)?;
    let parent = eval.arg(args, 1)?;
    let parent = read(&parent, |v| match &v.kind {
        ValueKind::Null => Ok(None),
        ValueKind::Class(class) => Ok(Some(class.clone())),
        _ => Err(type_mismatch("class or null", v.type_name())),
    })??;

    let members = {
        let mut scoped = eval.scoped(FrameKind::Block);
        scoped.eval_block(&args[2..])?;
        scoped.env.take_bindings()
    };
    tracing::debug!(class = name.as_str(), members = members.len(), "class defined");
    let descriptor = ClassDescriptor::new(name, parent, members);
    Ok(Value::class_value(ClassRef::new(descriptor)))
}

fn class_arg(eval: &mut Evaluator, args: &[Node], index: usize) -> Result<ClassRef, Flow> {
    let value = eval.arg(args, index)?;
    let class = read(&value, |v| match &v.kind {
        ValueKind::Class(class) => Ok(class.clone()),
        _ => Err(type_mismatch("class", v.type_name())),
    })?;
    Ok(class?)
}

/// `new(class, args...)`: an instance with no members of its own yet. An
/// `init` member, if the class has one, is called on it with the
/// arguments.
fn new(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("new", args, 1, None)?;
    let class = class_arg(eval, args, 0)?;
    let init = class
        .find_member(Name::intern("init"))
        .and_then(|(_, member)| member.as_code().cloned());
    let args = eval.args_owned(args, 1)?;
    let slot = Slot::new(Value::object(Some(class), Vec::new()));
    if let Some(init) = init {
        let this = Value::alias(slot.downgrade());
        let result = eval.call_code(&init, args, Some(this))?;
        if result.with_resolved(Value::is_error).unwrap_or(true) {
            return Ok(result.materialize());
        }
    }
    Ok(slot.into_value())
}

/// `object(name, value, ...)`: a classless object from name/value pairs.
fn object(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    if args.len() % 2 != 0 {
        return Err(type_mismatch("name/value pairs", "odd argument count").into());
    }
    let mut fields = Vec::with_capacity(args.len() / 2);
    for index in (0..args.len()).step_by(2) {
        let name = eval.name_arg(args, index)?;
        let value = eval.arg_owned(args, index + 1)?;
        fields.push((name, value));
    }
    Ok(Value::object(None, fields))
}

/// `get(target, key)`.
///
/// A string key looks up a member the way a method call does; an int key
/// indexes a composite's members or a string's characters. Through a
/// reference the result is a reference to the member. A missing member of
/// an object is reported with the hint `set` needs to add it.
fn get(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("get", args, 2, Some(2))?;
    let target = eval.arg(args, 0)?;
    let key = eval.arg_owned(args, 1)?;
    if target.is_alias() {
        let handle = target_cell(&target)?;
        let found = get_in(&handle, &key)?;
        return Ok(if target.is_local_only() && found.is_alias() {
            found.with_flags(ValueFlags::LOCAL_ONLY)
        } else {
            found
        });
    }
    let slot = Slot::new(target);
    let found = get_in(&slot.handle(), &key);
    found.map(Value::materialize)
}

fn get_in(handle: &SlotHandle, key: &Value) -> OpResult {
    if let Some(name) = key.as_str() {
        let name = Name::intern(name);
        return match find_member(handle, name) {
            MemberLookup::Found(slot) => Ok(Value::alias(slot)),
            MemberLookup::Temp(value) => Ok(value),
            MemberLookup::Missing => {
                let content = handle.read();
                let error = undefined_name(name.as_str(), &class_label(&content));
                if matches!(content.kind, ValueKind::Object(_)) {
                    Err(Flow::Fail(Value::pending_error(
                        error,
                        PendingAssignment {
                            name,
                            namespace: handle.downgrade(),
                        },
                    )))
                } else {
                    Err(error.into())
                }
            }
        };
    }

    let content = handle.read();
    match &content.kind {
        ValueKind::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let index = numeric::to_index(key, chars.len())?;
            Ok(Value::string(chars[index].to_string()))
        }
        ValueKind::Bytes(bytes) => {
            let index = numeric::to_index(key, bytes.len())?;
            Ok(Value::int(i64::from(bytes[index])))
        }
        _ => {
            let Some(members) = content.members() else {
                return Err(type_mismatch("indexable value", content.type_name()).into());
            };
            let index = numeric::to_index(key, members.len())?;
            Ok(Value::alias(members[index].slot.downgrade()))
        }
    }
}

/// `has(target, name)`: own member or class member.
fn has(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("has", args, 2, Some(2))?;
    let target = eval.arg(args, 0)?;
    let name = eval.name_arg(args, 1)?;
    let found = read(&target, |v| {
        v.member(name).is_some()
            || v.class
                .clone()
                .or_else(|| intrinsic_class(v))
                .is_some_and(|class| class.find_member(name).is_some())
    })?;
    Ok(Value::bool(found))
}

/// Names of the named members, first occurrence order, without repeats.
fn keys(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("keys", args, 1, Some(1))?;
    let target = eval.arg(args, 0)?;
    let names = read(&target, |v| {
        let mut names: Vec<Name> = Vec::new();
        for member in v.members().unwrap_or_default() {
            if let Some(name) = member.name {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    })?;
    Ok(Value::list(
        names.into_iter().map(|n| Value::string(n.as_str())).collect(),
    ))
}

/// `is-a(value, name)`: the value's class or an ancestor is `name`, or the
/// value's type is.
fn is_a(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("is-a", args, 2, Some(2))?;
    let value = eval.arg(args, 0)?;
    let name = eval.name_arg(args, 1)?;
    let result = read(&value, |v| {
        v.type_name() == name.as_str()
            || v.class
                .clone()
                .or_else(|| intrinsic_class(v))
                .is_some_and(|class| class.is_a(name))
    })?;
    Ok(Value::bool(result))
}

/// The class of an object, or the intrinsic class of a built-in value.
fn class_of(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("class-of", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    let class = read(&value, |v| v.class.clone().or_else(|| intrinsic_class(v)))?;
    match class {
        Some(class) => Ok(Value::class_value(class)),
        None if read(&value, Value::is_null)? => Ok(Value::null()),
        None => Err(type_mismatch("value with a class", &type_of(&value)).into()),
    }
}
