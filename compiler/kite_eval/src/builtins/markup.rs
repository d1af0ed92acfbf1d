//! Markup nodes.

use kite_value::{type_mismatch, Member, Node, Value, ValueKind};

use crate::evaluator::read;
use crate::registry::{NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("markup", markup),
    NativeSpec::new("tag", tag),
];

/// `markup(tag, parts...)`.
///
/// A classless object part contributes its fields as named members; every
/// other part becomes an unnamed child.
fn markup(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("markup", args, 1, None)?;
    let tag = eval.name_arg(args, 0)?;
    let mut members = Vec::new();
    for part in eval.args_owned(args, 1)? {
        match part.kind {
            ValueKind::Object(fields) if part.class.is_none() => members.extend(fields),
            kind => members.push(Member::unnamed(Value { kind, ..part })),
        }
    }
    Ok(Value::markup(tag, members))
}

/// The tag of a markup node, as a string.
fn tag(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("tag", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    let tag = read(&value, |v| match &v.kind {
        ValueKind::Markup(markup) => Ok(markup.tag),
        _ => Err(type_mismatch("markup", v.type_name())),
    })??;
    Ok(Value::string(tag.as_str()))
}
