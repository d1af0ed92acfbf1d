//! Lists, arrays and tuples.
//!
//! Everything here except `remove` returns a new value and leaves its input
//! alone. `map`, `filter` and `reduce` call back into user code one element
//! at a time; their parallel versions live in `concurrency::parallel`.

use std::cmp::Ordering;

use kite_value::{not_callable, numeric, type_mismatch, CodeValue, Member, Node, Value, ValueKind};

use super::{member_copies, mutable_cell};
use crate::evaluator::{read, type_of};
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("list", list),
    NativeSpec::new("array", array),
    NativeSpec::new("tuple", tuple),
    NativeSpec::new("range", range),
    NativeSpec::new("remove", remove),
    NativeSpec::new("slice", slice),
    NativeSpec::new("reverse", reverse),
    NativeSpec::new("sort", sort),
    NativeSpec::new("contains", contains),
    NativeSpec::new("join", join),
    NativeSpec::new("map", map),
    NativeSpec::new("filter", filter),
    NativeSpec::new("reduce", reduce),
];

fn list(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    Ok(Value::list(eval.args_owned(args, 0)?))
}

fn array(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    Ok(Value::array(eval.args_owned(args, 0)?))
}

fn tuple(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    Ok(Value::tuple(eval.args_owned(args, 0)?))
}

/// `range(end)`, `range(start, end)` or `range(start, end, step)`, end
/// exclusive.
fn range(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("range", args, 1, Some(3))?;
    let (start, end) = if args.len() == 1 {
        (0, eval.int_arg(args, 0)?)
    } else {
        (eval.int_arg(args, 0)?, eval.int_arg(args, 1)?)
    };
    let step = if args.len() == 3 {
        eval.int_arg(args, 2)?
    } else {
        1
    };
    if step == 0 {
        return Err(type_mismatch("non-zero step", "0").into());
    }
    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        items.push(Value::int(current));
        let Some(next) = current.checked_add(step) else {
            break;
        };
        current = next;
    }
    Ok(Value::list(items))
}

/// Copies of a sequence's members.
pub(crate) fn items_of(value: &Value) -> Result<Vec<Value>, Flow> {
    read(value, member_copies)?.ok_or_else(|| type_mismatch("sequence", &type_of(value)).into())
}

/// A new sequence of the same kind as `like`.
fn rebuild(like: &Value, items: Vec<Value>) -> Value {
    match &like.kind {
        ValueKind::Array(_) => Value::array(items),
        ValueKind::Tuple(_) => Value::tuple(items),
        _ => Value::list(items),
    }
}

/// `remove(target, position)`: take a member out in place and return it.
fn remove(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("remove", args, 2, Some(2))?;
    let position = eval.arg_owned(args, 1)?;
    let target = eval.arg_raw(args, 0)?;
    if target.is_error() {
        return Err(Flow::Fail(target.materialize()));
    }
    let handle = mutable_cell(&target)?;
    let removed: Member = {
        let mut content = handle.write();
        if matches!(content.kind, ValueKind::Array(_)) {
            return Err(type_mismatch("growable container", "array").into());
        }
        let got = content.type_name();
        let Some(members) = content.members_mut() else {
            return Err(type_mismatch("composite value", got).into());
        };
        let index = numeric::to_index(&position, members.len())?;
        members.remove(index)
    };
    Ok(removed.slot.into_value().materialize())
}

/// Resolve a slice bound: negatives count from the end, out-of-range
/// values clamp.
fn bound(value: &Value, len: usize) -> Result<usize, Flow> {
    let ValueKind::Int(_) = value.kind else {
        return Err(type_mismatch("int", value.type_name()).into());
    };
    let raw = value.as_i64().unwrap_or(i64::MAX);
    let len_i64 = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if raw < 0 { len_i64 + raw } else { raw };
    Ok(usize::try_from(resolved.clamp(0, len_i64)).unwrap_or(len))
}

/// `slice(seq, start, end?)`, end exclusive. Works on strings too.
fn slice(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("slice", args, 2, Some(3))?;
    let value = eval.arg(args, 0)?;
    let start = eval.arg_owned(args, 1)?;
    let end = eval.arg_owned(args, 2)?;
    read(&value, |v| -> OpResult {
        let len = match &v.kind {
            ValueKind::Str(s) => s.chars().count(),
            _ => v.members().map_or(0, <[_]>::len),
        };
        let from = bound(&start, len)?;
        let to = if end.is_null() { len } else { bound(&end, len)? };
        let to = to.max(from);
        match &v.kind {
            ValueKind::Str(s) => Ok(Value::string(
                s.chars().skip(from).take(to - from).collect::<String>(),
            )),
            _ => {
                let Some(members) = v.members() else {
                    return Err(type_mismatch("sequence", v.type_name()).into());
                };
                let items = members[from..to]
                    .iter()
                    .map(|m| m.slot.read().deep_copy())
                    .collect();
                Ok(rebuild(v, items))
            }
        }
    })?
}

/// A reversed copy of a sequence or string.
fn reverse(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("reverse", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    read(&value, |v| -> OpResult {
        if let ValueKind::Str(s) = &v.kind {
            return Ok(Value::string(s.chars().rev().collect::<String>()));
        }
        let Some(mut items) = member_copies(v) else {
            return Err(type_mismatch("sequence", v.type_name()).into());
        };
        items.reverse();
        Ok(rebuild(v, items))
    })?
}

/// A sorted copy. Every pair of elements must be comparable.
fn sort(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("sort", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    let mut items = items_of(&value)?;
    let mut incomparable = None;
    items.sort_by(|a, b| {
        numeric::compare(a, b).unwrap_or_else(|| {
            incomparable.get_or_insert_with(|| format!("{} and {}", a.type_name(), b.type_name()));
            Ordering::Equal
        })
    });
    if let Some(got) = incomparable {
        return Err(type_mismatch("comparable elements", &got).into());
    }
    Ok(read(&value, |v| rebuild(v, items))?)
}

/// Substring test for strings, member equality for sequences.
fn contains(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("contains", args, 2, Some(2))?;
    let haystack = eval.arg(args, 0)?;
    let needle = eval.arg_owned(args, 1)?;
    let found = read(&haystack, |v| match (&v.kind, &needle.kind) {
        (ValueKind::Str(s), ValueKind::Str(n)) => Ok(s.contains(n.as_str())),
        _ => match v.members() {
            Some(members) => Ok(members
                .iter()
                .any(|m| numeric::loose_eq(&m.slot.read().deep_copy(), &needle))),
            None => Err(type_mismatch("string or sequence", v.type_name())),
        },
    })??;
    Ok(Value::bool(found))
}

/// `join(seq, separator?)`: members' display text joined into a string.
fn join(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("join", args, 1, Some(2))?;
    let value = eval.arg(args, 0)?;
    let items = items_of(&value)?;
    let separator = eval.arg(args, 1)?;
    let separator = read(&separator, |v| match &v.kind {
        ValueKind::Null => String::new(),
        ValueKind::Str(s) => s.clone(),
        _ => v.to_string(),
    })?;
    let parts: Vec<String> = items.iter().map(|item| eval.render(item)).collect();
    Ok(Value::string(parts.join(&separator)))
}

pub(crate) fn code_arg(
    eval: &mut Evaluator,
    args: &[Node],
    index: usize,
) -> Result<CodeValue, Flow> {
    let value = eval.arg(args, index)?;
    let code = read(&value, |v| v.as_code().cloned().ok_or_else(|| not_callable(v.type_name())))?;
    Ok(code?)
}

/// `map(seq, code)`. An element whose call fails leaves the error in its
/// place.
fn map(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("map", args, 2, Some(2))?;
    let value = eval.arg(args, 0)?;
    let items = items_of(&value)?;
    let code = code_arg(eval, args, 1)?;
    let mut results = Vec::with_capacity(items.len());
    for item in items {
        eval.checkpoint()?;
        results.push(eval.call_code(&code, vec![item], None)?.materialize());
    }
    Ok(read(&value, |v| rebuild(v, results))?)
}

/// `filter(seq, code)`: elements for which the code returns a truthy value.
fn filter(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("filter", args, 2, Some(2))?;
    let value = eval.arg(args, 0)?;
    let items = items_of(&value)?;
    let code = code_arg(eval, args, 1)?;
    let mut kept = Vec::new();
    for item in items {
        eval.checkpoint()?;
        let keep = eval.call_code(&code, vec![item.deep_copy()], None)?;
        if keep.is_truthy() {
            kept.push(item);
        }
    }
    Ok(read(&value, |v| rebuild(v, kept))?)
}

/// `reduce(seq, code, init?)`. Without `init` the first element seeds the
/// accumulator; an empty sequence then reduces to `null`.
fn reduce(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("reduce", args, 2, Some(3))?;
    let value = eval.arg(args, 0)?;
    let items = items_of(&value)?;
    let code = code_arg(eval, args, 1)?;
    let init = eval.arg_owned(args, 2)?;
    let mut items = items.into_iter();
    let mut acc = if args.len() == 3 && !init.is_null() {
        init
    } else {
        match items.next() {
            Some(first) => first,
            None => return Ok(Value::null()),
        }
    };
    for item in items {
        eval.checkpoint()?;
        acc = eval.call_code(&code, vec![acc, item], None)?.materialize();
        if acc.is_error() {
            return Err(Flow::Fail(acc));
        }
    }
    Ok(acc)
}
