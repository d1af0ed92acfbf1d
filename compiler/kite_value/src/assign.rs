//! In-place assignment to a slot.
//!
//! All modes check `CONST` before touching the target. The incoming value is
//! materialized before the target is locked, so assigning a value to itself
//! (or to one of its own members) never reads a cell that is being written.
//! Displaced content is dropped only after the lock is released.

use crate::errors::{index_out_of_bounds, mutation_of_constant, type_mismatch};
use crate::numeric::{arith, ArithOp};
use crate::slot::SlotHandle;
use crate::{EvalError, Member, Value, ValueFlags, ValueKind};

/// How an assignment combines the new value with the target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignMode {
    /// Replace the target's content.
    Replace,
    /// Insert as a new member (composites) or add in place (scalars).
    Append { position: Option<usize> },
    /// Splice the value's members into the target.
    Extend,
}

/// Follow `handle` to its terminal cell, rejecting constant aliases on the
/// way.
pub fn terminal(handle: &SlotHandle) -> Result<SlotHandle, EvalError> {
    let next = {
        let content = handle.read();
        match &content.kind {
            ValueKind::Alias(target) => {
                if content.is_const() {
                    return Err(mutation_of_constant("constant reference"));
                }
                Some(target.clone())
            }
            _ => None,
        }
    };
    match next {
        Some(target) => target.resolve(),
        None => Ok(handle.clone()),
    }
}

/// Assign `value` to the cell behind `target` using `mode`.
pub fn assign(target: &SlotHandle, value: Value, mode: AssignMode) -> Result<(), EvalError> {
    let target = terminal(target)?;
    let value = value.materialize();

    let displaced = {
        let mut content = target.write();
        if content.is_const() {
            return Err(mutation_of_constant(content.type_name()));
        }
        match mode {
            AssignMode::Replace => {
                if content.flags.contains(ValueFlags::NAMESPACE)
                    && !matches!(value.kind, ValueKind::Object(_))
                {
                    return Err(type_mismatch("namespace object", value.type_name()));
                }
                Some(replace(&mut content, value))
            }
            AssignMode::Append { position } => append(&mut content, value, position)?,
            AssignMode::Extend => {
                extend(&mut content, value)?;
                None
            }
        }
    };
    drop(displaced);
    Ok(())
}

fn replace(content: &mut Value, mut value: Value) -> Value {
    value.flags = (content.flags | (value.flags & ValueFlags::CONST)) - ValueFlags::LOCAL_ONLY;
    if value.resource.is_none() {
        value.resource = content.resource.take();
    }
    std::mem::replace(content, value)
}

/// Returns whatever content the append displaced.
fn append(
    content: &mut Value,
    value: Value,
    position: Option<usize>,
) -> Result<Option<Value>, EvalError> {
    match &mut content.kind {
        ValueKind::Null => {
            content.kind = ValueKind::List(vec![Member::unnamed(value)]);
            Ok(None)
        }
        ValueKind::List(members)
        | ValueKind::Tuple(members)
        | ValueKind::Object(members)
        | ValueKind::Markup(crate::MarkupValue { members, .. }) => {
            let at = position.unwrap_or(members.len());
            if at > members.len() {
                return Err(index_out_of_bounds(i64::try_from(at).unwrap_or(i64::MAX)));
            }
            members.insert(at, Member::unnamed(value));
            Ok(None)
        }
        ValueKind::Array(_) => Err(type_mismatch("growable container", "array")),
        ValueKind::Int(_) | ValueKind::Float(_) => {
            let sum = arith(ArithOp::Add, content, &value)?;
            let old = std::mem::replace(&mut content.kind, sum.kind);
            Ok(Some(old.into()))
        }
        ValueKind::Str(s) => {
            match &value.kind {
                ValueKind::Str(tail) => s.push_str(tail),
                _ => s.push_str(&value.to_string()),
            }
            Ok(None)
        }
        ValueKind::Bytes(bytes) => match &value.kind {
            ValueKind::Bytes(tail) => {
                bytes.extend_from_slice(tail);
                Ok(None)
            }
            ValueKind::Str(tail) => {
                bytes.extend_from_slice(tail.as_bytes());
                Ok(None)
            }
            _ => Err(type_mismatch("bytes", value.type_name())),
        },
        _ => Err(type_mismatch("container, number or string", content.type_name())),
    }
}

fn extend(content: &mut Value, mut value: Value) -> Result<(), EvalError> {
    if matches!(content.kind, ValueKind::Array(_)) {
        return Err(type_mismatch("growable container", "array"));
    }
    let got = value.type_name();
    let Some(incoming) = value.members_mut().map(std::mem::take) else {
        return Err(type_mismatch("composite value", got));
    };
    if content.is_null() {
        content.kind = ValueKind::List(Vec::new());
    }
    let target_type = content.type_name();
    let Some(members) = content.members_mut() else {
        return Err(type_mismatch("composite target", target_type));
    };
    members.extend(incoming);
    Ok(())
}

#[cfg(test)]
mod tests;
