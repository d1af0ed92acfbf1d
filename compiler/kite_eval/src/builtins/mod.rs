//! The built-in operation catalog.
//!
//! Each submodule contributes a table of [`NativeSpec`]s; [`catalog`] chains
//! them for the registry. Operations are plain functions over the evaluator
//! and the unevaluated argument nodes.

mod arith;
mod code;
mod collections;
mod control;
mod errors;
mod io;
mod logic;
mod markup;
mod objects;
mod rules;
mod strings;
mod time;
mod vars;

use kite_value::{
    dangling_reference, mutation_of_constant, terminal, type_mismatch, SlotHandle, Value,
};

use crate::registry::{Flow, NativeSpec};

pub(crate) use collections::{code_arg, items_of};

/// Every built-in operation.
pub fn catalog() -> impl Iterator<Item = &'static NativeSpec> {
    [
        arith::OPS,
        logic::OPS,
        strings::OPS,
        collections::OPS,
        vars::OPS,
        control::OPS,
        code::OPS,
        objects::OPS,
        errors::OPS,
        markup::OPS,
        time::OPS,
        rules::OPS,
        io::OPS,
        crate::concurrency::TASK_OPS,
        crate::concurrency::MONITOR_OPS,
        crate::concurrency::PARALLEL_OPS,
    ]
    .into_iter()
    .flatten()
}

/// The terminal cell an alias argument refers to.
pub(crate) fn target_cell(value: &Value) -> Result<SlotHandle, Flow> {
    match value.as_alias() {
        Some(target) => target.resolve().map_err(Flow::from),
        None => Err(type_mismatch("assignable reference", value.type_name()).into()),
    }
}

/// Like [`target_cell`], for operations that change the target in place: a
/// constant reference along the way is rejected.
pub(crate) fn mutable_cell(value: &Value) -> Result<SlotHandle, Flow> {
    let Some(target) = value.as_alias() else {
        return Err(type_mismatch("assignable reference", value.type_name()).into());
    };
    let handle = target.upgrade().ok_or_else(dangling_reference)?;
    let handle = terminal(&handle)?;
    if handle.read().is_const() {
        return Err(mutation_of_constant(handle.read().type_name()).into());
    }
    Ok(handle)
}

/// Copies of a composite's members, aliases resolved. `None` for scalars.
pub(crate) fn member_copies(value: &Value) -> Option<Vec<Value>> {
    value
        .members()
        .map(|members| members.iter().map(|m| m.slot.read().deep_copy()).collect())
}

#[cfg(test)]
mod tests;
