//! Blocks, conditionals, loops and the control actions.
//!
//! Loops run every iteration in a fresh loop frame. `break` ends the loop
//! with `null`, `continue` moves to the next iteration, and anything else
//! (`return`, a stop request) leaves the loop unabsorbed. A loop that runs
//! to completion yields a copy of its last iteration's value.

use kite_ir::Name;
use kite_value::{numeric, type_mismatch, ControlAction, Node, Slot, SlotHandle, Value, ValueKind};

use super::target_cell;
use crate::environment::FrameKind;
use crate::evaluator::read;
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("do", block),
    NativeSpec::new("seq", seq),
    NativeSpec::new("if", if_),
    NativeSpec::new("while", while_),
    NativeSpec::new("for", for_),
    NativeSpec::new("repeat", repeat),
    NativeSpec::new("break", break_),
    NativeSpec::new("continue", continue_),
    NativeSpec::new("return", return_),
];

/// Statements in a new block frame.
fn block(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    Ok(eval.with_frame(FrameKind::Block, |eval| eval.eval_block(args))?)
}

/// Statements in the current frame.
fn seq(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    Ok(eval.eval_block(args)?)
}

/// `if(cond, then, cond2, then2, ..., else?)`. Only the taken branch is
/// evaluated.
fn if_(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("if", args, 2, None)?;
    let mut index = 0;
    while index + 1 < args.len() {
        if eval.arg_raw(args, index)?.is_truthy() {
            return Ok(eval.evaluate(&args[index + 1])?);
        }
        index += 2;
    }
    match args.get(index) {
        Some(otherwise) => Ok(eval.evaluate(otherwise)?),
        None => Ok(Value::null()),
    }
}

enum Step {
    Next(Value),
    Break,
}

/// One loop iteration, with `binding` declared in the iteration's frame.
fn iterate(
    eval: &mut Evaluator,
    body: &[Node],
    binding: Option<(Name, Value)>,
) -> Result<Step, Flow> {
    let result = eval.with_frame(FrameKind::Loop, |eval| {
        if let Some((name, value)) = binding {
            if let Err(error) = eval.env.declare(name, value) {
                return Ok(Value::error(error));
            }
        }
        eval.eval_block(body)
    });
    match result {
        Ok(value) => Ok(Step::Next(value.materialize())),
        Err(ControlAction::Continue) => Ok(Step::Next(Value::null())),
        Err(ControlAction::Break) => Ok(Step::Break),
        Err(action) => Err(action.into()),
    }
}

/// `while(cond, body...)`.
fn while_(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("while", args, 1, None)?;
    let mut last = Value::null();
    loop {
        eval.checkpoint()?;
        if !eval.arg_raw(args, 0)?.is_truthy() {
            return Ok(last);
        }
        match iterate(eval, &args[1..], None)? {
            Step::Next(value) => last = value,
            Step::Break => return Ok(Value::null()),
        }
    }
}

/// `repeat(count, body...)`.
fn repeat(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("repeat", args, 1, None)?;
    let count = eval.count_arg(args, 0, 0)?;
    let mut last = Value::null();
    for _ in 0..count {
        eval.checkpoint()?;
        match iterate(eval, &args[1..], None)? {
            Step::Next(value) => last = value,
            Step::Break => return Ok(Value::null()),
        }
    }
    Ok(last)
}

/// What a `for` loop walks.
enum Items {
    /// `0..n`.
    Count(usize),
    Chars(Vec<char>),
    /// Members of a composite. A temporary iterable is kept alive in the
    /// slot for the duration of the loop.
    Members {
        handle: SlotHandle,
        _holder: Option<Slot>,
    },
}

impl Items {
    fn collect(iterable: Value) -> Result<Items, Flow> {
        let scalar = read(&iterable, |v| match &v.kind {
            ValueKind::Int(_) => Some(numeric::to_count(v).map(Items::Count)),
            ValueKind::Str(s) => Some(Ok(Items::Chars(s.chars().collect()))),
            _ => None,
        })?;
        if let Some(items) = scalar {
            return Ok(items?);
        }
        if !read(&iterable, |v| v.members().is_some())? {
            let got = read(&iterable, Value::type_name)?;
            return Err(type_mismatch("iterable", got).into());
        }
        if iterable.is_alias() {
            return Ok(Items::Members {
                handle: target_cell(&iterable)?,
                _holder: None,
            });
        }
        let slot = Slot::new(iterable);
        Ok(Items::Members {
            handle: slot.handle(),
            _holder: Some(slot),
        })
    }

    /// Item `index`. Members are bound by reference, so assigning to the
    /// loop variable changes the iterable.
    fn get(&self, index: usize) -> Option<Value> {
        match self {
            Items::Count(n) => {
                (index < *n).then(|| Value::int(i64::try_from(index).unwrap_or(i64::MAX)))
            }
            Items::Chars(chars) => chars.get(index).map(|c| Value::string(c.to_string())),
            Items::Members { handle, .. } => {
                let content = handle.read();
                content
                    .members()
                    .and_then(|members| members.get(index))
                    .map(|member| Value::alias(member.slot.downgrade()))
            }
        }
    }
}

/// `for(var, iterable, body...)` over an int count, a string's characters
/// or a composite's members. The length is re-read every iteration.
fn for_(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("for", args, 2, None)?;
    let var = eval.name_arg(args, 0)?;
    let iterable = eval.arg(args, 1)?;
    let items = Items::collect(iterable)?;
    let mut last = Value::null();
    let mut index = 0;
    loop {
        eval.checkpoint()?;
        let Some(item) = items.get(index) else {
            return Ok(last);
        };
        match iterate(eval, &args[2..], Some((var, item)))? {
            Step::Next(value) => last = value,
            Step::Break => return Ok(Value::null()),
        }
        index += 1;
    }
}

fn break_(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("break", args, 0, Some(0))?;
    Err(ControlAction::Break.into())
}

fn continue_(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("continue", args, 0, Some(0))?;
    Err(ControlAction::Continue.into())
}

/// `return(value?)`: leave the innermost code call.
fn return_(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("return", args, 0, Some(1))?;
    let value = eval.arg_raw(args, 0)?;
    let value = if value.is_error() {
        value.materialize()
    } else {
        value
    };
    Err(ControlAction::Return(value).into())
}
