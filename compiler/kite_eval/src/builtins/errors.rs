//! Raising, testing and recovering from error values.

use kite_ir::Name;
use kite_value::{raised, Node, Value};

use crate::environment::FrameKind;
use crate::registry::{NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("try", try_),
    NativeSpec::new("on-error", try_),
    NativeSpec::new("error", error),
    NativeSpec::new("is-error", is_error),
    NativeSpec::new("error-code", error_code),
    NativeSpec::new("error-message", error_message),
];

/// `try(body, handler?)`.
///
/// If `body` evaluates to an error value, `handler` runs in a new block
/// frame with the error bound to `error`, and its result replaces the
/// error. Without a handler the error becomes `null`. Control actions pass
/// through untouched.
fn try_(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("try", args, 1, Some(2))?;
    let result = eval.arg_raw(args, 0)?;
    if !result.with_resolved(Value::is_error).unwrap_or(true) {
        return Ok(result);
    }
    let error = result.materialize();
    let Some(handler) = args.get(1) else {
        return Ok(Value::null());
    };
    Ok(eval.with_frame(FrameKind::Block, |eval| {
        if let Err(failure) = eval.env.declare(Name::intern("error"), error) {
            return Ok(Value::error(failure));
        }
        eval.evaluate(handler)
    })?)
}

/// `error(code, message?)`.
fn error(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("error", args, 1, Some(2))?;
    let code = eval.str_arg(args, 0)?;
    let message = if args.len() > 1 {
        eval.text_arg(args, 1)?
    } else {
        code.clone()
    };
    Ok(Value::error(raised(&code, message)))
}

fn is_error(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("is-error", args, 1, Some(1))?;
    let value = eval.arg_raw(args, 0)?;
    Ok(Value::bool(
        value.with_resolved(Value::is_error).unwrap_or(true),
    ))
}

/// Run `f` on the error behind an argument; `null` for non-errors.
fn inspect(
    eval: &mut Evaluator,
    args: &[Node],
    name: &str,
    f: fn(&kite_value::EvalError) -> String,
) -> OpResult {
    eval.expect_args(name, args, 1, Some(1))?;
    let value = eval.arg_raw(args, 0)?.materialize();
    Ok(value
        .as_error()
        .map_or_else(Value::null, |error| Value::string(f(&error.error))))
}

fn error_code(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    inspect(eval, args, "error-code", |error| error.code().to_string())
}

fn error_message(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    inspect(eval, args, "error-message", |error| error.message.clone())
}
