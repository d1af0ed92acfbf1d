//! Output, display settings and the byte encoding of values.

use kite_value::{codec, numeric};
use kite_value::{resource_error, type_mismatch, Node, Value, ValueKind};

use crate::evaluator::read;
use crate::registry::{NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("print", print),
    NativeSpec::new("set-precision", set_precision),
    NativeSpec::new("serialize", serialize),
    NativeSpec::new("deserialize", deserialize),
];

/// `print(values...)`: display text separated by spaces, one line.
fn print(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    let mut parts = Vec::with_capacity(args.len());
    for index in 0..args.len() {
        parts.push(eval.text_arg(args, index)?);
    }
    eval.println(&parts.join(" "));
    Ok(Value::null())
}

/// `set-precision(digits)`: digits shown after the decimal point from now
/// on in this evaluator; `null` restores the shortest exact form.
fn set_precision(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("set-precision", args, 1, Some(1))?;
    let digits = eval.arg(args, 0)?;
    let precision = if read(&digits, Value::is_null)? {
        None
    } else {
        Some(read(&digits, numeric::to_count)??)
    };
    tracing::debug!(?precision, "float precision changed");
    eval.config_mut().float_precision = precision;
    Ok(Value::null())
}

fn serialize(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("serialize", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    let bytes = codec::to_bytes(&value).map_err(|e| resource_error("codec", e.to_string()))?;
    Ok(Value::bytes(bytes))
}

fn deserialize(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("deserialize", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    let decoded = read(&value, |v| match &v.kind {
        ValueKind::Bytes(bytes) => {
            codec::from_bytes(bytes).map_err(|e| resource_error("codec", e.to_string()))
        }
        _ => Err(type_mismatch("bytes", v.type_name())),
    })??;
    Ok(decoded)
}
