//! String operations and conversions.
//!
//! Positions and lengths count characters, not bytes.

use kite_value::numeric;
use kite_value::{type_mismatch, Node, Value, ValueKind};
use num_bigint::BigInt;
use num_traits::FromPrimitive;

use crate::evaluator::read;
use crate::registry::{NativeSpec, OpResult};
use crate::{EvalConfig, Evaluator};

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("concat", concat),
    NativeSpec::folding("len", len, fold_len),
    NativeSpec::folding("upper", upper, fold_upper),
    NativeSpec::folding("lower", lower, fold_lower),
    NativeSpec::folding("trim", trim, fold_trim),
    NativeSpec::new("split", split),
    NativeSpec::new("find", find),
    NativeSpec::new("replace", replace),
    NativeSpec::new("substr", substr),
    NativeSpec::new("to-string", to_string),
    NativeSpec::new("to-int", to_int),
    NativeSpec::new("to-float", to_float),
];

/// Display text of every argument, joined.
fn concat(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    let mut out = String::new();
    for index in 0..args.len() {
        out.push_str(&eval.text_arg(args, index)?);
    }
    Ok(Value::string(out))
}

fn length_of(value: &Value) -> Option<usize> {
    match &value.kind {
        ValueKind::Str(s) => Some(s.chars().count()),
        ValueKind::Bytes(b) => Some(b.len()),
        _ => value.members().map(<[_]>::len),
    }
}

/// Characters of a string, bytes of a byte string, members of a composite.
fn len(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("len", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    let length = read(&value, |v| {
        length_of(v).ok_or_else(|| type_mismatch("sized value", v.type_name()))
    })??;
    Ok(Value::int(i64::try_from(length).unwrap_or(i64::MAX)))
}

fn fold_len(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    match args {
        [value] => length_of(value).map(|n| Value::int(i64::try_from(n).unwrap_or(i64::MAX))),
        _ => None,
    }
}

/// Apply a string-to-string mapping to the single argument.
fn map_str(eval: &mut Evaluator, args: &[Node], name: &str, f: fn(&str) -> String) -> OpResult {
    eval.expect_args(name, args, 1, Some(1))?;
    let text = eval.str_arg(args, 0)?;
    Ok(Value::string(f(&text)))
}

fn fold_map_str(args: &[&Value], f: fn(&str) -> String) -> Option<Value> {
    match args {
        [value] => value.as_str().map(|s| Value::string(f(s))),
        _ => None,
    }
}

fn upper(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    map_str(eval, args, "upper", str::to_uppercase)
}

fn fold_upper(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_map_str(args, str::to_uppercase)
}

fn lower(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    map_str(eval, args, "lower", str::to_lowercase)
}

fn fold_lower(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_map_str(args, str::to_lowercase)
}

fn trim_owned(s: &str) -> String {
    s.trim().to_string()
}

fn trim(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    map_str(eval, args, "trim", trim_owned)
}

fn fold_trim(_: &EvalConfig, args: &[&Value]) -> Option<Value> {
    fold_map_str(args, trim_owned)
}

/// Split on a separator, or on runs of whitespace when it is `null`.
fn split(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("split", args, 1, Some(2))?;
    let text = eval.str_arg(args, 0)?;
    let separator = eval.arg(args, 1)?;
    let separator = read(&separator, |v| v.as_str().map(str::to_string))?;
    let parts: Vec<Value> = match separator.as_deref() {
        Some("") | None => text.split_whitespace().map(Value::string).collect(),
        Some(sep) => text.split(sep).map(Value::string).collect(),
    };
    Ok(Value::list(parts))
}

/// Character position of the first occurrence, or `null`.
fn find(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("find", args, 2, Some(2))?;
    let text = eval.str_arg(args, 0)?;
    let needle = eval.str_arg(args, 1)?;
    Ok(match text.find(&needle) {
        Some(byte) => Value::int(i64::try_from(text[..byte].chars().count()).unwrap_or(i64::MAX)),
        None => Value::null(),
    })
}

fn replace(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("replace", args, 3, Some(3))?;
    let text = eval.str_arg(args, 0)?;
    let from = eval.str_arg(args, 1)?;
    let to = eval.str_arg(args, 2)?;
    if from.is_empty() {
        return Ok(Value::string(text));
    }
    Ok(Value::string(text.replace(&from, &to)))
}

/// `substr(text, start, length?)`; a negative start counts from the end.
fn substr(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("substr", args, 2, Some(3))?;
    let text = eval.str_arg(args, 0)?;
    let chars: Vec<char> = text.chars().collect();
    let start = eval.arg(args, 1)?;
    let start = if chars.is_empty() {
        0
    } else {
        read(&start, |v| numeric::to_index(v, chars.len()))??
    };
    let length = eval.count_arg(args, 2, chars.len())?;
    Ok(Value::string(
        chars.iter().skip(start).take(length).collect::<String>(),
    ))
}

fn to_string(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("to-string", args, 1, Some(1))?;
    Ok(Value::string(eval.text_arg(args, 0)?))
}

fn to_int(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("to-int", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    let converted = read(&value, |v| match &v.kind {
        ValueKind::Int(_) => Ok(v.deep_copy()),
        ValueKind::Float(f) => BigInt::from_f64(f.trunc())
            .map(Value::big_int)
            .ok_or_else(|| type_mismatch("finite float", &f.to_string())),
        ValueKind::Bool(b) => Ok(Value::int(i64::from(*b))),
        ValueKind::Str(s) => s
            .trim()
            .parse::<BigInt>()
            .map(Value::big_int)
            .map_err(|_| type_mismatch("integer text", &format!("{s:?}"))),
        _ => Err(type_mismatch("number or text", v.type_name())),
    })?;
    Ok(converted?)
}

fn to_float(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("to-float", args, 1, Some(1))?;
    let value = eval.arg(args, 0)?;
    let converted = read(&value, |v| match &v.kind {
        ValueKind::Int(_) | ValueKind::Float(_) => Ok(Value::float(numeric::to_f64(v))),
        ValueKind::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::float)
            .map_err(|_| type_mismatch("float text", &format!("{s:?}"))),
        _ => Err(type_mismatch("number or text", v.type_name())),
    })?;
    Ok(converted?)
}
