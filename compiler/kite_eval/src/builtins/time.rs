//! Wall-clock time.

use kite_value::{type_mismatch, Node, TimeValue, Value, ValueKind};
use num_bigint::BigInt;

use crate::evaluator::read;
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("now", now),
    NativeSpec::new("millis", millis),
    NativeSpec::new("elapsed", elapsed),
];

fn now(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("now", args, 0, Some(0))?;
    Ok(Value::time(TimeValue::now()))
}

fn time_arg(eval: &mut Evaluator, args: &[Node], index: usize) -> Result<TimeValue, Flow> {
    let value = eval.arg(args, index)?;
    let time = read(&value, |v| match v.kind {
        ValueKind::Time(time) => Ok(time),
        _ => Err(type_mismatch("time", v.type_name())),
    })?;
    Ok(time?)
}

/// `millis(time)`: milliseconds since the epoch.
fn millis(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("millis", args, 1, Some(1))?;
    let time = time_arg(eval, args, 0)?;
    Ok(Value::big_int(BigInt::from(time.as_millis())))
}

/// `elapsed(since)`: milliseconds from `since` to now.
fn elapsed(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("elapsed", args, 1, Some(1))?;
    let since = time_arg(eval, args, 0)?;
    let delta = TimeValue::now().as_millis() - since.as_millis();
    Ok(Value::big_int(BigInt::from(delta)))
}
