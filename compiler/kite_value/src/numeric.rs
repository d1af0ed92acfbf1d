//! Arithmetic and ordering on resolved values.
//!
//! Integers are arbitrary precision. Mixing an integer with a float promotes
//! to float. Integer division truncates toward zero.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::errors::{division_by_zero, index_out_of_bounds, type_mismatch};
use crate::{EvalError, Value, ValueKind};

/// Binary arithmetic operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }
}

/// Apply `op` to two non-alias values.
pub fn arith(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (&left.kind, &right.kind) {
        (ValueKind::Int(a), ValueKind::Int(b)) => int_arith(op, a, b),
        (ValueKind::Int(_) | ValueKind::Float(_), ValueKind::Int(_) | ValueKind::Float(_)) => {
            let (a, b) = (to_f64(left), to_f64(right));
            float_arith(op, a, b)
        }
        (ValueKind::Str(a), ValueKind::Str(b)) if op == ArithOp::Add => {
            Ok(Value::string(format!("{a}{b}")))
        }
        (ValueKind::Bytes(a), ValueKind::Bytes(b)) if op == ArithOp::Add => {
            let mut joined = a.clone();
            joined.extend_from_slice(b);
            Ok(Value::bytes(joined))
        }
        _ => Err(type_mismatch(
            "numbers",
            &format!("{} {} {}", left.type_name(), op.symbol(), right.type_name()),
        )),
    }
}

fn int_arith(op: ArithOp, a: &BigInt, b: &BigInt) -> Result<Value, EvalError> {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div | ArithOp::Rem if b.is_zero() => return Err(division_by_zero()),
        ArithOp::Div => a / b,
        ArithOp::Rem => a % b,
    };
    Ok(Value::big_int(result))
}

fn float_arith(op: ArithOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div | ArithOp::Rem if b == 0.0 => return Err(division_by_zero()),
        ArithOp::Div => a / b,
        ArithOp::Rem => a % b,
    };
    Ok(Value::float(result))
}

/// Arithmetic negation.
pub fn negate(value: &Value) -> Result<Value, EvalError> {
    match &value.kind {
        ValueKind::Int(n) => Ok(Value::big_int(-n)),
        ValueKind::Float(f) => Ok(Value::float(-f)),
        _ => Err(type_mismatch("number", value.type_name())),
    }
}

/// Absolute value.
pub fn abs(value: &Value) -> Result<Value, EvalError> {
    match &value.kind {
        ValueKind::Int(n) => Ok(Value::big_int(n.abs())),
        ValueKind::Float(f) => Ok(Value::float(f.abs())),
        _ => Err(type_mismatch("number", value.type_name())),
    }
}

/// Ordering between two non-alias values of comparable kinds.
///
/// Numbers compare across int and float; strings, byte strings and times
/// compare with their own kind. Anything else has no ordering.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (&left.kind, &right.kind) {
        (ValueKind::Int(a), ValueKind::Int(b)) => Some(a.cmp(b)),
        (ValueKind::Int(_) | ValueKind::Float(_), ValueKind::Int(_) | ValueKind::Float(_)) => {
            to_f64(left).partial_cmp(&to_f64(right))
        }
        (ValueKind::Str(a), ValueKind::Str(b)) => Some(a.cmp(b)),
        (ValueKind::Bytes(a), ValueKind::Bytes(b)) => Some(a.cmp(b)),
        (ValueKind::Time(a), ValueKind::Time(b)) => Some(a.cmp(b)),
        (ValueKind::Bool(a), ValueKind::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Equality as the language sees it: numbers compare by value across int and
/// float, everything else structurally.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (&left.kind, &right.kind) {
        (ValueKind::Int(_), ValueKind::Float(_)) | (ValueKind::Float(_), ValueKind::Int(_)) => {
            compare(left, right) == Some(Ordering::Equal)
        }
        _ => left.structural_eq(right),
    }
}

/// Float view of a numeric value; non-numbers become NaN.
pub fn to_f64(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

/// Interpret `value` as a position in a container of length `len`.
/// Negative positions count from the end.
pub fn to_index(value: &Value, len: usize) -> Result<usize, EvalError> {
    let ValueKind::Int(n) = &value.kind else {
        return Err(type_mismatch("int", value.type_name()));
    };
    let raw = n.to_i64().ok_or_else(|| index_out_of_bounds(i64::MAX))?;
    let len_i64 = i64::try_from(len).unwrap_or(i64::MAX);
    let index = if raw < 0 { len_i64 + raw } else { raw };
    if (0..len_i64).contains(&index) {
        usize::try_from(index).map_err(|_| index_out_of_bounds(raw))
    } else {
        Err(index_out_of_bounds(raw))
    }
}

/// Interpret `value` as a non-negative count.
pub fn to_count(value: &Value) -> Result<usize, EvalError> {
    match &value.kind {
        ValueKind::Int(n) if !n.is_negative() => n
            .to_usize()
            .ok_or_else(|| type_mismatch("count", "oversized int")),
        _ => Err(type_mismatch("non-negative int", value.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_division_truncates() {
        let result = arith(ArithOp::Div, &Value::int(-7), &Value::int(2));
        assert_eq!(result.ok().and_then(|v| v.as_i64()), Some(-3));
    }

    #[test]
    fn mixed_promotes_to_float() {
        let result = arith(ArithOp::Add, &Value::int(1), &Value::float(0.5));
        assert_eq!(result.ok().and_then(|v| v.as_f64()), Some(1.5));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = arith(ArithOp::Rem, &Value::int(1), &Value::int(0));
        assert_eq!(err.err().map(|e| e.code().to_string()), Some("division-by-zero".into()));
    }

    #[test]
    fn big_ints_do_not_overflow() {
        let big = Value::int(i64::MAX);
        let sum = arith(ArithOp::Mul, &big, &big).ok();
        assert_eq!(
            sum.map(|v| v.to_string()),
            Some("85070591730234615847396907784232501249".to_string())
        );
    }

    #[test]
    fn cross_kind_comparison() {
        assert_eq!(compare(&Value::int(2), &Value::float(2.5)), Some(Ordering::Less));
        assert_eq!(compare(&Value::string("a"), &Value::int(1)), None);
        assert!(loose_eq(&Value::int(3), &Value::float(3.0)));
    }

    #[test]
    fn negative_index_counts_from_end() {
        assert_eq!(to_index(&Value::int(-1), 3).ok(), Some(2));
        assert!(to_index(&Value::int(3), 3).is_err());
    }
}
