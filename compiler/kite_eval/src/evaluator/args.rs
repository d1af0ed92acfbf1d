//! Argument helpers for native operations.
//!
//! Most operations evaluate their arguments eagerly and give up on the first
//! error value they see, returning it as their own result. These helpers do
//! that through [`Flow`], so an operation body reads as a straight line of
//! `?`s.

use kite_ir::Name;
use kite_value::{numeric, type_mismatch, wrong_arg_count, ControlAction, Node, Value};

use super::Evaluator;
use crate::registry::{Flow, OpResult};

/// Run `f` on the terminal value behind `value`.
pub fn read<R>(value: &Value, f: impl FnOnce(&Value) -> R) -> Result<R, Flow> {
    value.with_resolved(f).map_err(Flow::from)
}

impl Evaluator {
    /// Fail with `arity-mismatch` unless `min <= args.len() <= max`.
    pub fn expect_args(
        &self,
        op: &str,
        args: &[Node],
        min: usize,
        max: Option<usize>,
    ) -> Result<(), Flow> {
        let got = args.len();
        if got < min {
            return Err(wrong_arg_count(op, min, got).into());
        }
        match max {
            Some(max) if got > max => Err(wrong_arg_count(op, max, got).into()),
            _ => Ok(()),
        }
    }

    /// Evaluate argument `index` (`null` if absent). An error value
    /// short-circuits.
    pub fn arg(&mut self, args: &[Node], index: usize) -> OpResult {
        let value = self.arg_raw(args, index)?;
        if value.is_error() || value.with_resolved(Value::is_error).unwrap_or(false) {
            return Err(Flow::Fail(value.materialize()));
        }
        Ok(value)
    }

    /// Evaluate argument `index` (`null` if absent), keeping error values.
    pub fn arg_raw(&mut self, args: &[Node], index: usize) -> Result<Value, ControlAction> {
        match args.get(index) {
            Some(node) => self.evaluate(node),
            None => Ok(Value::null()),
        }
    }

    /// Evaluate argument `index` to an owned, non-alias value.
    pub fn arg_owned(&mut self, args: &[Node], index: usize) -> OpResult {
        Ok(self.arg(args, index)?.materialize())
    }

    /// Evaluate every argument from `start` on to owned values.
    pub fn args_owned(&mut self, args: &[Node], start: usize) -> Result<Vec<Value>, Flow> {
        (start..args.len())
            .map(|index| self.arg_owned(args, index))
            .collect()
    }

    /// A name argument: an identifier node is taken as written; anything
    /// else is evaluated and must be a string.
    pub fn name_arg(&mut self, args: &[Node], index: usize) -> Result<Name, Flow> {
        if let Some(name) = args.get(index).and_then(Node::as_ident) {
            return Ok(name);
        }
        let value = self.arg(args, index)?;
        read(&value, |v| v.as_str().map(Name::intern))?
            .ok_or_else(|| type_mismatch("name", &type_of(&value)).into())
    }

    /// An integer argument.
    pub fn int_arg(&mut self, args: &[Node], index: usize) -> Result<i64, Flow> {
        let value = self.arg(args, index)?;
        read(&value, Value::as_i64)?.ok_or_else(|| type_mismatch("int", &type_of(&value)).into())
    }

    /// An optional non-negative count; `null` or absent gives `default`.
    pub fn count_arg(&mut self, args: &[Node], index: usize, default: usize) -> Result<usize, Flow> {
        let value = self.arg(args, index)?;
        if read(&value, Value::is_null)? {
            return Ok(default);
        }
        Ok(read(&value, numeric::to_count)??)
    }

    /// A string argument, copied out.
    pub fn str_arg(&mut self, args: &[Node], index: usize) -> Result<String, Flow> {
        let value = self.arg(args, index)?;
        read(&value, |v| v.as_str().map(str::to_string))?
            .ok_or_else(|| type_mismatch("string", &type_of(&value)).into())
    }

    /// Argument `index` rendered as display text.
    pub fn text_arg(&mut self, args: &[Node], index: usize) -> Result<String, Flow> {
        let value = self.arg(args, index)?;
        Ok(self.render(&value))
    }

    /// Display text for a value with the configured float precision.
    pub fn render(&self, value: &Value) -> String {
        value.display(self.config().float_precision).to_string()
    }
}

/// Type name of the terminal value.
pub(crate) fn type_of(value: &Value) -> String {
    value
        .with_resolved(|v| v.type_name().to_string())
        .unwrap_or_else(|_| "dangling alias".to_string())
}
