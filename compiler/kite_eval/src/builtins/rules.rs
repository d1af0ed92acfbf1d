//! Grammar rules.
//!
//! `rule(alt...)` builds a rule from alternatives. An alternative is a list
//! of terms or a single term; a term is literal text, another rule, or a
//! list (a nested sequence). `chars` and `many` build single-term rules, so
//! they compose like any other rule.

use kite_value::{
    numeric, type_mismatch, CharClass, Node, RuleTerm, RuleValue, Value, ValueKind,
};

use crate::evaluator::read;
use crate::registry::{Flow, NativeSpec, OpResult};
use crate::Evaluator;

pub(super) const OPS: &[NativeSpec] = &[
    NativeSpec::new("rule", rule),
    NativeSpec::new("chars", chars),
    NativeSpec::new("many", many),
    NativeSpec::new("rule-match", rule_match),
    NativeSpec::new("rule-prefix", rule_prefix),
];

/// A rule made of exactly one term.
fn single(term: RuleTerm) -> RuleValue {
    RuleValue::new(vec![vec![term]])
}

/// The term a value stands for.
fn term_of(value: &Value) -> Result<RuleTerm, Flow> {
    match &value.kind {
        ValueKind::Str(text) => Ok(RuleTerm::Text(text.clone())),
        ValueKind::Rule(rule) => Ok(match rule.alternatives.as_slice() {
            [alternative] if alternative.len() == 1 => alternative[0].clone(),
            _ => RuleTerm::Rule(Box::new(rule.clone())),
        }),
        ValueKind::List(_) => {
            let sequence = sequence_of(value)?;
            Ok(RuleTerm::Rule(Box::new(RuleValue::new(vec![sequence]))))
        }
        ValueKind::Alias(_) => read(value, term_of)?,
        _ => Err(type_mismatch("text, rule or list", value.type_name()).into()),
    }
}

/// The terms of one alternative.
fn sequence_of(value: &Value) -> Result<Vec<RuleTerm>, Flow> {
    match value.members() {
        Some(members) if matches!(value.kind, ValueKind::List(_)) => members
            .iter()
            .map(|member| term_of(&member.slot.read()))
            .collect(),
        _ => Ok(vec![term_of(value)?]),
    }
}

/// `rule(alt...)`.
fn rule(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("rule", args, 1, None)?;
    let mut alternatives = Vec::with_capacity(args.len());
    for index in 0..args.len() {
        let alternative = eval.arg(args, index)?;
        alternatives.push(read(&alternative, sequence_of)??);
    }
    Ok(Value::rule(RuleValue::new(alternatives)))
}

/// `chars(class)`: one character of `any`, `digit`, `alpha`, `alnum` or
/// `space`.
fn chars(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("chars", args, 1, Some(1))?;
    let name = eval.str_arg(args, 0)?;
    let class = CharClass::from_name(&name)
        .ok_or_else(|| type_mismatch("character class", &format!("{name:?}")))?;
    Ok(Value::rule(single(RuleTerm::Class(class))))
}

/// `many(term, min, max?)`: `term` repeated at least `min` times, at most
/// `max` (unbounded when absent or `null`).
fn many(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    eval.expect_args("many", args, 2, Some(3))?;
    let term = eval.arg(args, 0)?;
    let term = read(&term, term_of)??;
    let min = eval.count_arg(args, 1, 0)?;
    let max = if args.len() == 3 {
        let max = eval.arg(args, 2)?;
        if read(&max, Value::is_null)? {
            None
        } else {
            Some(read(&max, numeric::to_count)??)
        }
    } else {
        None
    };
    let clamp = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    Ok(Value::rule(single(RuleTerm::Repeat {
        term: Box::new(term),
        min: clamp(min),
        max: max.map(clamp),
    })))
}

fn rule_and_text(
    eval: &mut Evaluator,
    args: &[Node],
    name: &str,
) -> Result<(RuleValue, String), Flow> {
    eval.expect_args(name, args, 2, Some(2))?;
    let rule = eval.arg(args, 0)?;
    let rule = read(&rule, |v| match &v.kind {
        ValueKind::Rule(rule) => Ok(rule.clone()),
        _ => Err(type_mismatch("rule", v.type_name())),
    })??;
    let text = eval.str_arg(args, 1)?;
    Ok((rule, text))
}

/// `rule-match(rule, text)`: whether the rule matches all of `text`.
fn rule_match(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    let (rule, text) = rule_and_text(eval, args, "rule-match")?;
    Ok(Value::bool(rule.matches_all(&text)))
}

/// `rule-prefix(rule, text)`: length in characters of the longest prefix
/// the rule matches, or `null`.
fn rule_prefix(eval: &mut Evaluator, args: &[Node]) -> OpResult {
    let (rule, text) = rule_and_text(eval, args, "rule-prefix")?;
    Ok(rule.longest_match(&text).map_or_else(Value::null, |end| {
        let chars = text[..end].chars().count();
        Value::int(i64::try_from(chars).unwrap_or(i64::MAX))
    }))
}
