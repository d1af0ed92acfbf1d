use kite_eval::{EvalMode, OperationRegistry};
use kite_ir::Name;
use pretty_assertions::assert_eq;

use crate::commands::{evaluator_for, parse_run_options, RunOptions};
use crate::{parse_plan, unknown_operations};

const GREETING: &str = r#"
{"call": {"op": "seq", "args": [
    {"call": {"op": "set", "args": [
        {"ident": "greeting"},
        {"lit": {"kind": {"str": "hello"}}}
    ]}},
    {"call": {"op": "concat", "args": [
        {"ident": "greeting"},
        {"lit": {"kind": {"str": ", kite"}}}
    ]}}
]}}
"#;

#[test]
fn test_json_plan_evaluates() {
    let plan = parse_plan(GREETING).unwrap_or_else(|e| panic!("bad plan: {e}"));
    let mut eval = evaluator_for(EvalMode::Capture, &RunOptions::default());
    assert_eq!(eval.run(&plan).as_str(), Some("hello, kite"));
}

#[test]
fn test_int_literals_are_decimal_text() {
    let plan = parse_plan(
        r#"{"call": {"op": "mul", "args": [
            {"lit": {"kind": {"int": "123456789012345678901234567890"}}},
            {"lit": {"kind": {"int": "2"}}}
        ]}}"#,
    )
    .unwrap_or_else(|e| panic!("bad plan: {e}"));
    let mut eval = evaluator_for(EvalMode::Capture, &RunOptions::default());
    assert_eq!(eval.run(&plan).to_string(), "246913578024691357802469135780");
}

#[test]
fn test_malformed_plan_is_rejected() {
    assert!(parse_plan(r#"{"call": {"args": []}}"#).is_err());
    assert!(parse_plan(r#"{"lit": {"kind": {"int": "12x"}}}"#).is_err());
}

#[test]
fn test_unknown_operations_in_first_use_order() {
    let plan = parse_plan(
        r#"{"call": {"op": "seq", "args": [
            {"call": {"op": "frob", "args": []}},
            {"call": {"op": "print", "args": [{"call": {"op": "twiddle", "args": []}}]}},
            {"call": {"op": "frob", "args": []}}
        ]}}"#,
    )
    .unwrap_or_else(|e| panic!("bad plan: {e}"));
    let registry = OperationRegistry::with_builtins();
    let unknown = unknown_operations(&plan, &registry);
    assert_eq!(unknown, vec![Name::intern("frob"), Name::intern("twiddle")]);
}

#[test]
fn test_known_plan_has_no_unknown_operations() {
    let plan = parse_plan(GREETING).unwrap_or_else(|e| panic!("bad plan: {e}"));
    let registry = OperationRegistry::with_builtins();
    assert!(unknown_operations(&plan, &registry).is_empty());
}

#[test]
fn test_run_options_parse() {
    let args = vec!["--precision=3".to_string(), "--shares=4".to_string()];
    let options = parse_run_options(&args).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(
        options,
        RunOptions {
            precision: Some(3),
            shares: Some(4),
        }
    );
    let eval = evaluator_for(EvalMode::Capture, &options);
    assert_eq!(eval.config().float_precision, Some(3));
    assert_eq!(eval.config().default_shares, 4);
}

#[test]
fn test_run_options_reject_bad_input() {
    for bad in ["--shares=0", "--precision=many", "--fast"] {
        assert!(parse_run_options(&[bad.to_string()]).is_err(), "{bad}");
    }
}
