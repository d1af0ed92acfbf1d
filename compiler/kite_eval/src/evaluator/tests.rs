use kite_value::{Node, Value};
use pretty_assertions::assert_eq;

use crate::environment::FrameKind;
use crate::{EvalConfig, EvalMode, Evaluator};

fn int(n: i64) -> Node {
    Node::literal(Value::int(n))
}

fn call(op: &str, args: Vec<Node>) -> Node {
    Node::call(op, args)
}

fn capture() -> Evaluator {
    Evaluator::builder().mode(EvalMode::Capture).build()
}

fn code_of(value: &Value) -> Option<String> {
    value.as_error().map(|e| e.error.code().to_string())
}

#[test]
fn test_literal_is_copied_on_every_evaluation() {
    let body = call(
        "seq",
        vec![
            call("set", vec![Node::ident("xs"), Node::literal(Value::list(vec![Value::int(0)]))]),
            call("append", vec![Node::ident("xs"), int(1)]),
            Node::ident("xs"),
        ],
    );
    let mut eval = capture();
    let result = eval.run(&call(
        "seq",
        vec![
            call("set", vec![Node::ident("f"), call("code", vec![body])]),
            call(
                "list",
                vec![
                    call("call", vec![Node::ident("f")]),
                    call("call", vec![Node::ident("f")]),
                ],
            ),
        ],
    ));
    let once = Value::list(vec![Value::int(0), Value::int(1)]);
    assert!(result.structural_eq(&Value::list(vec![once.deep_copy(), once])));
}

#[test]
fn test_unknown_operation_evaluates_to_error() {
    let result = capture().run(&call("no-such-op", vec![int(1)]));
    assert_eq!(code_of(&result).as_deref(), Some("unknown-operation"));
}

#[test]
fn test_literal_call_is_folded_once() {
    let plan = call("add", vec![int(1), int(2)]);
    let mut eval = capture();
    assert_eq!(eval.run(&plan).as_i64(), Some(3));
    let Node::Call(node) = &plan else {
        panic!("expected a call node");
    };
    assert_eq!(node.folded().and_then(Value::as_i64), Some(3));
    assert_eq!(eval.run(&plan).as_i64(), Some(3));
}

#[test]
fn test_check_mode_does_not_fold() {
    let plan = call("mul", vec![int(6), int(7)]);
    let mut eval = Evaluator::builder().mode(EvalMode::Check).build();
    assert_eq!(eval.run(&plan).as_i64(), Some(42));
    let Node::Call(node) = &plan else {
        panic!("expected a call node");
    };
    assert!(node.folded().is_none());
}

#[test]
fn test_runaway_recursion_hits_depth_limit() {
    let config = EvalConfig {
        max_depth: 40,
        ..EvalMode::Capture.config()
    };
    let mut eval = Evaluator::builder()
        .mode(EvalMode::Capture)
        .config(config)
        .build();
    let result = eval.run(&call(
        "seq",
        vec![
            call(
                "set",
                vec![
                    Node::ident("f"),
                    call("code", vec![call("call", vec![Node::ident("f")])]),
                ],
            ),
            call("call", vec![Node::ident("f")]),
        ],
    ));
    assert_eq!(code_of(&result).as_deref(), Some("recursion-limit"));
    assert_eq!(eval.depth(), 0);
    assert_eq!(eval.env.depth(), 1);
}

#[test]
fn test_escaped_continue_becomes_error() {
    let result = capture().run(&call("continue", vec![]));
    assert_eq!(code_of(&result).as_deref(), Some("escaped-control"));
}

#[test]
fn test_top_level_return_supplies_result() {
    let result = capture().run(&call("seq", vec![call("return", vec![int(5)]), int(6)]));
    assert_eq!(result.as_i64(), Some(5));
}

#[test]
fn test_extra_arguments_are_rejected() {
    let identity = call("code", vec![Node::ident("x"), Node::ident("x")]);
    let result = capture().run(&call("call", vec![identity, int(1), int(2)]));
    assert_eq!(code_of(&result).as_deref(), Some("arity-mismatch"));
}

#[test]
fn test_missing_arguments_are_null() {
    let second = call(
        "code",
        vec![Node::ident("x"), Node::ident("y"), Node::ident("y")],
    );
    let result = capture().run(&call("call", vec![second, int(1)]));
    assert!(result.is_null());
}

#[test]
fn test_stop_request_yields_null() {
    let mut eval = capture();
    eval.control().request_stop();
    let result = eval.run(&call("seq", vec![int(1), int(2)]));
    assert!(result.is_null());
}

#[test]
fn test_frames_are_popped_on_every_exit() {
    let mut eval = capture();
    let before = eval.env.depth();
    let outcome = eval.with_frame(FrameKind::Block, |eval| {
        eval.with_frame(FrameKind::Loop, |eval| eval.evaluate(&call("break", vec![])))
    });
    assert!(outcome.is_err());
    assert_eq!(eval.env.depth(), before);
}

#[test]
fn test_read_only_nests() {
    let mut eval = capture();
    assert!(!eval.is_read_only());
    let inner = eval.with_read_only(|eval| eval.with_read_only(|eval| eval.is_read_only()));
    assert!(inner);
    assert!(!eval.is_read_only());
}

#[test]
fn test_worker_sees_and_edits_globals() {
    let mut eval = capture();
    eval.run(&call("set", vec![Node::ident("shared"), call("list", vec![])]));
    let mut worker = eval.seed().evaluator();
    worker.run(&call("append", vec![Node::ident("shared"), int(7)]));
    let shared = eval.run(&Node::ident("shared"));
    assert!(shared.structural_eq(&Value::list(vec![Value::int(7)])));
}

#[test]
fn test_worker_output_reaches_parent_handler() {
    let eval = capture();
    let mut worker = eval.seed().evaluator();
    worker.run(&call("print", vec![Node::literal(Value::string("from worker"))]));
    assert_eq!(eval.print_handler().output(), "from worker\n");
}
