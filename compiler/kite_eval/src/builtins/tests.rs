//! Plan-level tests for the built-in catalog.

use kite_value::{Node, Value};
use pretty_assertions::assert_eq;

use crate::{EvalMode, Evaluator};

fn int(n: i64) -> Node {
    Node::literal(Value::int(n))
}

fn text(s: &str) -> Node {
    Node::literal(Value::string(s))
}

fn id(name: &str) -> Node {
    Node::ident(name)
}

fn call(op: &str, args: Vec<Node>) -> Node {
    Node::call(op, args)
}

fn ints(items: &[i64]) -> Value {
    Value::list(items.iter().copied().map(Value::int).collect())
}

fn evaluator() -> Evaluator {
    Evaluator::builder().mode(EvalMode::Capture).build()
}

/// Run statements in the global frame and return the last result.
fn run(statements: Vec<Node>) -> Value {
    evaluator().run(&call("seq", statements))
}

fn error_code(value: &Value) -> Option<String> {
    value.as_error().map(|e| e.error.code().to_string())
}

// Aliasing and copying

#[test]
fn test_reference_shares_the_list() {
    let result = run(vec![
        call("set", vec![id("list"), call("list", vec![int(1), int(2), int(3)])]),
        call("set", vec![id("ref"), id("list")]),
        call("method", vec![id("ref"), text("append"), int(4)]),
        id("list"),
    ]);
    assert!(result.structural_eq(&ints(&[1, 2, 3, 4])));
}

#[test]
fn test_copy_is_independent() {
    let mut eval = evaluator();
    let plan = call(
        "seq",
        vec![
            call("set", vec![id("list"), call("list", vec![int(1), int(2), int(3)])]),
            call("set", vec![id("copy"), call("method", vec![id("list"), text("copy")])]),
            call("method", vec![id("copy"), text("append"), int(4)]),
            call("list", vec![id("list"), id("copy")]),
        ],
    );
    let result = eval.run(&plan);
    let expected = Value::list(vec![ints(&[1, 2, 3]), ints(&[1, 2, 3, 4])]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_set_on_existing_name_copies() {
    let result = run(vec![
        call("set", vec![id("a"), call("list", vec![int(1)])]),
        call("set", vec![id("b"), call("list", vec![])]),
        call("set", vec![id("b"), id("a")]),
        call("append", vec![id("b"), int(2)]),
        id("a"),
    ]);
    assert!(result.structural_eq(&ints(&[1])));
}

#[test]
fn test_nested_members_are_shared_through_reference() {
    let result = run(vec![
        call(
            "set",
            vec![id("outer"), call("list", vec![call("list", vec![int(1)])])],
        ),
        call("set", vec![id("inner"), call("get", vec![id("outer"), int(0)])]),
        call("append", vec![id("inner"), int(2)]),
        id("outer"),
    ]);
    assert!(result.structural_eq(&Value::list(vec![ints(&[1, 2])])));
}

// Constants

#[test]
fn test_constant_rejects_assignment() {
    let mut eval = evaluator();
    let attempt = eval.run(&call(
        "seq",
        vec![
            call("set", vec![id("x"), call("const", vec![int(5)])]),
            call("method", vec![id("x"), text("assign"), int(6)]),
        ],
    ));
    assert_eq!(error_code(&attempt).as_deref(), Some("mutation-of-constant"));
    assert_eq!(eval.run(&id("x")).as_i64(), Some(5));
}

#[test]
fn test_constant_rejects_every_mode() {
    let mut eval = evaluator();
    eval.run(&call(
        "set",
        vec![id("c"), call("const", vec![call("list", vec![int(1)])])],
    ));
    for attempt in [
        call("set", vec![id("c"), int(0)]),
        call("append", vec![id("c"), int(2)]),
        call("extend", vec![id("c"), call("list", vec![int(3)])]),
        call("remove", vec![id("c"), int(0)]),
        call("append", vec![call("get", vec![id("c"), int(0)]), int(9)]),
    ] {
        let result = eval.run(&attempt);
        assert_eq!(error_code(&result).as_deref(), Some("mutation-of-constant"));
    }
    assert!(eval.run(&id("c")).structural_eq(&ints(&[1])));
}

// Control flow

#[test]
fn test_break_ends_loop_with_null() {
    let result = run(vec![
        call("set", vec![id("seen"), call("list", vec![])]),
        call(
            "set",
            vec![
                id("result"),
                call(
                    "for",
                    vec![
                        id("i"),
                        call("range", vec![int(5)]),
                        call("append", vec![id("seen"), id("i")]),
                        call(
                            "if",
                            vec![call("eq", vec![id("i"), int(2)]), call("break", vec![])],
                        ),
                    ],
                ),
            ],
        ),
        call("list", vec![id("result"), id("seen")]),
    ]);
    let expected = Value::list(vec![Value::null(), ints(&[0, 1, 2])]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_return_leaves_nested_loop_but_not_call() {
    let body = call(
        "seq",
        vec![
            call(
                "for",
                vec![
                    id("i"),
                    int(10),
                    call(
                        "while",
                        vec![
                            Node::literal(Value::bool(true)),
                            call(
                                "if",
                                vec![
                                    call("eq", vec![id("i"), int(3)]),
                                    call("return", vec![id("i")]),
                                ],
                            ),
                            call("break", vec![]),
                        ],
                    ),
                ],
            ),
            int(99),
        ],
    );
    let result = run(vec![
        call("set", vec![id("f"), call("code", vec![body])]),
        call("list", vec![call("call", vec![id("f")]), text("after")]),
    ]);
    let expected = Value::list(vec![Value::int(3), Value::string("after")]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_continue_skips_rest_of_iteration() {
    let result = run(vec![
        call("set", vec![id("odd"), call("list", vec![])]),
        call(
            "for",
            vec![
                id("i"),
                int(6),
                call(
                    "if",
                    vec![
                        call("eq", vec![call("mod", vec![id("i"), int(2)]), int(0)]),
                        call("continue", vec![]),
                    ],
                ),
                call("append", vec![id("odd"), id("i")]),
            ],
        ),
        id("odd"),
    ]);
    assert!(result.structural_eq(&ints(&[1, 3, 5])));
}

#[test]
fn test_break_outside_loop_is_an_error() {
    let result = run(vec![call("break", vec![])]);
    assert_eq!(error_code(&result).as_deref(), Some("escaped-control"));
}

#[test]
fn test_if_evaluates_only_taken_branch() {
    let mut eval = evaluator();
    let result = eval.run(&call(
        "if",
        vec![
            Node::literal(Value::bool(false)),
            call("print", vec![text("then")]),
            call("print", vec![text("else")]),
        ],
    ));
    assert!(result.is_null());
    assert_eq!(eval.print_handler().output(), "else\n");
}

// Names and members

#[test]
fn test_let_shadows_inside_block_only() {
    let result = run(vec![
        call("set", vec![id("x"), int(1)]),
        call(
            "do",
            vec![
                call("let", vec![id("x"), int(2)]),
                call("set", vec![id("x"), int(3)]),
            ],
        ),
        id("x"),
    ]);
    assert_eq!(result.as_i64(), Some(1));
}

#[test]
fn test_set_on_missing_member_declares_it() {
    let result = run(vec![
        call("set", vec![id("p"), call("object", vec![text("x"), int(1)])]),
        call("set", vec![call("get", vec![id("p"), text("y")]), int(2)]),
        call("keys", vec![id("p")]),
    ]);
    let expected = Value::list(vec![Value::string("x"), Value::string("y")]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_readonly_blocks_auto_declaration() {
    let mut eval = evaluator();
    let result = eval.run(&call("readonly", vec![call("set", vec![id("fresh"), int(1)])]));
    assert_eq!(error_code(&result).as_deref(), Some("undefined-name"));
    let defined = eval.run(&call("defined", vec![id("fresh")]));
    assert_eq!(defined.as_bool(), Some(false));
}

#[test]
fn test_class_methods_edit_instance_copy() {
    let class = call(
        "class",
        vec![
            id("Counter"),
            Node::literal(Value::null()),
            call("let", vec![id("count"), int(0)]),
            call(
                "let",
                vec![
                    id("bump"),
                    call(
                        "code",
                        vec![
                            id("by"),
                            call("set", vec![id("count"), call("add", vec![id("count"), id("by")])]),
                        ],
                    ),
                ],
            ),
        ],
    );
    let result = run(vec![
        call("set", vec![id("Counter"), class]),
        call("set", vec![id("a"), call("new", vec![id("Counter")])]),
        call("set", vec![id("b"), call("new", vec![id("Counter")])]),
        call("method", vec![id("a"), text("bump"), int(5)]),
        call("method", vec![id("a"), text("bump"), int(2)]),
        call(
            "list",
            vec![
                call("get", vec![id("a"), text("count")]),
                call("get", vec![id("b"), text("count")]),
                call("is-a", vec![id("a"), text("Counter")]),
            ],
        ),
    ]);
    let expected = Value::list(vec![Value::int(7), Value::int(0), Value::bool(true)]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_missing_method_reports_class() {
    let result = run(vec![call("method", vec![int(1), text("fly")])]);
    assert_eq!(error_code(&result).as_deref(), Some("no-such-method"));
}

// Errors

#[test]
fn test_try_binds_error_for_handler() {
    let result = run(vec![call(
        "try",
        vec![
            call("div", vec![int(1), int(0)]),
            call("error-code", vec![id("error")]),
        ],
    )]);
    assert_eq!(result.as_str(), Some("division-by-zero"));
}

#[test]
fn test_errors_short_circuit_arguments() {
    let result = run(vec![call(
        "add",
        vec![call("error", vec![text("boom")]), call("print", vec![text("unreached")])],
    )]);
    assert_eq!(error_code(&result).as_deref(), Some("boom"));
}

#[test]
fn test_unknown_operation_is_a_value() {
    let result = run(vec![call("is-error", vec![call("frobnicate", vec![])])]);
    assert_eq!(result.as_bool(), Some(true));
}

// Collections, strings, rules, markup

#[test]
fn test_collection_pipeline() {
    let square = call("code", vec![id("x"), call("mul", vec![id("x"), id("x")])]);
    let even = call(
        "code",
        vec![id("x"), call("eq", vec![call("mod", vec![id("x"), int(2)]), int(0)])],
    );
    let sum = call("code", vec![id("a"), id("b"), call("add", vec![id("a"), id("b")])]);
    let result = run(vec![call(
        "reduce",
        vec![
            call("filter", vec![call("map", vec![call("range", vec![int(1), int(6)]), square]), even]),
            sum,
            int(0),
        ],
    )]);
    assert_eq!(result.as_i64(), Some(20));
}

#[test]
fn test_slice_sort_and_join() {
    let result = run(vec![call(
        "join",
        vec![
            call(
                "sort",
                vec![call("slice", vec![call("list", vec![int(9), int(3), int(7), int(1)]), int(0), int(-1)])],
            ),
            text(","),
        ],
    )]);
    assert_eq!(result.as_str(), Some("3,7,9"));
}

#[test]
fn test_string_methods() {
    let result = run(vec![call(
        "list",
        vec![
            call("method", vec![text("  Kite "), text("trim")]),
            call("method", vec![text("kite"), text("upper")]),
            call("split", vec![text("a b  c"), Node::literal(Value::null())]),
            call("find", vec![text("héllo"), text("l")]),
        ],
    )]);
    let expected = Value::list(vec![
        Value::string("Kite"),
        Value::string("KITE"),
        Value::list(vec![Value::string("a"), Value::string("b"), Value::string("c")]),
        Value::int(2),
    ]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_rules_match_prefixes() {
    let number = call("many", vec![call("chars", vec![text("digit")]), int(1)]);
    let result = run(vec![
        call("set", vec![id("r"), call("rule", vec![call("list", vec![text("v"), number])])]),
        call(
            "list",
            vec![
                call("rule-match", vec![id("r"), text("v12")]),
                call("rule-match", vec![id("r"), text("v")]),
                call("rule-prefix", vec![id("r"), text("v42x")]),
                call("rule-prefix", vec![id("r"), text("x")]),
            ],
        ),
    ]);
    let expected = Value::list(vec![
        Value::bool(true),
        Value::bool(false),
        Value::int(3),
        Value::null(),
    ]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_markup_spreads_attributes() {
    let result = run(vec![
        call(
            "set",
            vec![
                id("node"),
                call(
                    "markup",
                    vec![text("p"), call("object", vec![text("class"), text("note")]), text("hi")],
                ),
            ],
        ),
        call(
            "list",
            vec![
                call("tag", vec![id("node")]),
                call("len", vec![id("node")]),
                call("get", vec![id("node"), text("class")]),
            ],
        ),
    ]);
    let expected = Value::list(vec![Value::string("p"), Value::int(2), Value::string("note")]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_serialize_round_trip() {
    let result = run(vec![
        call(
            "set",
            vec![
                id("v"),
                call(
                    "list",
                    vec![
                        int(1),
                        text("two"),
                        call("tuple", vec![Node::literal(Value::float(3.5))]),
                    ],
                ),
            ],
        ),
        call("eq", vec![call("deserialize", vec![call("serialize", vec![id("v")])]), id("v")]),
    ]);
    assert_eq!(result.as_bool(), Some(true));
}

#[test]
fn test_print_respects_precision() {
    let mut eval = evaluator();
    eval.run(&call(
        "seq",
        vec![
            call("set-precision", vec![int(2)]),
            call("print", vec![text("pi"), Node::literal(Value::float(3.14159))]),
        ],
    ));
    assert_eq!(eval.print_handler().output(), "pi 3.14\n");
}

// Self-reference and failed assignments

/// An evaluator whose global `o` holds a member `me` referring back to `o`.
fn self_referencing_object() -> Evaluator {
    let mut eval = evaluator();
    eval.run(&call(
        "seq",
        vec![
            call("set", vec![id("o"), call("object", vec![])]),
            call("set", vec![call("get", vec![id("o"), text("me")]), id("o")]),
        ],
    ));
    eval
}

#[test]
fn test_self_referencing_object_prints_with_cycle_marker() {
    let mut eval = self_referencing_object();
    let shown = eval.run(&call("to-string", vec![id("o")]));
    assert!(shown.as_str().is_some_and(|s| s.contains("<cycle>")), "{shown}");

    eval.run(&call("print", vec![id("o")]));
    assert!(eval.print_handler().output().contains("<cycle>"));
}

#[test]
fn test_self_referencing_object_fails_to_serialize() {
    let mut eval = self_referencing_object();
    let result = eval.run(&call("serialize", vec![id("o")]));
    assert_eq!(error_code(&result).as_deref(), Some("codec"));
}

#[test]
fn test_self_referencing_object_equals_its_copy() {
    let mut eval = self_referencing_object();
    let result = eval.run(&call(
        "list",
        vec![
            call("eq", vec![id("o"), call("copy", vec![id("o")])]),
            call("eq", vec![id("o"), call("object", vec![text("me"), int(1)])]),
        ],
    ));
    let expected = Value::list(vec![Value::bool(true), Value::bool(false)]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_append_and_extend_declare_fresh_names() {
    let result = run(vec![
        call("append", vec![id("seen"), int(1)]),
        call("append", vec![id("seen"), int(2)]),
        call("extend", vec![id("more"), call("list", vec![int(3), int(4)])]),
        call("list", vec![id("seen"), id("more")]),
    ]);
    let expected = Value::list(vec![ints(&[1, 2]), ints(&[3, 4])]);
    assert!(result.structural_eq(&expected));
}

#[test]
fn test_failed_extend_keeps_null_target() {
    let mut eval = evaluator();
    eval.run(&call("set", vec![id("n"), Node::literal(Value::null())]));
    let failed = eval.run(&call("extend", vec![id("n"), int(5)]));
    assert_eq!(error_code(&failed).as_deref(), Some("type-mismatch"));
    let kind = eval.run(&call("type", vec![id("n")]));
    assert_eq!(kind.as_str(), Some("null"));
}

#[test]
fn test_global_cannot_be_replaced_but_takes_members() {
    let mut eval = evaluator();
    eval.run(&call("set", vec![id("keep"), int(1)]));
    let rejected = eval.run(&call("set", vec![id("global"), int(5)]));
    assert_eq!(error_code(&rejected).as_deref(), Some("type-mismatch"));

    let result = eval.run(&call(
        "seq",
        vec![
            call("set", vec![id("y"), int(2)]),
            call("set", vec![call("get", vec![id("global"), text("z")]), int(3)]),
            call("list", vec![id("keep"), id("y"), id("z")]),
        ],
    ));
    assert!(result.structural_eq(&ints(&[1, 2, 3])));
}

#[test]
fn test_undefined_name_in_method_reports_class() {
    let class = call(
        "class",
        vec![
            id("Box"),
            Node::literal(Value::null()),
            call("let", vec![id("peek"), call("code", vec![id("missing")])]),
        ],
    );
    let result = run(vec![
        call("set", vec![id("Box"), class]),
        call("set", vec![id("b"), call("new", vec![id("Box")])]),
        call("method", vec![id("b"), text("peek")]),
    ]);
    let message = result.as_error().map(|e| e.error.message.clone());
    assert!(
        message.as_deref().is_some_and(|m| m.contains("searched up to Box")),
        "{message:?}"
    );
}

// Concurrency

#[test]
fn test_locked_workers_never_overlap() {
    let worker = call(
        "code",
        vec![
            id("tag"),
            call(
                "seq",
                vec![
                    call("lock", vec![id("guard")]),
                    call("append", vec![id("log"), call("concat", vec![text("in"), id("tag")])]),
                    call("sleep", vec![int(10)]),
                    call("append", vec![id("log"), call("concat", vec![text("out"), id("tag")])]),
                    call("unlock", vec![id("guard")]),
                ],
            ),
        ],
    );
    let result = run(vec![
        call("set", vec![id("guard"), call("monitor", vec![])]),
        call("set", vec![id("log"), call("list", vec![])]),
        call("set", vec![id("work"), worker]),
        call("set", vec![id("a"), call("spawn", vec![id("work"), int(1)])]),
        call("set", vec![id("b"), call("spawn", vec![id("work"), int(2)])]),
        call("await", vec![id("a")]),
        call("await", vec![id("b")]),
        id("log"),
    ]);

    let entries: Vec<String> = result
        .members()
        .unwrap_or_default()
        .iter()
        .filter_map(|m| m.slot.read().as_str().map(str::to_string))
        .collect();
    assert_eq!(entries.len(), 4);
    for pair in entries.chunks(2) {
        let [enter, leave] = pair else {
            panic!("unbalanced log: {entries:?}");
        };
        assert_eq!(enter.strip_prefix("in"), leave.strip_prefix("out"));
    }
}

#[test]
fn test_await_returns_worker_result() {
    let result = run(vec![
        call(
            "set",
            vec![
                id("t"),
                call(
                    "spawn",
                    vec![
                        call("code", vec![id("n"), call("mul", vec![id("n"), int(2)])]),
                        int(21),
                    ],
                ),
            ],
        ),
        call("await", vec![id("t")]),
    ]);
    assert_eq!(result.as_i64(), Some(42));
}

#[test]
fn test_stopped_worker_yields_null() {
    let forever = call(
        "code",
        vec![call("while", vec![Node::literal(Value::bool(true)), call("sleep", vec![int(5)])])],
    );
    let result = run(vec![
        call("set", vec![id("t"), call("spawn", vec![forever])]),
        call("stop", vec![id("t")]),
        call("await", vec![id("t")]),
    ]);
    assert!(result.is_null());
}

#[test]
fn test_unlock_without_lock_fails() {
    let result = run(vec![
        call("set", vec![id("m"), call("monitor", vec![])]),
        call("unlock", vec![id("m")]),
    ]);
    assert_eq!(error_code(&result).as_deref(), Some("lock-not-held"));
}

#[test]
fn test_parallel_map_keeps_order_and_failures() {
    let result = run(vec![call(
        "pmap",
        vec![
            call("list", vec![int(1), int(0), int(4)]),
            call("code", vec![id("x"), call("div", vec![int(8), id("x")])]),
            int(2),
        ],
    )]);
    let items: Vec<Value> = result
        .members()
        .unwrap_or_default()
        .iter()
        .map(|m| m.slot.read().deep_copy())
        .collect();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_i64(), Some(8));
    assert_eq!(error_code(&items[1]).as_deref(), Some("division-by-zero"));
    assert_eq!(items[2].as_i64(), Some(2));
}

#[test]
fn test_parallel_filter_and_reduce_match_sequential() {
    let sum = || call("code", vec![id("a"), id("b"), call("add", vec![id("a"), id("b")])]);
    let odd = call(
        "code",
        vec![id("x"), call("eq", vec![call("mod", vec![id("x"), int(2)]), int(1)])],
    );
    let result = run(vec![
        call("set", vec![id("xs"), call("range", vec![int(1), int(101)])]),
        call(
            "list",
            vec![
                call("preduce", vec![id("xs"), sum(), Node::literal(Value::null()), int(4)]),
                call("reduce", vec![id("xs"), sum()]),
                call("len", vec![call("pfilter", vec![id("xs"), odd, int(3)])]),
            ],
        ),
    ]);
    let expected = Value::list(vec![Value::int(5050), Value::int(5050), Value::int(50)]);
    assert!(result.structural_eq(&expected));
}
