use super::*;
use pretty_assertions::assert_eq;

#[test]
fn factory_message_matches_kind_display() {
    let err = undefined_name("total", "global");
    assert_eq!(err.message, err.kind.to_string());
    assert_eq!(err.code(), "undefined-name");
}

#[test]
fn raised_errors_keep_script_code_and_message() {
    let err = raised("bad-input", "expected a positive number");
    assert_eq!(err.code(), "bad-input");
    assert_eq!(err.to_string(), "expected a positive number");
}

#[test]
fn resource_errors_use_collaborator_code() {
    let err = resource_error("lock-not-held", "unlock without lock");
    assert_eq!(err.code(), "lock-not-held");
    assert!(err.message.contains("unlock without lock"));
}

#[test]
fn arity_message_pluralizes() {
    assert_eq!(
        wrong_arg_count("len", 1, 2).message,
        "len expects 1 argument, got 2"
    );
    assert_eq!(
        wrong_arg_count("add", 2, 3).message,
        "add expects 2 arguments, got 3"
    );
}

#[test]
fn pending_hint_is_dropped_by_without_pending() {
    let namespace = crate::Slot::new(Value::null());
    let err = ErrorValue::with_pending(
        undefined_name("x", "block"),
        PendingAssignment {
            name: Name::intern("x"),
            namespace: namespace.downgrade(),
        },
    );
    assert!(err.pending().is_some());
    assert!(err.without_pending().pending().is_none());
}

#[test]
fn control_labels() {
    assert_eq!(ControlAction::Break.label(), "break");
    assert_eq!(ControlAction::Return(Value::null()).label(), "return");
    assert_eq!(
        escaped_control(&ControlAction::Continue).code(),
        "escaped-control"
    );
}
