//! Intrinsic classes: the method tables of the built-in kinds.
//!
//! Every method is a code value whose body calls a built-in operation with
//! `this` as its first argument, so `method(text, "upper")` runs
//! `upper(this)` inside an instance frame for `text`. Classes are built on
//! first use and shared by every evaluator in the process.

use std::sync::{Arc, OnceLock};

use kite_ir::Name;
use kite_value::{ClassDescriptor, ClassRef, Node, Value, ValueKind};

/// `(method, operation, parameters)`. The operation receives `this`
/// followed by the parameters in order.
type MethodSpec = (&'static str, &'static str, &'static [&'static str]);

const COMMON: &[MethodSpec] = &[
    ("copy", "copy", &[]),
    ("assign", "set", &["value"]),
    ("append", "append", &["value", "position"]),
    ("extend", "extend", &["value"]),
    ("type", "type", &[]),
    ("to-string", "to-string", &[]),
    ("equals", "eq", &["other"]),
    ("is-error", "is-error", &[]),
    ("print", "print", &[]),
];

const STRING: &[MethodSpec] = &[
    ("length", "len", &[]),
    ("upper", "upper", &[]),
    ("lower", "lower", &[]),
    ("trim", "trim", &[]),
    ("split", "split", &["separator"]),
    ("find", "find", &["needle"]),
    ("replace", "replace", &["from", "to"]),
    ("contains", "contains", &["needle"]),
    ("substr", "substr", &["start", "length"]),
    ("to-int", "to-int", &[]),
    ("to-float", "to-float", &[]),
];

const NUMBER: &[MethodSpec] = &[
    ("abs", "abs", &[]),
    ("neg", "neg", &[]),
    ("to-int", "to-int", &[]),
    ("to-float", "to-float", &[]),
];

const SEQUENCE: &[MethodSpec] = &[
    ("length", "len", &[]),
    ("get", "get", &["key"]),
    ("insert", "insert", &["position", "value"]),
    ("remove", "remove", &["position"]),
    ("slice", "slice", &["start", "end"]),
    ("reverse", "reverse", &[]),
    ("sort", "sort", &[]),
    ("contains", "contains", &["needle"]),
    ("join", "join", &["separator"]),
    ("map", "map", &["code"]),
    ("filter", "filter", &["code"]),
    ("reduce", "reduce", &["code", "init"]),
    ("pmap", "pmap", &["code", "shares"]),
    ("pfilter", "pfilter", &["code", "shares"]),
    ("preduce", "preduce", &["code", "init", "shares"]),
];

const BYTES: &[MethodSpec] = &[("length", "len", &[])];

const TIME: &[MethodSpec] = &[("millis", "millis", &[])];

const MARKUP: &[MethodSpec] = &[
    ("tag", "tag", &[]),
    ("length", "len", &[]),
    ("get", "get", &["key"]),
];

const RULE: &[MethodSpec] = &[
    ("match", "rule-match", &["text"]),
    ("prefix", "rule-prefix", &["text"]),
];

const ERROR: &[MethodSpec] = &[
    ("code", "error-code", &[]),
    ("message", "error-message", &[]),
];

const TASK: &[MethodSpec] = &[
    ("join", "await", &[]),
    ("stop", "stop", &[]),
    ("suspend", "suspend", &[]),
    ("resume", "resume", &[]),
];

const MONITOR: &[MethodSpec] = &[
    ("lock", "lock", &[]),
    ("unlock", "unlock", &[]),
    ("try-lock", "try-lock", &[]),
    ("wait", "wait", &["timeout"]),
    ("signal", "signal", &[]),
];

fn method((name, op, params): &MethodSpec) -> (Name, Value) {
    let mut args = Vec::with_capacity(params.len() + 1);
    args.push(Node::ident("this"));
    args.extend(params.iter().map(|param| Node::ident(param)));
    let params = params.iter().map(|param| Name::intern(param)).collect();
    (
        Name::intern(name),
        Value::code(params, Arc::new(Node::call(op, args))),
    )
}

fn build(name: &str, specs: &[MethodSpec]) -> ClassRef {
    ClassRef::new(ClassDescriptor::new(
        Name::intern(name),
        None,
        specs.iter().map(method).collect(),
    ))
}

macro_rules! intrinsic {
    ($(#[$meta:meta])* $fn_name:ident, $name:literal, $specs:expr) => {
        $(#[$meta])*
        pub fn $fn_name() -> &'static ClassRef {
            static CLASS: OnceLock<ClassRef> = OnceLock::new();
            CLASS.get_or_init(|| build($name, $specs))
        }
    };
}

intrinsic!(
    /// Methods every value understands.
    common_class, "value", COMMON
);
intrinsic!(string_class, "string", STRING);
intrinsic!(int_class, "int", NUMBER);
intrinsic!(float_class, "float", NUMBER);
intrinsic!(list_class, "list", SEQUENCE);
intrinsic!(array_class, "array", SEQUENCE);
intrinsic!(tuple_class, "tuple", SEQUENCE);
intrinsic!(bytes_class, "bytes", BYTES);
intrinsic!(time_class, "time", TIME);
intrinsic!(markup_class, "markup", MARKUP);
intrinsic!(rule_class, "rule", RULE);
intrinsic!(error_class, "error", ERROR);
intrinsic!(
    /// Class of the handle `spawn` returns.
    task_class, "task", TASK
);
intrinsic!(
    /// Class of the values `monitor` creates.
    monitor_class, "monitor", MONITOR
);

/// The intrinsic class for a value's kind, if the kind has one. Objects use
/// their own class.
pub fn intrinsic_class(value: &Value) -> Option<ClassRef> {
    let class = match &value.kind {
        ValueKind::Str(_) => string_class(),
        ValueKind::Int(_) => int_class(),
        ValueKind::Float(_) => float_class(),
        ValueKind::List(_) => list_class(),
        ValueKind::Array(_) => array_class(),
        ValueKind::Tuple(_) => tuple_class(),
        ValueKind::Bytes(_) => bytes_class(),
        ValueKind::Time(_) => time_class(),
        ValueKind::Markup(_) => markup_class(),
        ValueKind::Rule(_) => rule_class(),
        ValueKind::Error(_) => error_class(),
        _ => return None,
    };
    Some(class.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_methods_call_their_operation_with_this() {
        let class = string_class();
        let (_, upper) = class
            .find_member(Name::intern("upper"))
            .unwrap_or_else(|| panic!("string has no upper"));
        let code = upper.as_code().unwrap_or_else(|| panic!("upper is not code"));
        assert!(code.params.is_empty());
        assert!(code.body.structural_eq(&Node::call("upper", vec![Node::ident("this")])));
    }

    #[test]
    fn test_intrinsic_class_by_kind() {
        let name = |v: &Value| intrinsic_class(v).map(|c| c.name().as_str());
        assert_eq!(name(&Value::string("x")), Some("string"));
        assert_eq!(name(&Value::list(vec![])), Some("list"));
        assert_eq!(name(&Value::null()), None);
        assert_eq!(name(&Value::object(None, vec![])), None);
    }

    #[test]
    fn test_classes_are_built_once() {
        assert!(task_class().ptr_eq(task_class()));
    }
}
