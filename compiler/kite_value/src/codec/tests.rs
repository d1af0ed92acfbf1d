use super::*;
use crate::{CharClass, ClassDescriptor, RuleTerm, Slot};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn round_trip(value: &Value) -> Value {
    let bytes = to_bytes(value).unwrap_or_else(|e| panic!("encode failed: {e}"));
    from_bytes(&bytes).unwrap_or_else(|e| panic!("decode failed: {e}"))
}

fn assert_round_trips(value: &Value) {
    let back = round_trip(value);
    assert!(
        value.structural_eq(&back),
        "round trip changed {value} into {back}"
    );
}

#[test]
fn every_kind_round_trips() {
    let class = ClassRef::new(ClassDescriptor::new(
        Name::intern("point"),
        None,
        vec![(Name::intern("x"), Value::int(0))],
    ));
    let samples = vec![
        Value::null(),
        Value::bool(true),
        Value::big_int("123456789012345678901234567890".parse().unwrap_or_default()),
        Value::float(-0.25),
        Value::bytes(vec![0, 1, 255]),
        Value::string("héllo"),
        Value::time(TimeValue {
            secs: 1_700_000_000,
            nanos: 42,
        }),
        Value::list(vec![Value::int(1), Value::list(vec![])]),
        Value::array(vec![Value::string("a")]),
        Value::tuple(vec![Value::int(1), Value::string("b")]),
        Value::markup(
            Name::intern("div"),
            vec![Member::named(Name::intern("id"), Value::string("main"))],
        ),
        Value::code(
            vec![Name::intern("a")],
            Arc::new(Node::call("add", vec![Node::ident("a"), Node::literal(Value::int(1))])),
        ),
        Value::class_value(class.clone()),
        Value::object(Some(class), vec![(Name::intern("x"), Value::int(3))]),
        Value::rule(RuleValue::new(vec![vec![RuleTerm::Class(CharClass::Digit)]])),
        Value::error(crate::raised("oops", "it broke")),
    ];
    for value in &samples {
        assert_round_trips(value);
    }
}

#[test]
fn alias_encodes_terminal_value() {
    let target = Slot::new(Value::string("shared"));
    let back = round_trip(&Value::alias(target.downgrade()));
    assert!(!back.is_alias());
    assert_eq!(back.as_str(), Some("shared"));
}

#[test]
fn const_flag_survives_round_trip() {
    let back = round_trip(&Value::int(5).into_const());
    assert!(back.is_const());
}

#[test]
fn pending_hint_is_not_encoded() {
    let namespace = Slot::new(Value::null());
    let value = Value::pending_error(
        crate::undefined_name("z", "global"),
        crate::PendingAssignment {
            name: Name::intern("z"),
            namespace: namespace.downgrade(),
        },
    );
    let back = round_trip(&value);
    assert!(back.as_error().is_some_and(|e| e.pending().is_none()));
}

#[test]
fn bad_int_digits_are_rejected() {
    let repr = ValueRepr {
        kind: KindRepr::Int("12x".into()),
        flags: 0,
        class: None,
    };
    assert!(matches!(repr.into_value(), Err(CodecError::InvalidInt(_))));
}

#[test]
fn garbage_bytes_fail_to_decode() {
    assert!(from_bytes(&[0xff, 0xff, 0xff, 0xff, 0xff]).is_err());
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(()).prop_map(|()| Value::null()),
        any::<bool>().prop_map(Value::bool),
        any::<i64>().prop_map(Value::int),
        any::<f64>().prop_map(Value::float),
        ".{0,12}".prop_map(|s: String| Value::string(s)),
        proptest::collection::vec(any::<u8>(), 0..12).prop_map(|b: Vec<u8>| Value::bytes(b)),
    ]
}

fn nested() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::list),
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::tuple),
            proptest::collection::vec(inner, 0..4).prop_map(Value::array),
        ]
    })
}

proptest! {
    #[test]
    fn round_trip_is_structurally_equal(value in nested()) {
        let back = round_trip(&value);
        prop_assert!(value.structural_eq(&back));
    }
}

#[test]
fn self_reference_fails_to_encode() {
    let owner = Slot::new(Value::object(None, Vec::new()));
    let me = Member::named(Name::intern("me"), Value::alias(owner.downgrade()));
    if let Some(members) = owner.write().members_mut() {
        members.push(me);
    }
    assert!(matches!(to_bytes(&owner.read()), Err(CodecError::Cycle)));
    let alias = Value::alias(owner.downgrade());
    assert!(matches!(to_bytes(&alias), Err(CodecError::Cycle)));
}

#[test]
fn shared_alias_targets_encode_each_time() {
    let shared = Slot::new(Value::int(7));
    let pair = Value::list(vec![
        Value::alias(shared.downgrade()),
        Value::alias(shared.downgrade()),
    ]);
    assert_eq!(round_trip(&pair).to_string(), "[7, 7]");
}
