use super::*;
use crate::ResourceSlot;
use pretty_assertions::assert_eq;

#[derive(Debug)]
struct Marker;

impl crate::Resource for Marker {
    fn kind(&self) -> &'static str {
        "marker"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::int).collect())
}

#[test]
fn deep_copy_is_independent() {
    let original = ints(&[1, 2, 3]);
    let copy = original.deep_copy();
    if let Some(members) = copy.members() {
        *members[0].slot.write() = Value::int(99);
    }
    assert_eq!(original.to_string(), "[1, 2, 3]");
    assert_eq!(copy.to_string(), "[99, 2, 3]");
}

#[test]
fn deep_copy_resolves_alias_chain() {
    let target = Slot::new(ints(&[4, 5]));
    let alias = Value::alias(target.downgrade());
    let copy = alias.deep_copy();
    assert!(!copy.is_alias());
    assert!(copy.structural_eq(&target.read()));
}

#[test]
fn deep_copy_inherits_const_into_members() {
    let original = Value::list(vec![ints(&[1])]).into_const();
    let copy = original.deep_copy();
    assert!(copy.is_const());
    let nested_const = copy.members().map(|m| m[0].slot.read().is_const());
    assert_eq!(nested_const, Some(true));
}

#[test]
fn deep_copy_drops_local_only_and_shares_resource() {
    let resource = ResourceSlot::new(Marker);
    let original = Value::int(1)
        .with_flags(ValueFlags::LOCAL_ONLY)
        .with_resource(resource.clone());
    let copy = original.deep_copy();
    assert!(!copy.is_local_only());
    assert!(copy.resource.is_some_and(|r| r.ptr_eq(&resource)));
}

#[test]
fn alias_members_are_copied_as_aliases() {
    let shared = Slot::new(Value::int(1));
    let holder = Value::list(vec![Value::alias(shared.downgrade())]);
    let copy = holder.deep_copy();
    *shared.write() = Value::int(2);
    let first = copy.members().map(|m| m[0].slot.read().is_alias());
    assert_eq!(first, Some(true));
    assert_eq!(copy.to_string(), "[2]");
}

#[test]
fn dangling_alias_copies_to_error() {
    let target = Slot::new(Value::int(1));
    let alias = Value::alias(target.downgrade());
    drop(target);
    let copy = alias.deep_copy();
    assert_eq!(
        copy.as_error().map(|e| e.error.code().to_string()),
        Some("dangling-reference".to_string())
    );
}

#[test]
fn truthiness() {
    assert!(!Value::null().is_truthy());
    assert!(!Value::bool(false).is_truthy());
    assert!(!Value::int(0).is_truthy());
    assert!(!Value::float(0.0).is_truthy());
    assert!(!Value::string("").is_truthy());
    assert!(!Value::error(crate::EvalError::new("x")).is_truthy());
    assert!(Value::int(-1).is_truthy());
    assert!(Value::string("0").is_truthy());
    assert!(Value::list(vec![]).is_truthy());
}

#[test]
fn truthiness_follows_alias() {
    let slot = Slot::new(Value::int(0));
    assert!(!Value::alias(slot.downgrade()).is_truthy());
}

#[test]
fn member_lookup_is_last_match_wins() {
    let x = Name::intern("x");
    let object = Value::object(None, vec![(x, Value::int(1)), (x, Value::int(2))]);
    let found = object.member(x).map(|m| m.slot.read().as_i64());
    assert_eq!(found, Some(Some(2)));
}

#[test]
fn materialize_strips_pending_hint() {
    let namespace = Slot::new(Value::null());
    let pending = Value::pending_error(
        crate::undefined_name("y", "global"),
        PendingAssignment {
            name: Name::intern("y"),
            namespace: namespace.downgrade(),
        },
    );
    let plain = pending.materialize();
    assert!(plain.as_error().is_some_and(|e| e.pending().is_none()));
}

#[test]
fn display_formats() {
    assert_eq!(Value::float(2.0).to_string(), "2.0");
    assert_eq!(Value::float(1.23456).display(Some(2)).to_string(), "1.23");
    assert_eq!(
        Value::list(vec![Value::string("a"), Value::null()]).to_string(),
        "[\"a\", null]"
    );
    assert_eq!(Value::string("top").to_string(), "top");
    assert_eq!(Value::bytes(vec![0x0a, 0xff]).to_string(), "0x0aff");
    let tag = Name::intern("p");
    let markup = Value::markup(
        tag,
        vec![
            Member::named(Name::intern("class"), Value::string("note")),
            Member::unnamed(Value::string("hi")),
        ],
    );
    assert_eq!(markup.to_string(), "<p class: \"note\", \"hi\">");
}

#[test]
fn structural_eq_ignores_flags() {
    let a = ints(&[1, 2]).into_const();
    let b = ints(&[1, 2]);
    assert!(a.structural_eq(&b));
    assert!(!a.structural_eq(&ints(&[2, 1])));
    assert!(!Value::list(vec![]).structural_eq(&Value::tuple(vec![])));
}

fn self_referencing() -> Slot {
    let owner = Slot::new(Value::object(None, Vec::new()));
    let me = Member::named(Name::intern("me"), Value::alias(owner.downgrade()));
    if let Some(members) = owner.write().members_mut() {
        members.push(me);
    }
    owner
}

#[test]
fn display_marks_cycles() {
    let owner = self_referencing();
    assert_eq!(owner.read().to_string(), "{me: {me: <cycle>}}");
    assert_eq!(Value::alias(owner.downgrade()).to_string(), "{me: <cycle>}");
}

#[test]
fn structural_eq_terminates_on_cycles() {
    let owner = self_referencing();
    let alias = Value::alias(owner.downgrade());
    let copy = alias.deep_copy();
    assert!(alias.structural_eq(&copy));
    assert!(copy.structural_eq(&alias));

    let twin = self_referencing();
    assert!(alias.structural_eq(&Value::alias(twin.downgrade())));

    let flat = Value::object(None, vec![(Name::intern("me"), Value::null())]);
    assert!(!alias.structural_eq(&flat));
}
