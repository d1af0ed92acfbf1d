use super::*;
use crate::{Slot, SlotRef};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::int).collect())
}

fn append_tail(slot: &Slot, value: Value) -> Result<(), EvalError> {
    assign(&slot.handle(), value, AssignMode::Append { position: None })
}

#[test]
fn replace_moves_temporaries() {
    let slot = Slot::new(Value::int(1));
    assert!(assign(&slot.handle(), Value::string("two"), AssignMode::Replace).is_ok());
    assert_eq!(slot.read().to_string(), "two");
}

#[test]
fn replace_copies_aliased_sources() {
    let source = Slot::new(ints(&[1, 2]));
    let target = Slot::new(Value::null());
    let alias = Value::alias(source.downgrade());
    assert!(assign(&target.handle(), alias, AssignMode::Replace).is_ok());
    assert!(append_tail(&source, Value::int(3)).is_ok());
    assert_eq!(target.read().to_string(), "[1, 2]");
    assert_eq!(source.read().to_string(), "[1, 2, 3]");
}

#[test]
fn assigning_through_alias_writes_target() {
    let list = Slot::new(ints(&[1, 2, 3]));
    let reference = Slot::new(Value::alias(list.downgrade()));
    assert!(append_tail(&reference, Value::int(4)).is_ok());
    assert_eq!(list.read().to_string(), "[1, 2, 3, 4]");
}

#[test]
fn self_append_copies_before_locking() {
    let list = Slot::new(ints(&[1]));
    let alias = Value::alias(list.downgrade());
    assert!(append_tail(&list, alias).is_ok());
    assert_eq!(list.read().to_string(), "[1, [1]]");
}

#[test]
fn append_at_position() {
    let list = Slot::new(ints(&[1, 3]));
    let mode = AssignMode::Append { position: Some(1) };
    assert!(assign(&list.handle(), Value::int(2), mode).is_ok());
    assert_eq!(list.read().to_string(), "[1, 2, 3]");
    let out_of_range = AssignMode::Append { position: Some(9) };
    assert!(assign(&list.handle(), Value::int(0), out_of_range).is_err());
}

#[test]
fn append_adds_and_concatenates_scalars() {
    let number = Slot::new(Value::int(40));
    assert!(append_tail(&number, Value::int(2)).is_ok());
    assert_eq!(number.read().as_i64(), Some(42));

    let text = Slot::new(Value::string("ab"));
    assert!(append_tail(&text, Value::string("cd")).is_ok());
    assert_eq!(text.read().as_str(), Some("abcd"));
}

#[test]
fn append_to_null_starts_a_list() {
    let slot = Slot::new(Value::null());
    assert!(append_tail(&slot, Value::int(1)).is_ok());
    assert_eq!(slot.read().to_string(), "[1]");
}

#[test]
fn arrays_reject_growth() {
    let array = Slot::new(Value::array(vec![Value::int(1)]));
    let err = append_tail(&array, Value::int(2)).err();
    assert_eq!(err.map(|e| e.code().to_string()).as_deref(), Some("type-mismatch"));
}

#[test]
fn extend_splices_members() {
    let list = Slot::new(ints(&[1]));
    assert!(assign(&list.handle(), ints(&[2, 3]), AssignMode::Extend).is_ok());
    assert_eq!(list.read().to_string(), "[1, 2, 3]");
    assert!(assign(&list.handle(), Value::int(4), AssignMode::Extend).is_err());
}

#[test]
fn replace_keeps_target_const_check_and_merges_const() {
    let slot = Slot::new(Value::int(1));
    assert!(assign(&slot.handle(), Value::int(5).into_const(), AssignMode::Replace).is_ok());
    assert!(slot.read().is_const());
    let err = assign(&slot.handle(), Value::int(6), AssignMode::Replace).err();
    assert_eq!(
        err.map(|e| e.code().to_string()).as_deref(),
        Some("mutation-of-constant")
    );
    assert_eq!(slot.read().as_i64(), Some(5));
}

#[test]
fn failed_extend_leaves_target_alone() {
    let slot = Slot::new(Value::null());
    assert!(assign(&slot.handle(), Value::int(5), AssignMode::Extend).is_err());
    assert!(slot.read().is_null());
}

#[test]
fn namespace_cells_only_take_objects() {
    let empty = Value::object(None, Vec::new());
    let namespace = Slot::new(empty.with_flags(ValueFlags::NAMESPACE));
    let err = assign(&namespace.handle(), Value::int(5), AssignMode::Replace).err();
    assert_eq!(err.map(|e| e.code().to_string()).as_deref(), Some("type-mismatch"));

    let fields = Value::object(None, vec![(crate::Name::intern("x"), Value::int(1))]);
    assert!(assign(&namespace.handle(), fields, AssignMode::Replace).is_ok());
    assert!(namespace.read().flags.contains(ValueFlags::NAMESPACE));
    assert!(!namespace.read().deep_copy().flags.contains(ValueFlags::NAMESPACE));
}

#[test]
fn dangling_target_is_an_error() {
    let target = Slot::new(Value::null());
    let reference = Slot::new(Value::alias(target.downgrade()));
    drop(target);
    assert!(assign(&reference.handle(), Value::int(1), AssignMode::Replace).is_err());
}

fn mode_strategy() -> impl Strategy<Value = AssignMode> {
    prop_oneof![
        Just(AssignMode::Replace),
        Just(AssignMode::Append { position: None }),
        Just(AssignMode::Extend),
    ]
}

proptest! {
    #[test]
    fn const_targets_never_change(
        items in proptest::collection::vec(any::<i64>(), 0..8),
        extra in proptest::collection::vec(any::<i64>(), 0..4),
        mode in mode_strategy(),
    ) {
        let slot = Slot::new(ints(&items).into_const());
        let before = crate::codec::to_bytes(&slot.read()).unwrap_or_default();
        let result = assign(&slot.handle(), ints(&extra), mode);
        prop_assert_eq!(
            result.err().map(|e| e.code().to_string()),
            Some("mutation-of-constant".to_string())
        );
        let after = crate::codec::to_bytes(&slot.read()).unwrap_or_default();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn alias_mutation_is_visible_and_copy_mutation_is_not(
        items in proptest::collection::vec(any::<i64>(), 0..8),
        pushed in any::<i64>(),
    ) {
        let original = Slot::new(Value::list(vec![ints(&items)]));
        let alias: SlotRef = original.downgrade();
        let copy = Slot::new(original.read().deep_copy());

        // Mutate the nested list through the alias.
        let nested = alias
            .resolve()
            .ok()
            .and_then(|h| h.read().members().map(|m| m[0].slot.handle()));
        prop_assert!(nested.is_some());
        if let Some(nested) = nested {
            let tail = AssignMode::Append { position: None };
            let appended = assign(&nested, Value::int(pushed), tail).is_ok();
            prop_assert!(appended);
        }
        let mut expected = items.clone();
        expected.push(pushed);
        prop_assert!(original.read().structural_eq(&Value::list(vec![ints(&expected)])));

        // Mutating the copy leaves the original alone.
        let copy_nested = copy.read().members().map(|m| m[0].slot.handle());
        if let Some(copy_nested) = copy_nested {
            let replaced = assign(&copy_nested, Value::int(0), AssignMode::Replace).is_ok();
            prop_assert!(replaced);
        }
        prop_assert!(original.read().structural_eq(&Value::list(vec![ints(&expected)])));
    }
}
