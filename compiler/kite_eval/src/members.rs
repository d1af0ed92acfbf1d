//! Member lookup on a receiver: own members first, then the class chain,
//! then the methods every value understands.

use kite_ir::Name;
use kite_value::{ClassRef, Member, SlotHandle, SlotRef, Value, ValueKind};

use crate::intrinsics::{common_class, intrinsic_class};

/// Where a member name led.
pub enum MemberLookup {
    /// A member cell of the receiver.
    Found(SlotRef),
    /// A class member read through a receiver that cannot hold members.
    Temp(Value),
    Missing,
}

/// Look `name` up on the value in `receiver`.
///
/// A class member found on an object is copied into the object the first
/// time it is read, and that copy is the object's own editable member from
/// then on. Non-objects get a fresh copy on every read. A value without a
/// class is bound to its intrinsic class here.
pub fn find_member(receiver: &SlotHandle, name: Name) -> MemberLookup {
    let class = {
        let content = receiver.read();
        if let Some(member) = content.member(name) {
            return MemberLookup::Found(member.slot.downgrade());
        }
        content.class.clone().or_else(|| intrinsic_class(&content))
    };

    let Some(copy) = class_member(class.as_ref(), name) else {
        return MemberLookup::Missing;
    };

    let mut content = receiver.write();
    let is_const = content.is_const();
    if content.class.is_none() {
        content.class = class;
    }
    match &mut content.kind {
        ValueKind::Object(members) => {
            // Another worker may have copied it in since the read above.
            if let Some(existing) = members.iter().rev().find(|m| m.name == Some(name)) {
                return MemberLookup::Found(existing.slot.downgrade());
            }
            let copy = if is_const { copy.into_const().deep_copy() } else { copy };
            let member = Member::named(name, copy);
            let target = member.slot.downgrade();
            members.push(member);
            MemberLookup::Found(target)
        }
        _ => MemberLookup::Temp(copy),
    }
}

/// A copy of `name` from the class chain, falling back to the common
/// methods.
fn class_member(class: Option<&ClassRef>, name: Name) -> Option<Value> {
    class
        .and_then(|class| class.find_member(name))
        .or_else(|| common_class().find_member(name))
        .map(|(_, value)| value.deep_copy())
}

/// Name of the receiver's class for error messages.
pub fn class_label(receiver: &Value) -> String {
    match &receiver.class {
        Some(class) => class.name().as_str().to_string(),
        None => receiver.type_name().to_string(),
    }
}
