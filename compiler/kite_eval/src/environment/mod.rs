//! Scope stack for name resolution.
//!
//! Every frame is backed by a namespace cell holding an `Object` whose
//! members are the frame's bindings, so a frame can be handed out as a value
//! (`parent`, `global`) and a binding is just a member slot an alias can
//! point at. Block, call and loop frames own their namespace; the global
//! namespace is shared with every worker environment; instance frames point
//! at the receiver of a method call.
//!
//! # Lookup order
//!
//! Frames are searched from the top of the stack down. Within a frame the
//! last binding with a name wins. Only the innermost instance frame takes
//! part in lookup: each instance frame's `skip` records the instance frame
//! below it, and the walk steps over that one when it gets there.

use kite_ir::Name;
use kite_value::{
    type_mismatch, undefined_name, EvalError, Member, PendingAssignment, Slot, SlotHandle,
    SlotRef, Value, ValueFlags, ValueKind,
};

use crate::members::{class_label, find_member, MemberLookup};

/// What a frame was pushed for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Global,
    Block,
    Call,
    Loop,
    Instance,
}

impl FrameKind {
    pub fn label(self) -> &'static str {
        match self {
            FrameKind::Global => "global",
            FrameKind::Block => "block",
            FrameKind::Call => "call",
            FrameKind::Loop => "loop",
            FrameKind::Instance => "instance",
        }
    }
}

enum Store {
    Owned(Slot),
    Shared(SlotHandle),
    Instance {
        receiver: SlotRef,
        /// Holds a receiver that was a temporary rather than a bound value.
        temp: Option<Slot>,
    },
}

/// One level of the scope stack.
pub struct Frame {
    id: u64,
    kind: FrameKind,
    store: Store,
    skip: Option<usize>,
}

impl Frame {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    #[inline]
    pub fn skip(&self) -> Option<usize> {
        self.skip
    }

    /// The cell holding this frame's bindings, or the receiver for instance
    /// frames.
    fn namespace(&self) -> SlotRef {
        match &self.store {
            Store::Owned(slot) => slot.downgrade(),
            Store::Shared(handle) => handle.downgrade(),
            Store::Instance { receiver, .. } => receiver.clone(),
        }
    }

    /// Binding named `name` declared directly in this frame.
    fn binding(&self, name: Name) -> Option<SlotRef> {
        let read = |namespace: &Value| namespace.member(name).map(|m| m.slot.downgrade());
        match &self.store {
            Store::Owned(slot) => read(&slot.read()),
            Store::Shared(handle) => read(&handle.read()),
            Store::Instance { .. } => None,
        }
    }

    /// Class of an instance frame's receiver.
    fn receiver_label(&self) -> Option<String> {
        let Store::Instance { receiver, .. } = &self.store else {
            return None;
        };
        let handle = receiver.resolve().ok()?;
        let label = class_label(&handle.read());
        Some(label)
    }

    /// Whether `target` lives inside storage this frame owns.
    fn owns(&self, target: &SlotRef) -> bool {
        match &self.store {
            Store::Owned(slot) => slot.is(target) || contains(&slot.read(), target, 0),
            Store::Instance {
                temp: Some(slot), ..
            } => slot.is(target) || contains(&slot.read(), target, 0),
            Store::Shared(_) | Store::Instance { temp: None, .. } => false,
        }
    }
}

/// Empty storage for a frame's bindings.
fn namespace_cell() -> Slot {
    Slot::new(Value::object(None, Vec::new()).with_flags(ValueFlags::NAMESPACE))
}

const MAX_OWNERSHIP_DEPTH: usize = 64;

fn contains(container: &Value, target: &SlotRef, depth: usize) -> bool {
    if depth > MAX_OWNERSHIP_DEPTH {
        return false;
    }
    container.members().is_some_and(|members| {
        members
            .iter()
            .any(|m| m.slot.is(target) || contains(&m.slot.read(), target, depth + 1))
    })
}

/// Result of resolving a name to storage.
pub enum Found {
    /// A cell. `local` is set when the cell belongs to a non-global frame.
    Slot { target: SlotRef, local: bool },
    /// A class member read through a receiver that cannot hold members.
    Temp(Value),
}

impl Found {
    /// The value an identifier evaluates to.
    pub fn into_value(self) -> Value {
        match self {
            Found::Slot { target, local } => {
                let alias = Value::alias(target);
                if local {
                    alias.with_flags(ValueFlags::LOCAL_ONLY)
                } else {
                    alias
                }
            }
            Found::Temp(value) => value,
        }
    }
}

/// Stack of scope frames.
pub struct Environment {
    frames: Vec<Frame>,
    next_id: u64,
}

impl Environment {
    /// A fresh environment with an empty global frame.
    pub fn new() -> Self {
        Self::with_global(namespace_cell().into_shared())
    }

    pub(crate) fn with_global(global: SlotHandle) -> Self {
        Environment {
            frames: vec![Frame {
                id: 0,
                kind: FrameKind::Global,
                store: Store::Shared(global),
                skip: None,
            }],
            next_id: 1,
        }
    }

    /// An independent environment sharing only this one's global frame.
    #[must_use]
    pub fn worker(&self) -> Self {
        Self::with_global(self.global_handle())
    }

    pub(crate) fn global_handle(&self) -> SlotHandle {
        match self.frames.first().map(|f| &f.store) {
            Some(Store::Shared(handle)) => handle.clone(),
            // The bottom frame is always the shared global one.
            _ => namespace_cell().into_shared(),
        }
    }

    /// Number of frames, including the global frame.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Push a frame with its own, empty namespace.
    pub fn push(&mut self, kind: FrameKind) {
        let id = self.next_id();
        self.frames.push(Frame {
            id,
            kind,
            store: Store::Owned(namespace_cell()),
            skip: None,
        });
    }

    /// Push an object-method frame for `receiver`.
    ///
    /// An alias receiver is referenced in place; any other value is kept in a
    /// cell owned by the frame for the duration of the call.
    pub fn push_instance(&mut self, receiver: Value) {
        let id = self.next_id();
        let skip = self
            .frames
            .iter()
            .rposition(|frame| frame.kind == FrameKind::Instance);
        let store = match receiver.kind {
            ValueKind::Alias(target) => Store::Instance {
                receiver: target,
                temp: None,
            },
            _ => {
                let slot = Slot::new(receiver);
                Store::Instance {
                    receiver: slot.downgrade(),
                    temp: Some(slot),
                }
            }
        };
        self.frames.push(Frame {
            id,
            kind: FrameKind::Instance,
            store,
            skip,
        });
    }

    /// Pop the innermost frame. The global frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Prepare `result` to leave the innermost frame: a local-only alias into
    /// storage the frame owns is turned into a copy.
    pub fn release(&self, result: Value) -> Value {
        match self.frames.last() {
            Some(frame) if self.frames.len() > 1 && result.is_local_only() => {
                release(frame, result)
            }
            _ => result,
        }
    }

    /// Move every binding out of the innermost owned frame, in declaration
    /// order.
    pub fn take_bindings(&mut self) -> Vec<(Name, Value)> {
        let Some(Frame {
            store: Store::Owned(slot),
            ..
        }) = self.frames.last()
        else {
            return Vec::new();
        };
        let members = slot.write().members_mut().map(std::mem::take);
        members
            .unwrap_or_default()
            .into_iter()
            .filter_map(|member| {
                let name = member.name?;
                Some((name, member.slot.into_value().materialize()))
            })
            .collect()
    }

    /// Declare `name` in the innermost frame.
    pub fn declare(&mut self, name: Name, value: Value) -> Result<SlotRef, EvalError> {
        let namespace = self.innermost_namespace();
        self.declare_in(&namespace, name, value)
    }

    /// Declare `name` as a new member of `namespace`, shadowing any earlier
    /// binding with that name.
    ///
    /// Aliases are bound as references. A local-only alias is copied instead
    /// when the namespace is not the innermost frame, so it cannot outlive
    /// its target.
    pub fn declare_in(
        &self,
        namespace: &SlotRef,
        name: Name,
        value: Value,
    ) -> Result<SlotRef, EvalError> {
        let value = if value.is_local_only() && !namespace.ptr_eq(&self.innermost_namespace()) {
            value.materialize()
        } else {
            match value.kind {
                ValueKind::Alias(_) => value,
                _ => value.materialize(),
            }
        };
        let handle = namespace.resolve()?;
        let mut content = handle.write();
        if content.is_null() {
            content.kind = ValueKind::Object(Vec::new());
        }
        let got = content.type_name();
        let Some(members) = content.members_mut() else {
            return Err(type_mismatch("namespace", got));
        };
        let member = Member::named(name, value);
        let target = member.slot.downgrade();
        members.push(member);
        Ok(target)
    }

    /// Namespace new bindings go to: the top frame's storage.
    pub fn innermost_namespace(&self) -> SlotRef {
        match self.frames.last() {
            Some(frame) => frame.namespace(),
            None => self.global_handle().downgrade(),
        }
    }

    /// The global namespace.
    pub fn global_namespace(&self) -> SlotRef {
        self.global_handle().downgrade()
    }

    /// Resolve `name` to storage, or to an undefined-name error carrying the
    /// hint an assignment needs to declare it.
    pub fn find(&self, name: Name) -> Result<Found, Value> {
        if let Some(found) = self.pseudo(name) {
            return Ok(found);
        }

        let mut hidden: Option<usize> = None;
        let mut searched_class: Option<String> = None;
        for index in (0..self.frames.len()).rev() {
            let frame = &self.frames[index];
            if frame.kind == FrameKind::Instance {
                if hidden == Some(index) {
                    hidden = frame.skip;
                    continue;
                }
                hidden = frame.skip;
                if let Some(found) = self.instance_member(frame, name) {
                    return Ok(found);
                }
                if searched_class.is_none() {
                    searched_class = frame.receiver_label();
                }
                continue;
            }
            if let Some(target) = frame.binding(name) {
                return Ok(Found::Slot {
                    target,
                    local: frame.kind != FrameKind::Global,
                });
            }
        }

        let scope = searched_class.as_deref().unwrap_or(FrameKind::Global.label());
        let error = undefined_name(name.as_str(), scope);
        Err(Value::pending_error(
            error,
            PendingAssignment {
                name,
                namespace: self.innermost_namespace(),
            },
        ))
    }

    /// What an identifier evaluates to: an alias of the bound cell, a class
    /// member copy, or the lookup error.
    pub fn lookup(&self, name: Name) -> Value {
        match self.find(name) {
            Ok(found) => found.into_value(),
            Err(error) => error,
        }
    }

    fn instance_member(&self, frame: &Frame, name: Name) -> Option<Found> {
        let Store::Instance { receiver, temp } = &frame.store else {
            return None;
        };
        let handle = receiver.resolve().ok()?;
        match find_member(&handle, name) {
            MemberLookup::Found(target) => Some(Found::Slot {
                target,
                local: temp.is_some(),
            }),
            MemberLookup::Temp(value) => Some(Found::Temp(value)),
            MemberLookup::Missing => None,
        }
    }

    /// `this`, `parent` and `global` resolve structurally.
    fn pseudo(&self, name: Name) -> Option<Found> {
        match name.as_str() {
            "this" => {
                let index = self.innermost_instance()?;
                Some(Found::Slot {
                    target: self.frames[index].namespace(),
                    local: false,
                })
            }
            "parent" => {
                let index = self.innermost_instance()?.checked_sub(1)?;
                let frame = &self.frames[index];
                Some(Found::Slot {
                    target: frame.namespace(),
                    local: frame.kind != FrameKind::Global,
                })
            }
            "global" => Some(Found::Slot {
                target: self.global_namespace(),
                local: false,
            }),
            _ => None,
        }
    }

    fn innermost_instance(&self) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|frame| frame.kind == FrameKind::Instance)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy `result` out of `frame` if it aliases storage the frame owns.
///
/// A reference binding (a local slot that itself holds an alias) hands back
/// its own alias instead, so sharing survives the pop.
fn release(frame: &Frame, result: Value) -> Value {
    let Some(target) = result.as_alias() else {
        return result;
    };
    if !frame.owns(target) {
        return result;
    }
    let inner = target
        .upgrade()
        .and_then(|handle| handle.read().as_alias().cloned());
    match inner {
        Some(inner) if !frame.owns(&inner) => {
            Value::alias(inner).with_flags(ValueFlags::LOCAL_ONLY)
        }
        _ => result.deep_copy(),
    }
}
