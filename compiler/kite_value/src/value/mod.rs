//! Runtime values for the Kite evaluation core.
//!
//! # Ownership
//!
//! A [`Value`] owns its payload outright. Composite kinds own one [`Slot`]
//! per member, so members are individually addressable (an alias can point
//! at `list[2]`) without the list itself being shared. `Value` is not
//! `Clone`: duplicating content is always an explicit [`Value::deep_copy`],
//! and sharing is always an explicit [`ValueKind::Alias`].
//!
//! # Aliases
//!
//! An alias carries a [`SlotRef`] to another cell. Consumers never act on an
//! alias directly; they go through [`Value::with_resolved`] or
//! [`Value::materialize`], which follow the chain to the terminal value.
//!
//! # Thread Safety
//!
//! Every part of a value is `Send + Sync`. Member cells use `parking_lot`
//! read-write locks and class descriptors are immutable, so values can move
//! into worker threads and the shared global frame can be read from several
//! workers at once.

mod display;

use std::sync::Arc;

use kite_ir::Name;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::errors::{ErrorValue, EvalError, PendingAssignment};
use crate::{ClassRef, Node, ResourceSlot, RuleValue, Slot, SlotHandle, SlotRef, ValueFlags};

pub use display::Displayed;

/// Wall-clock instant, seconds and nanoseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeValue {
    pub secs: i64,
    pub nanos: u32,
}

impl TimeValue {
    pub fn now() -> Self {
        let elapsed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        TimeValue {
            secs: i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
            nanos: elapsed.subsec_nanos(),
        }
    }

    /// Milliseconds since the epoch.
    pub fn as_millis(self) -> i128 {
        i128::from(self.secs) * 1000 + i128::from(self.nanos / 1_000_000)
    }
}

/// A structured markup node: a tag plus named and unnamed members.
#[derive(Debug)]
pub struct MarkupValue {
    pub tag: Name,
    pub members: Vec<Member>,
}

/// An executable fragment: parameter names and a shared plan body.
#[derive(Clone, Debug)]
pub struct CodeValue {
    pub params: Vec<Name>,
    pub body: Arc<Node>,
}

/// A named or unnamed child of a composite value.
#[derive(Debug)]
pub struct Member {
    pub name: Option<Name>,
    pub slot: Slot,
}

impl Member {
    pub fn new(name: Option<Name>, value: Value) -> Self {
        Member {
            name,
            slot: Slot::new(value),
        }
    }

    pub fn named(name: Name, value: Value) -> Self {
        Self::new(Some(name), value)
    }

    pub fn unnamed(value: Value) -> Self {
        Self::new(None, value)
    }

    /// An independent copy of this member.
    ///
    /// Alias members are copied as aliases: the copy points at the same
    /// target and owns nothing.
    fn copy(&self, inherit_const: bool) -> Member {
        let content = self.slot.read();
        let value = match &content.kind {
            ValueKind::Alias(target) => Value {
                kind: ValueKind::Alias(target.clone()),
                flags: content.flags.for_copy(inherit_const),
                class: None,
                resource: None,
            },
            _ => content.copy_inheriting(inherit_const),
        };
        Member::new(self.name, value)
    }
}

/// The active representation of a value.
#[derive(Debug)]
pub enum ValueKind {
    Null,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    Time(TimeValue),
    /// Ordered, growable.
    List(Vec<Member>),
    /// Fixed length; elements may be replaced but not added or removed.
    Array(Vec<Member>),
    Tuple(Vec<Member>),
    Markup(MarkupValue),
    Code(CodeValue),
    Class(ClassRef),
    /// Object instance. The class lives in [`Value::class`].
    Object(Vec<Member>),
    Rule(RuleValue),
    Error(Box<ErrorValue>),
    /// Internal: non-owning reference to another cell.
    Alias(SlotRef),
}

/// Runtime value.
#[derive(Debug)]
pub struct Value {
    pub kind: ValueKind,
    pub flags: ValueFlags,
    /// Class of an object, or the intrinsic class a scalar was bound to the
    /// first time a method was looked up on it.
    pub class: Option<ClassRef>,
    pub resource: Option<ResourceSlot>,
}

impl From<ValueKind> for Value {
    #[inline]
    fn from(kind: ValueKind) -> Self {
        Value {
            kind,
            flags: ValueFlags::empty(),
            class: None,
            resource: None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::null()
    }
}

// Factory Methods

impl Value {
    #[inline]
    pub fn null() -> Self {
        ValueKind::Null.into()
    }

    #[inline]
    pub fn bool(b: bool) -> Self {
        ValueKind::Bool(b).into()
    }

    #[inline]
    pub fn int(n: i64) -> Self {
        ValueKind::Int(BigInt::from(n)).into()
    }

    #[inline]
    pub fn big_int(n: BigInt) -> Self {
        ValueKind::Int(n).into()
    }

    #[inline]
    pub fn float(f: f64) -> Self {
        ValueKind::Float(f).into()
    }

    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        ValueKind::Str(s.into()).into()
    }

    #[inline]
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        ValueKind::Bytes(b.into()).into()
    }

    #[inline]
    pub fn time(t: TimeValue) -> Self {
        ValueKind::Time(t).into()
    }

    pub fn list(items: Vec<Value>) -> Self {
        ValueKind::List(items.into_iter().map(Member::unnamed).collect()).into()
    }

    pub fn array(items: Vec<Value>) -> Self {
        ValueKind::Array(items.into_iter().map(Member::unnamed).collect()).into()
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        ValueKind::Tuple(items.into_iter().map(Member::unnamed).collect()).into()
    }

    pub fn markup(tag: Name, members: Vec<Member>) -> Self {
        ValueKind::Markup(MarkupValue { tag, members }).into()
    }

    pub fn code(params: Vec<Name>, body: Arc<Node>) -> Self {
        ValueKind::Code(CodeValue { params, body }).into()
    }

    pub fn class_value(class: ClassRef) -> Self {
        ValueKind::Class(class).into()
    }

    /// An object with the given class and named fields.
    pub fn object(class: Option<ClassRef>, fields: Vec<(Name, Value)>) -> Self {
        let members = fields
            .into_iter()
            .map(|(name, value)| Member::named(name, value))
            .collect();
        Value {
            class,
            ..Value::from(ValueKind::Object(members))
        }
    }

    pub fn rule(rule: RuleValue) -> Self {
        ValueKind::Rule(rule).into()
    }

    #[cold]
    pub fn error(error: EvalError) -> Self {
        ValueKind::Error(Box::new(ErrorValue::new(error))).into()
    }

    /// A lookup failure an assignment may complete.
    #[cold]
    pub fn pending_error(error: EvalError, pending: PendingAssignment) -> Self {
        ValueKind::Error(Box::new(ErrorValue::with_pending(error, pending))).into()
    }

    #[inline]
    pub fn alias(target: SlotRef) -> Self {
        ValueKind::Alias(target).into()
    }

    /// Same value with `CONST` set.
    #[must_use]
    pub fn into_const(mut self) -> Self {
        self.flags |= ValueFlags::CONST;
        self
    }

    /// Same value with `flags` added.
    #[must_use]
    pub fn with_flags(mut self, flags: ValueFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource: ResourceSlot) -> Self {
        self.resource = Some(resource);
        self
    }
}

// Inspection

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    #[inline]
    pub fn is_alias(&self) -> bool {
        matches!(self.kind, ValueKind::Alias(_))
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self.kind, ValueKind::Error(_))
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.flags.contains(ValueFlags::CONST)
    }

    #[inline]
    pub fn is_local_only(&self) -> bool {
        self.flags.contains(ValueFlags::LOCAL_ONLY)
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match &self.kind {
            ValueKind::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&SlotRef> {
        match &self.kind {
            ValueKind::Alias(target) => Some(target),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match &self.kind {
            ValueKind::Int(n) => n.to_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match &self.kind {
            ValueKind::Float(f) => Some(*f),
            ValueKind::Int(n) => Some(n.to_f64().unwrap_or(f64::NAN)),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&CodeValue> {
        match &self.kind {
            ValueKind::Code(code) => Some(code),
            _ => None,
        }
    }

    /// Members of a composite value.
    pub fn members(&self) -> Option<&[Member]> {
        match &self.kind {
            ValueKind::List(members)
            | ValueKind::Array(members)
            | ValueKind::Tuple(members)
            | ValueKind::Object(members)
            | ValueKind::Markup(MarkupValue { members, .. }) => Some(members),
            _ => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut Vec<Member>> {
        match &mut self.kind {
            ValueKind::List(members)
            | ValueKind::Array(members)
            | ValueKind::Tuple(members)
            | ValueKind::Object(members)
            | ValueKind::Markup(MarkupValue { members, .. }) => Some(members),
            _ => None,
        }
    }

    /// The last member named `name`; later members shadow earlier ones.
    pub fn member(&self, name: Name) -> Option<&Member> {
        self.members()?
            .iter()
            .rev()
            .find(|member| member.name == Some(name))
    }

    /// Language-level type name.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ValueKind::Null => "null",
            ValueKind::Bool(_) => "bool",
            ValueKind::Int(_) => "int",
            ValueKind::Float(_) => "float",
            ValueKind::Bytes(_) => "bytes",
            ValueKind::Str(_) => "string",
            ValueKind::Time(_) => "time",
            ValueKind::List(_) => "list",
            ValueKind::Array(_) => "array",
            ValueKind::Tuple(_) => "tuple",
            ValueKind::Markup(_) => "markup",
            ValueKind::Code(_) => "code",
            ValueKind::Class(_) => "class",
            ValueKind::Object(_) => "object",
            ValueKind::Rule(_) => "rule",
            ValueKind::Error(_) => "error",
            ValueKind::Alias(_) => "alias",
        }
    }

    /// Truthiness: not null, not `false`, not a zero or empty scalar, and not
    /// an error. Composites are always true.
    pub fn is_truthy(&self) -> bool {
        match &self.kind {
            ValueKind::Null | ValueKind::Error(_) => false,
            ValueKind::Bool(b) => *b,
            ValueKind::Int(n) => !n.is_zero(),
            ValueKind::Float(f) => *f != 0.0 && !f.is_nan(),
            ValueKind::Str(s) => !s.is_empty(),
            ValueKind::Bytes(b) => !b.is_empty(),
            ValueKind::Alias(_) => self.with_resolved(Value::is_truthy).unwrap_or(false),
            _ => true,
        }
    }
}

// Copy and Resolution

impl Value {
    /// A structurally independent copy.
    ///
    /// Resolves an alias chain first. `CONST` is inherited by every
    /// descendant, `LOCAL_ONLY` is dropped, the class reference is kept and
    /// the resource slot is shared. A dangling alias copies to an error value.
    #[must_use]
    pub fn deep_copy(&self) -> Value {
        self.copy_inheriting(false)
    }

    fn copy_inheriting(&self, inherit_const: bool) -> Value {
        let inherit = inherit_const || self.is_const();
        let kind = match &self.kind {
            ValueKind::Alias(target) => {
                return match target.resolve() {
                    Ok(handle) => handle.read().copy_inheriting(inherit),
                    Err(error) => Value::error(error),
                };
            }
            ValueKind::Null => ValueKind::Null,
            ValueKind::Bool(b) => ValueKind::Bool(*b),
            ValueKind::Int(n) => ValueKind::Int(n.clone()),
            ValueKind::Float(f) => ValueKind::Float(*f),
            ValueKind::Bytes(b) => ValueKind::Bytes(b.clone()),
            ValueKind::Str(s) => ValueKind::Str(s.clone()),
            ValueKind::Time(t) => ValueKind::Time(*t),
            ValueKind::List(members) => ValueKind::List(copy_members(members, inherit)),
            ValueKind::Array(members) => ValueKind::Array(copy_members(members, inherit)),
            ValueKind::Tuple(members) => ValueKind::Tuple(copy_members(members, inherit)),
            ValueKind::Object(members) => ValueKind::Object(copy_members(members, inherit)),
            ValueKind::Markup(markup) => ValueKind::Markup(MarkupValue {
                tag: markup.tag,
                members: copy_members(&markup.members, inherit),
            }),
            ValueKind::Code(code) => ValueKind::Code(code.clone()),
            ValueKind::Class(class) => ValueKind::Class(class.clone()),
            ValueKind::Rule(rule) => ValueKind::Rule(rule.clone()),
            ValueKind::Error(error) => ValueKind::Error(Box::new(error.without_pending())),
        };
        Value {
            kind,
            flags: self.flags.for_copy(inherit),
            class: self.class.clone(),
            resource: self.resource.clone(),
        }
    }

    /// Run `f` on the terminal value of an alias chain, or on `self`.
    pub fn with_resolved<R>(&self, f: impl FnOnce(&Value) -> R) -> Result<R, EvalError> {
        match &self.kind {
            ValueKind::Alias(target) => {
                let handle = target.resolve()?;
                let guard = handle.read();
                Ok(f(&guard))
            }
            _ => Ok(f(self)),
        }
    }

    /// An owned, non-alias value.
    ///
    /// Temporaries are returned as they are (minus any pending-assignment
    /// hint); aliases are replaced by a deep copy of their terminal value.
    #[must_use]
    pub fn materialize(self) -> Value {
        match self.kind {
            ValueKind::Alias(_) => self.deep_copy(),
            ValueKind::Error(error) if error.pending().is_some() => Value {
                kind: ValueKind::Error(Box::new(error.without_pending())),
                ..self
            },
            _ => self,
        }
    }

    /// Structural equality: same kind, payload and ordered members,
    /// recursively, after resolving aliases on both sides. Flags, resources
    /// and lazily bound intrinsic classes are not compared.
    ///
    /// Values that reach themselves through aliases compare equal when both
    /// sides unfold the same way.
    pub fn structural_eq(&self, other: &Value) -> bool {
        self.eq_along(other, &mut Vec::new())
    }

    /// `path` holds the pairs of member cells under comparison. Meeting a
    /// pair again closes a loop with nothing unequal found on it.
    fn eq_along(&self, other: &Value, path: &mut Vec<(SlotHandle, SlotHandle)>) -> bool {
        if self.is_alias() || other.is_alias() {
            return self
                .with_resolved(|a| other.with_resolved(|b| a.eq_along(b, path)).unwrap_or(false))
                .unwrap_or(false);
        }
        match (&self.kind, &other.kind) {
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Int(b)) => a == b,
            (ValueKind::Float(a), ValueKind::Float(b)) => a.to_bits() == b.to_bits() || a == b,
            (ValueKind::Bytes(a), ValueKind::Bytes(b)) => a == b,
            (ValueKind::Str(a), ValueKind::Str(b)) => a == b,
            (ValueKind::Time(a), ValueKind::Time(b)) => a == b,
            (ValueKind::List(a), ValueKind::List(b))
            | (ValueKind::Array(a), ValueKind::Array(b))
            | (ValueKind::Tuple(a), ValueKind::Tuple(b)) => members_eq(a, b, path),
            (ValueKind::Object(a), ValueKind::Object(b)) => {
                let same_class = match (&self.class, &other.class) {
                    (Some(ca), Some(cb)) => ca.name() == cb.name(),
                    (None, None) => true,
                    _ => false,
                };
                same_class && members_eq(a, b, path)
            }
            (ValueKind::Markup(a), ValueKind::Markup(b)) => {
                a.tag == b.tag && members_eq(&a.members, &b.members, path)
            }
            (ValueKind::Code(a), ValueKind::Code(b)) => {
                a.params == b.params
                    && (Arc::ptr_eq(&a.body, &b.body) || a.body.structural_eq(&b.body))
            }
            (ValueKind::Class(a), ValueKind::Class(b)) => a.structural_eq(b),
            (ValueKind::Rule(a), ValueKind::Rule(b)) => a == b,
            (ValueKind::Error(a), ValueKind::Error(b)) => a.error == b.error,
            _ => false,
        }
    }
}

fn copy_members(members: &[Member], inherit_const: bool) -> Vec<Member> {
    members
        .iter()
        .map(|member| member.copy(inherit_const))
        .collect()
}

fn members_eq(a: &[Member], b: &[Member], path: &mut Vec<(SlotHandle, SlotHandle)>) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            if x.name != y.name {
                return false;
            }
            let (hx, hy) = (x.slot.handle(), y.slot.handle());
            if path
                .iter()
                .any(|(px, py)| px.ptr_eq(&hx) && py.ptr_eq(&hy))
            {
                return true;
            }
            path.push((hx.clone(), hy.clone()));
            let equal = {
                let (vx, vy) = (hx.read(), hy.read());
                vx.eq_along(&vy, path)
            };
            path.pop();
            equal
        })
}

#[cfg(test)]
mod tests;
