//! Value serialization boundary.
//!
//! Every value kind maps to a [`ValueRepr`], an owned, `serde`-friendly
//! mirror of the value tree. Binary encoding uses `bincode`; plan files use
//! the same representation through any self-describing serde format.
//!
//! The mapping is lossless for everything a value means, with three
//! deliberate exceptions: an alias encodes as a copy of its terminal value,
//! resource slots are not encoded (they wrap live OS objects), and an error's
//! pending-assignment hint is never encoded. A value that reaches itself
//! through an alias has no tree form and fails to encode.

use std::sync::Arc;

use kite_ir::Name;
use num_bigint::BigInt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    ClassDescriptor, ClassRef, EvalError, Member, Node, RuleValue, SlotHandle, TimeValue, Value,
    ValueFlags, ValueKind,
};

/// Failure to encode or decode a value.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode value: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode value: {0}")]
    Decode(#[source] bincode::Error),
    #[error("invalid integer literal `{0}`")]
    InvalidInt(String),
    #[error("cannot encode a value that contains itself")]
    Cycle,
}

/// Encode `value` as bytes.
pub fn to_bytes(value: &Value) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(&ValueRepr::from_value(value)?).map_err(CodecError::Encode)
}

/// Decode a value previously produced by [`to_bytes`].
pub fn from_bytes(bytes: &[u8]) -> Result<Value, CodecError> {
    let repr: ValueRepr = bincode::deserialize(bytes).map_err(CodecError::Decode)?;
    repr.into_value()
}

/// Serializable mirror of a [`Value`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ValueRepr {
    pub kind: KindRepr,
    #[serde(default)]
    pub flags: u8,
    #[serde(default)]
    pub class: Option<ClassRepr>,
}

/// Serializable mirror of a [`ValueKind`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindRepr {
    Null,
    Bool(bool),
    /// Decimal digits, optionally signed.
    Int(String),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    Time { secs: i64, nanos: u32 },
    List(Vec<MemberRepr>),
    Array(Vec<MemberRepr>),
    Tuple(Vec<MemberRepr>),
    Markup { tag: Name, members: Vec<MemberRepr> },
    Code { params: Vec<Name>, body: Box<NodeRepr> },
    Class(ClassRepr),
    Object(Vec<MemberRepr>),
    Rule(RuleValue),
    Error(EvalError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberRepr {
    #[serde(default)]
    pub name: Option<Name>,
    pub value: ValueRepr,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassRepr {
    pub name: Name,
    #[serde(default)]
    pub parent: Option<Box<ClassRepr>>,
    #[serde(default)]
    pub members: Vec<(Name, ValueRepr)>,
}

/// Serializable mirror of a plan [`Node`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRepr {
    Lit(ValueRepr),
    Ident(Name),
    Call {
        op: Name,
        #[serde(default)]
        args: Vec<NodeRepr>,
    },
}

impl ValueRepr {
    /// Mirror `value`, copying through aliases. Fails when an alias leads
    /// back into a cell that is already being encoded.
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        ValueRepr::encode(value, false, &mut Vec::new())
    }

    fn encode(
        value: &Value,
        inherit_const: bool,
        path: &mut Vec<SlotHandle>,
    ) -> Result<Self, CodecError> {
        let inherit = inherit_const || value.is_const();
        if let ValueKind::Alias(target) = &value.kind {
            let Ok(handle) = target.resolve() else {
                return ValueRepr::encode(&value.deep_copy(), inherit, path);
            };
            if path.iter().any(|seen| seen.ptr_eq(&handle)) {
                return Err(CodecError::Cycle);
            }
            path.push(handle.clone());
            let repr = ValueRepr::encode(&handle.read(), inherit, path);
            path.pop();
            return repr;
        }
        let kind = match &value.kind {
            ValueKind::Null | ValueKind::Alias(_) => KindRepr::Null,
            ValueKind::Bool(b) => KindRepr::Bool(*b),
            ValueKind::Int(n) => KindRepr::Int(n.to_string()),
            ValueKind::Float(f) => KindRepr::Float(*f),
            ValueKind::Bytes(b) => KindRepr::Bytes(b.clone()),
            ValueKind::Str(s) => KindRepr::Str(s.clone()),
            ValueKind::Time(t) => KindRepr::Time {
                secs: t.secs,
                nanos: t.nanos,
            },
            ValueKind::List(members) => KindRepr::List(members_repr(members, inherit, path)?),
            ValueKind::Array(members) => KindRepr::Array(members_repr(members, inherit, path)?),
            ValueKind::Tuple(members) => KindRepr::Tuple(members_repr(members, inherit, path)?),
            ValueKind::Markup(markup) => KindRepr::Markup {
                tag: markup.tag,
                members: members_repr(&markup.members, inherit, path)?,
            },
            ValueKind::Code(code) => KindRepr::Code {
                params: code.params.clone(),
                body: Box::new(NodeRepr::from_node(&code.body)?),
            },
            ValueKind::Class(class) => KindRepr::Class(ClassRepr::from_class(class)?),
            ValueKind::Object(members) => KindRepr::Object(members_repr(members, inherit, path)?),
            ValueKind::Rule(rule) => KindRepr::Rule(rule.clone()),
            ValueKind::Error(error) => KindRepr::Error(error.error.clone()),
        };
        // Intrinsic bindings on scalars are rebuilt lazily; only objects
        // carry their class across the boundary.
        let class = match value.kind {
            ValueKind::Object(_) => value.class.as_ref().map(ClassRepr::from_class).transpose()?,
            _ => None,
        };
        Ok(ValueRepr {
            kind,
            flags: value.flags.for_copy(inherit).bits(),
            class,
        })
    }

    pub fn into_value(self) -> Result<Value, CodecError> {
        let kind = match self.kind {
            KindRepr::Null => ValueKind::Null,
            KindRepr::Bool(b) => ValueKind::Bool(b),
            KindRepr::Int(digits) => ValueKind::Int(
                digits
                    .parse::<BigInt>()
                    .map_err(|_| CodecError::InvalidInt(digits.clone()))?,
            ),
            KindRepr::Float(f) => ValueKind::Float(f),
            KindRepr::Bytes(b) => ValueKind::Bytes(b),
            KindRepr::Str(s) => ValueKind::Str(s),
            KindRepr::Time { secs, nanos } => ValueKind::Time(TimeValue { secs, nanos }),
            KindRepr::List(members) => ValueKind::List(members_value(members)?),
            KindRepr::Array(members) => ValueKind::Array(members_value(members)?),
            KindRepr::Tuple(members) => ValueKind::Tuple(members_value(members)?),
            KindRepr::Markup { tag, members } => ValueKind::Markup(crate::MarkupValue {
                tag,
                members: members_value(members)?,
            }),
            KindRepr::Code { params, body } => ValueKind::Code(crate::CodeValue {
                params,
                body: Arc::new(body.into_node()?),
            }),
            KindRepr::Class(class) => ValueKind::Class(class.into_class()?),
            KindRepr::Object(members) => ValueKind::Object(members_value(members)?),
            KindRepr::Rule(rule) => ValueKind::Rule(rule),
            KindRepr::Error(error) => {
                ValueKind::Error(Box::new(crate::ErrorValue::new(error)))
            }
        };
        Ok(Value {
            kind,
            flags: ValueFlags::from_bits_truncate(self.flags)
                - (ValueFlags::LOCAL_ONLY | ValueFlags::NAMESPACE),
            class: self.class.map(ClassRepr::into_class).transpose()?,
            resource: None,
        })
    }
}

impl ClassRepr {
    pub fn from_class(class: &ClassRef) -> Result<Self, CodecError> {
        let parent = match class.parent() {
            Some(parent) => Some(Box::new(ClassRepr::from_class(parent)?)),
            None => None,
        };
        Ok(ClassRepr {
            name: class.name(),
            parent,
            members: class
                .descriptor()
                .members()
                .iter()
                .map(|(name, value)| Ok((*name, ValueRepr::from_value(value)?)))
                .collect::<Result<_, CodecError>>()?,
        })
    }

    pub fn into_class(self) -> Result<ClassRef, CodecError> {
        let parent = self.parent.map(|p| p.into_class()).transpose()?;
        let members = self
            .members
            .into_iter()
            .map(|(name, repr)| Ok((name, repr.into_value()?)))
            .collect::<Result<Vec<_>, CodecError>>()?;
        Ok(ClassRef::new(ClassDescriptor::new(self.name, parent, members)))
    }
}

impl NodeRepr {
    pub fn from_node(node: &Node) -> Result<Self, CodecError> {
        Ok(match node {
            Node::Literal(value) => NodeRepr::Lit(ValueRepr::from_value(value)?),
            Node::Ident(name) => NodeRepr::Ident(*name),
            Node::Call(call) => NodeRepr::Call {
                op: call.op,
                args: call
                    .args
                    .iter()
                    .map(NodeRepr::from_node)
                    .collect::<Result<_, _>>()?,
            },
        })
    }

    pub fn into_node(self) -> Result<Node, CodecError> {
        Ok(match self {
            NodeRepr::Lit(value) => Node::Literal(value.into_value()?),
            NodeRepr::Ident(name) => Node::Ident(name),
            NodeRepr::Call { op, args } => Node::Call(crate::CallNode::new(
                op,
                args.into_iter()
                    .map(NodeRepr::into_node)
                    .collect::<Result<_, _>>()?,
            )),
        })
    }
}

fn members_repr(
    members: &[Member],
    inherit_const: bool,
    path: &mut Vec<SlotHandle>,
) -> Result<Vec<MemberRepr>, CodecError> {
    members
        .iter()
        .map(|member| {
            Ok(MemberRepr {
                name: member.name,
                value: ValueRepr::encode(&member.slot.read(), inherit_const, path)?,
            })
        })
        .collect()
}

fn members_value(members: Vec<MemberRepr>) -> Result<Vec<Member>, CodecError> {
    members
        .into_iter()
        .map(|member| Ok(Member::new(member.name, member.value.into_value()?)))
        .collect()
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ValueRepr::from_value(self)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ValueRepr::deserialize(deserializer)?
            .into_value()
            .map_err(serde::de::Error::custom)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeRepr::from_node(self)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        NodeRepr::deserialize(deserializer)?
            .into_node()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests;
