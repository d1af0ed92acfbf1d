//! Class descriptors.
//!
//! A class is built once, by the `class` operation or by the intrinsic class
//! table, and never changes afterwards. Instances and lazily bound scalars
//! share it through [`ClassRef`]; reading a member hands out a deep copy, so
//! workers that share a class never need to synchronize on it.

use std::fmt;
use std::sync::Arc;

use kite_ir::Name;

use crate::Value;

/// An immutable class: a name, an optional parent and an ordered member table.
#[derive(Debug)]
pub struct ClassDescriptor {
    name: Name,
    parent: Option<ClassRef>,
    members: Vec<(Name, Value)>,
}

impl ClassDescriptor {
    pub fn new(name: Name, parent: Option<ClassRef>, members: Vec<(Name, Value)>) -> Self {
        ClassDescriptor {
            name,
            parent,
            members,
        }
    }

    #[inline]
    pub fn name(&self) -> Name {
        self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    /// Members declared directly on this class, in declaration order.
    #[inline]
    pub fn members(&self) -> &[(Name, Value)] {
        &self.members
    }
}

/// Shared handle to a class descriptor.
#[derive(Clone)]
pub struct ClassRef(Arc<ClassDescriptor>);

impl ClassRef {
    pub fn new(descriptor: ClassDescriptor) -> Self {
        ClassRef(Arc::new(descriptor))
    }

    #[inline]
    pub fn name(&self) -> Name {
        self.0.name
    }

    #[inline]
    pub fn descriptor(&self) -> &ClassDescriptor {
        &self.0
    }

    #[inline]
    pub fn parent(&self) -> Option<&ClassRef> {
        self.0.parent.as_ref()
    }

    /// This class followed by its ancestors, nearest first.
    pub fn chain(&self) -> impl Iterator<Item = &ClassRef> {
        std::iter::successors(Some(self), |class| class.parent())
    }

    /// Find a member on this class or the nearest ancestor that declares it.
    /// Within one class the last declaration wins.
    pub fn find_member(&self, name: Name) -> Option<(&ClassRef, &Value)> {
        self.chain().find_map(|class| {
            class
                .0
                .members
                .iter()
                .rev()
                .find(|(member, _)| *member == name)
                .map(|(_, value)| (class, value))
        })
    }

    /// Whether this class is `name` or inherits from it.
    pub fn is_a(&self, name: Name) -> bool {
        self.chain().any(|class| class.name() == name)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ClassRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Member-by-member comparison, following both parent chains.
    pub fn structural_eq(&self, other: &ClassRef) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (a, b) = (&self.0, &other.0);
        a.name == b.name
            && a.members.len() == b.members.len()
            && a
                .members
                .iter()
                .zip(&b.members)
                .all(|((na, va), (nb, vb))| na == nb && va.structural_eq(vb))
            && match (&a.parent, &b.parent) {
                (Some(pa), Some(pb)) => pa.structural_eq(pb),
                (None, None) => true,
                _ => false,
            }
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.0.name)
    }
}
