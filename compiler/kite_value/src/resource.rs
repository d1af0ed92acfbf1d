//! Resource attachment.
//!
//! Operations that manage something outside the value model (a worker
//! thread, a monitor, a socket) attach it to a value's resource slot. The
//! slot is shared by every copy of that value and the resource is released
//! exactly once, when the last value holding it is dropped.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A collaborator-owned object that can be attached to a value.
pub trait Resource: Any + Send + Sync + fmt::Debug {
    /// Short name used in error messages and displays.
    fn kind(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// Shared attachment point for a [`Resource`].
#[derive(Clone)]
pub struct ResourceSlot(Arc<dyn Resource>);

impl ResourceSlot {
    pub fn new<R: Resource>(resource: R) -> Self {
        ResourceSlot(Arc::new(resource))
    }

    #[inline]
    pub fn kind(&self) -> &'static str {
        self.0.kind()
    }

    /// The attached resource, if it is an `R`.
    pub fn downcast<R: Resource>(&self) -> Option<&R> {
        self.0.as_any().downcast_ref::<R>()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ResourceSlot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of values currently sharing this resource.
    #[inline]
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl fmt::Debug for ResourceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceSlot({:?})", self.0)
    }
}
