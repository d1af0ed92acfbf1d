//! Per-value flags.
//!
//! Only the flags that are not already implied by the value's kind live
//! here: `Null` is a kind, an assignable reference is an `Alias`, and an
//! abort is the `Err(ControlAction)` arm of an evaluation result.

use bitflags::bitflags;

bitflags! {
    /// Mutability and escape flags carried by every value.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ValueFlags: u8 {
        /// Assignment through this value is rejected. Inherited by every
        /// descendant when the value is copied.
        const CONST = 1 << 0;
        /// Reference may not escape the frame that produced it. Only
        /// meaningful on aliases; dropped by copies.
        const LOCAL_ONLY = 1 << 1;
        /// Frame storage. Only an object may replace it. Dropped by copies.
        const NAMESPACE = 1 << 2;
    }
}

impl ValueFlags {
    /// Flags a copy of a value with these flags receives.
    #[inline]
    #[must_use]
    pub fn for_copy(self, inherit_const: bool) -> Self {
        let mut flags = self - (ValueFlags::LOCAL_ONLY | ValueFlags::NAMESPACE);
        if inherit_const {
            flags |= ValueFlags::CONST;
        }
        flags
    }
}
