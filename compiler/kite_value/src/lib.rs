//! Kite value model.
//!
//! This crate defines everything the evaluator manipulates:
//!
//! - [`Value`] / [`ValueKind`]: the tagged runtime datum
//! - [`Slot`], [`SlotRef`], [`SlotHandle`]: owned cells, aliases and leases
//! - [`assign`]: replace / append / extend with constant checking
//! - [`EvalError`], [`ControlAction`], [`EvalResult`]: failures as data and
//!   non-local control transfer
//! - [`ClassRef`], [`ResourceSlot`], [`RuleValue`]: shared attachments
//! - [`Node`]: the plan tree
//! - [`codec`]: the serialization boundary

mod assign;
mod class;
pub mod codec;
mod errors;
mod flags;
pub mod numeric;
mod plan;
mod resource;
mod rule;
mod slot;
mod value;

pub use assign::{assign, terminal, AssignMode};
pub use class::{ClassDescriptor, ClassRef};
pub use errors::{
    alias_cycle, dangling_reference, division_by_zero, escaped_control, index_out_of_bounds,
    mutation_of_constant, no_such_method, not_callable, raised, recursion_limit_exceeded,
    resource_error, type_mismatch, undefined_name, unknown_operation, wrong_arg_count,
    ControlAction, ErrorValue, EvalError, EvalErrorKind, EvalResult, PendingAssignment,
};
pub use flags::ValueFlags;
pub use kite_ir::Name;
pub use plan::{CallNode, Node};
pub use resource::{Resource, ResourceSlot};
pub use rule::{CharClass, RuleTerm, RuleValue};
pub use slot::{Slot, SlotHandle, SlotRef, MAX_ALIAS_HOPS};
pub use value::{CodeValue, Displayed, MarkupValue, Member, TimeValue, Value, ValueKind};
