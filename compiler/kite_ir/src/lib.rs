//! Kite IR - names shared by every layer of the evaluation core.
//!
//! Plans produced by the front end refer to variables, members, classes and
//! operations by [`Name`]. Names are interned once per process so that values
//! moving between worker threads keep meaningful identifiers.

mod interner;
mod name;

pub use interner::{interner, StringInterner};
pub use name::Name;
