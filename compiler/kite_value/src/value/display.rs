//! Textual echo of values.

use std::fmt::{self, Write};

use super::{Member, Value, ValueKind};
use crate::SlotHandle;

/// A value paired with a float precision, ready for `{}` formatting.
pub struct Displayed<'a> {
    value: &'a Value,
    precision: Option<usize>,
}

impl Value {
    /// Display with `precision` digits after the decimal point for floats.
    pub fn display(&self, precision: Option<usize>) -> Displayed<'_> {
        Displayed {
            value: self,
            precision,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, None, false, &mut Vec::new())
    }
}

impl fmt::Display for Displayed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self.value, self.precision, false, &mut Vec::new())
    }
}

/// `path` holds the alias targets being written, outermost first. An alias
/// back into one of them prints as `<cycle>`.
fn write_value(
    f: &mut fmt::Formatter<'_>,
    value: &Value,
    precision: Option<usize>,
    nested: bool,
    path: &mut Vec<SlotHandle>,
) -> fmt::Result {
    match &value.kind {
        ValueKind::Null => f.write_str("null"),
        ValueKind::Bool(b) => write!(f, "{b}"),
        ValueKind::Int(n) => write!(f, "{n}"),
        ValueKind::Float(x) => write_float(f, *x, precision),
        ValueKind::Str(s) if nested => write!(f, "{s:?}"),
        ValueKind::Str(s) => f.write_str(s),
        ValueKind::Bytes(bytes) => {
            f.write_str("0x")?;
            for b in bytes {
                write!(f, "{b:02x}")?;
            }
            Ok(())
        }
        ValueKind::Time(t) => write!(f, "@{}.{:09}", t.secs, t.nanos),
        ValueKind::List(members) => write_members(f, "[", members, "]", precision, path),
        ValueKind::Array(members) => write_members(f, "#[", members, "]", precision, path),
        ValueKind::Tuple(members) => write_members(f, "(", members, ")", precision, path),
        ValueKind::Markup(markup) => {
            write!(f, "<{}", markup.tag)?;
            if !markup.members.is_empty() {
                write_members(f, " ", &markup.members, "", precision, path)?;
            }
            f.write_char('>')
        }
        ValueKind::Object(members) => {
            if let Some(class) = &value.class {
                write!(f, "{}", class.name())?;
            }
            write_members(f, "{", members, "}", precision, path)
        }
        ValueKind::Code(code) => {
            f.write_str("<code(")?;
            for (i, param) in code.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{param}")?;
            }
            f.write_str(")>")
        }
        ValueKind::Class(class) => write!(f, "<class {}>", class.name()),
        ValueKind::Rule(rule) => write!(f, "<rule/{}>", rule.alternatives.len()),
        ValueKind::Error(error) => {
            write!(f, "error({}: {})", error.error.code(), error.error.message)
        }
        ValueKind::Alias(target) => {
            let Ok(handle) = target.resolve() else {
                return f.write_str("<dangling>");
            };
            if path.iter().any(|seen| seen.ptr_eq(&handle)) {
                return f.write_str("<cycle>");
            }
            path.push(handle.clone());
            let result = write_value(f, &handle.read(), precision, nested, path);
            path.pop();
            result
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64, precision: Option<usize>) -> fmt::Result {
    match precision {
        Some(digits) => write!(f, "{x:.digits$}"),
        None if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{x:.1}"),
        None => write!(f, "{x}"),
    }
}

fn write_members(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    members: &[Member],
    close: &str,
    precision: Option<usize>,
    path: &mut Vec<SlotHandle>,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if let Some(name) = member.name {
            write!(f, "{name}: ")?;
        }
        write_value(f, &member.slot.read(), precision, true, path)?;
    }
    f.write_str(close)
}
