//! Error and control-flow types.
//!
//! Failures are data. An operation that cannot produce its normal result
//! returns an `Error`-kind [`Value`] wrapping an [`EvalError`]; the caller may
//! ignore it, test it with `is-error`, or recover with `try`. The only
//! non-local transfers are [`ControlAction`]s (`break`, `continue`, `return`,
//! cooperative stop), carried in the `Err` arm of [`EvalResult`] up to the
//! boundary that absorbs them.
//!
//! Factory functions populate both `kind` and `message`; prefer them over
//! `EvalError::new` when a structured kind exists.

use std::fmt;

use kite_ir::Name;
use serde::{Deserialize, Serialize};

use crate::slot::SlotRef;
use crate::Value;

/// Result of evaluating a plan node.
pub type EvalResult = Result<Value, ControlAction>;

/// Non-local control transfer.
///
/// These are not failures: each one is absorbed by a designated boundary and
/// never surfaces to the user as an error.
#[derive(Debug)]
pub enum ControlAction {
    /// Leave the innermost loop. The loop's result becomes `null`.
    Break,
    /// Skip to the next iteration of the innermost loop.
    Continue,
    /// Leave the innermost code call with this value.
    Return(Value),
    /// The worker running this evaluator was asked to stop.
    Stop,
}

impl ControlAction {
    /// Short name used in traces and in the error produced when an action
    /// escapes every boundary.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Return(_) => "return",
            Self::Stop => "stop",
        }
    }
}

/// Typed error category.
///
/// Each variant maps to a stable machine-readable [`code`](Self::code) that
/// scripts can match on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalErrorKind {
    // Lookup
    UndefinedName {
        name: String,
        /// Frame or class in which the search terminated.
        scope: String,
    },
    UnknownOperation {
        name: String,
    },
    NoSuchMethod {
        method: String,
        type_name: String,
    },

    // Type
    TypeMismatch {
        expected: String,
        got: String,
    },
    NotCallable {
        type_name: String,
    },
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    // Mutation
    MutationOfConstant {
        target: String,
    },

    // Arithmetic and access
    DivisionByZero,
    IndexOutOfBounds {
        index: i64,
    },

    // References
    DanglingReference,
    AliasCycle,

    // Evaluation limits
    RecursionLimit {
        depth: usize,
    },
    EscapedControl {
        action: String,
    },

    /// Collaborator-reported failure (lock misuse, worker panic, codec, ...).
    Resource {
        code: String,
        detail: String,
    },

    /// Raised explicitly by a script through the `error` operation.
    Raised {
        code: String,
    },

    /// Catch-all for errors without a structured kind.
    Custom {
        message: String,
    },
}

impl EvalErrorKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &str {
        match self {
            Self::UndefinedName { .. } => "undefined-name",
            Self::UnknownOperation { .. } => "unknown-operation",
            Self::NoSuchMethod { .. } => "no-such-method",
            Self::TypeMismatch { .. } => "type-mismatch",
            Self::NotCallable { .. } => "not-callable",
            Self::ArityMismatch { .. } => "arity-mismatch",
            Self::MutationOfConstant { .. } => "mutation-of-constant",
            Self::DivisionByZero => "division-by-zero",
            Self::IndexOutOfBounds { .. } => "index-out-of-bounds",
            Self::DanglingReference => "dangling-reference",
            Self::AliasCycle => "alias-cycle",
            Self::RecursionLimit { .. } => "recursion-limit",
            Self::EscapedControl { .. } => "escaped-control",
            Self::Resource { code, .. } | Self::Raised { code } => code,
            Self::Custom { .. } => "error",
        }
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedName { name, scope } => {
                write!(f, "undefined name `{name}` (searched up to {scope})")
            }
            Self::UnknownOperation { name } => write!(f, "unknown operation `{name}`"),
            Self::NoSuchMethod { method, type_name } => {
                write!(f, "no method `{method}` on {type_name}")
            }
            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Self::NotCallable { type_name } => write!(f, "{type_name} is not callable"),
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                let arg_word = if *expected == 1 {
                    "argument"
                } else {
                    "arguments"
                };
                write!(f, "{name} expects {expected} {arg_word}, got {got}")
            }
            Self::MutationOfConstant { target } => {
                write!(f, "cannot modify constant {target}")
            }
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::IndexOutOfBounds { index } => write!(f, "index {index} out of bounds"),
            Self::DanglingReference => write!(f, "reference outlived its target"),
            Self::AliasCycle => write!(f, "alias chain does not terminate"),
            Self::RecursionLimit { depth } => {
                write!(f, "maximum evaluation depth exceeded (limit: {depth})")
            }
            Self::EscapedControl { action } => {
                write!(f, "`{action}` used outside of an enclosing boundary")
            }
            Self::Resource { code, detail } => write!(f, "{code}: {detail}"),
            Self::Raised { code } => write!(f, "{code}"),
            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Evaluation error carried by `Error`-kind values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalError {
    /// Structured category.
    pub kind: EvalErrorKind,
    /// Human-readable message. Equals `kind.to_string()` unless the error
    /// was raised with an explicit message.
    pub message: String,
}

impl EvalError {
    /// Create an error with just a message (`Custom` kind).
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: EvalErrorKind::Custom {
                message: message.clone(),
            },
            message,
        }
    }

    /// Create an error from a structured kind.
    pub fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self { kind, message }
    }

    /// Machine-readable code.
    #[inline]
    pub fn code(&self) -> &str {
        self.kind.code()
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EvalError {}

/// Where a failed lookup would have declared the missing name.
///
/// Only assignment operations read this; copies, displays and encodings of
/// the error drop it.
#[derive(Clone, Debug)]
pub struct PendingAssignment {
    /// The name that was not found.
    pub name: Name,
    /// Namespace cell (a frame's storage or an instance) that should receive
    /// the new binding.
    pub namespace: SlotRef,
}

/// Payload of an `Error`-kind value.
#[derive(Clone, Debug)]
pub struct ErrorValue {
    pub error: EvalError,
    pending: Option<PendingAssignment>,
}

impl ErrorValue {
    /// An error value without a pending-assignment hint.
    pub fn new(error: EvalError) -> Self {
        Self {
            error,
            pending: None,
        }
    }

    /// A lookup failure that an assignment may complete.
    pub fn with_pending(error: EvalError, pending: PendingAssignment) -> Self {
        Self {
            error,
            pending: Some(pending),
        }
    }

    /// The pending-assignment hint, if this error came from a failed lookup.
    #[inline]
    pub fn pending(&self) -> Option<&PendingAssignment> {
        self.pending.as_ref()
    }

    /// This error without its hint.
    #[must_use]
    pub fn without_pending(&self) -> Self {
        Self::new(self.error.clone())
    }
}

// Lookup Errors

/// A name was not found in any reachable frame.
#[cold]
pub fn undefined_name(name: &str, scope: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedName {
        name: name.to_string(),
        scope: scope.to_string(),
    })
}

/// No operation is registered under this name.
#[cold]
pub fn unknown_operation(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownOperation {
        name: name.to_string(),
    })
}

/// No method with this name on the receiver's class.
#[cold]
pub fn no_such_method(method: &str, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoSuchMethod {
        method: method.to_string(),
        type_name: type_name.to_string(),
    })
}

// Type Errors

/// Operation given an argument of an unsupported kind.
#[cold]
pub fn type_mismatch(expected: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

/// Called a value that is not code.
#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        type_name: type_name.to_string(),
    })
}

/// Wrong number of arguments.
#[cold]
pub fn wrong_arg_count(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

// Mutation Errors

/// Assignment attempted through a constant.
#[cold]
pub fn mutation_of_constant(target: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MutationOfConstant {
        target: target.to_string(),
    })
}

// Arithmetic and Access Errors

/// Division or remainder by zero.
#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

/// Index outside of a container.
#[cold]
pub fn index_out_of_bounds(index: i64) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfBounds { index })
}

// Reference Errors

/// The target of an alias has been released.
#[cold]
pub fn dangling_reference() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DanglingReference)
}

/// An alias chain loops back on itself.
#[cold]
pub fn alias_cycle() -> EvalError {
    EvalError::from_kind(EvalErrorKind::AliasCycle)
}

// Limit Errors

/// Evaluation nested deeper than the configured limit.
#[cold]
pub fn recursion_limit_exceeded(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::RecursionLimit { depth })
}

/// A control action reached the top of an evaluation without being absorbed.
#[cold]
pub fn escaped_control(action: &ControlAction) -> EvalError {
    EvalError::from_kind(EvalErrorKind::EscapedControl {
        action: action.label().to_string(),
    })
}

// Resource Errors

/// Collaborator-reported failure.
#[cold]
pub fn resource_error(code: &str, detail: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Resource {
        code: code.to_string(),
        detail: detail.into(),
    })
}

/// Error raised by a script with its own code and message.
#[cold]
pub fn raised(code: &str, message: impl Into<String>) -> EvalError {
    EvalError {
        kind: EvalErrorKind::Raised {
            code: code.to_string(),
        },
        message: message.into(),
    }
}

#[cfg(test)]
mod tests;
