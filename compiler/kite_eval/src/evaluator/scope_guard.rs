//! RAII frame guard for the evaluator.
//!
//! [`ScopedEvaluator`] pushes a frame on creation and pops it on drop, so a
//! frame is removed on every exit path including unwinding out of a worker
//! panic. It derefs to [`Evaluator`], so code inside the frame uses it like
//! the evaluator itself.
//!
//! ```text
//! let mut scoped = eval.scoped(FrameKind::Block);
//! let result = scoped.eval_block(body);
//! scoped.release(result)
//! // frame popped here
//! ```

use std::ops::{Deref, DerefMut};

use kite_value::{ControlAction, EvalResult, Value};

use super::Evaluator;
use crate::environment::FrameKind;

/// Guard owning the innermost frame until dropped.
pub struct ScopedEvaluator<'guard> {
    evaluator: &'guard mut Evaluator,
}

impl Drop for ScopedEvaluator<'_> {
    fn drop(&mut self) {
        self.evaluator.env.pop();
    }
}

impl Deref for ScopedEvaluator<'_> {
    type Target = Evaluator;

    fn deref(&self) -> &Self::Target {
        self.evaluator
    }
}

impl DerefMut for ScopedEvaluator<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.evaluator
    }
}

impl ScopedEvaluator<'_> {
    /// Prepare a result to leave this frame: local-only aliases into the
    /// frame become copies. Covers values carried by `return`.
    pub fn release(&self, result: EvalResult) -> EvalResult {
        match result {
            Ok(value) => Ok(self.release_value(value)),
            Err(ControlAction::Return(value)) => {
                Err(ControlAction::Return(self.release_value(value)))
            }
            Err(action) => Err(action),
        }
    }

    pub fn release_value(&self, value: Value) -> Value {
        self.evaluator.env.release(value)
    }
}

impl Evaluator {
    /// Push a frame of `kind`, popped when the guard drops.
    pub fn scoped(&mut self, kind: FrameKind) -> ScopedEvaluator<'_> {
        self.env.push(kind);
        ScopedEvaluator { evaluator: self }
    }

    /// Push an instance frame for `receiver`, popped when the guard drops.
    pub fn scoped_instance(&mut self, receiver: Value) -> ScopedEvaluator<'_> {
        self.env.push_instance(receiver);
        ScopedEvaluator { evaluator: self }
    }
}
