//! Evaluator configuration.
//!
//! Everything an operation may consult about "how to evaluate" lives in
//! [`EvalConfig`] and is reached through the evaluator that runs it. Workers
//! inherit a copy of their parent's configuration.

/// Tunables threaded through every evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalConfig {
    /// Digits after the decimal point when floats are displayed. `None`
    /// prints the shortest exact representation.
    pub float_precision: Option<usize>,
    /// Maximum nesting of plan evaluation and code calls.
    pub max_depth: usize,
    /// Whether operations with a fold step may be folded once per node.
    pub fold_constants: bool,
    /// Worker count for parallel operations when the plan gives none.
    pub default_shares: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalMode::default().config()
    }
}

/// Evaluation presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// `kite run`: output to stdout, folding enabled.
    #[default]
    Interpret,
    /// Tests and embedders that inspect output: output captured in a buffer,
    /// tighter depth limit so runaway recursion fails fast.
    Capture,
    /// `kite check`: no output, no folding.
    Check,
}

impl EvalMode {
    /// The configuration this mode starts from.
    pub fn config(self) -> EvalConfig {
        EvalConfig {
            float_precision: None,
            max_depth: self.max_depth(),
            fold_constants: !matches!(self, Self::Check),
            default_shares: 1,
        }
    }

    /// Maximum evaluation depth.
    ///
    /// Native builds grow the stack on demand, so the limit only guards
    /// against runaway recursion. WASM has a fixed stack.
    #[inline]
    pub fn max_depth(self) -> usize {
        match self {
            Self::Interpret => {
                #[cfg(target_arch = "wasm32")]
                {
                    200
                }
                #[cfg(not(target_arch = "wasm32"))]
                {
                    10_000
                }
            }
            Self::Capture => 1_000,
            Self::Check => 256,
        }
    }

    /// Whether `print` reaches the process's stdout.
    #[inline]
    pub fn writes_stdout(self) -> bool {
        matches!(self, Self::Interpret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_interpret() {
        assert_eq!(EvalConfig::default(), EvalMode::Interpret.config());
        assert!(EvalConfig::default().fold_constants);
        assert_eq!(EvalConfig::default().default_shares, 1);
    }

    #[test]
    fn test_check_mode_disables_folding() {
        assert!(!EvalMode::Check.config().fold_constants);
        assert!(!EvalMode::Check.writes_stdout());
    }

    #[test]
    fn test_capture_mode_has_tighter_depth() {
        assert!(EvalMode::Capture.max_depth() < EvalMode::Interpret.max_depth());
    }
}
