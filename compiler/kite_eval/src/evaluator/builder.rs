//! `EvaluatorBuilder` for creating evaluators with various configurations.

use std::sync::Arc;

use super::Evaluator;
use crate::concurrency::WorkerControl;
use crate::environment::Environment;
use crate::print_handler::{handler_for, SharedPrintHandler};
use crate::registry::OperationRegistry;
use crate::{EvalConfig, EvalMode, SharedRegistry};

/// Builder for [`Evaluator`].
///
/// The mode picks the starting configuration and print handler:
/// - `EvalMode::Interpret` for `kite run`
/// - `EvalMode::Capture` for tests and embedders reading output back
/// - `EvalMode::Check` for `kite check`
pub struct EvaluatorBuilder {
    mode: EvalMode,
    config: Option<EvalConfig>,
    registry: Option<SharedRegistry<OperationRegistry>>,
    print_handler: Option<SharedPrintHandler>,
    env: Option<Environment>,
}

impl EvaluatorBuilder {
    pub fn new() -> Self {
        Self {
            mode: EvalMode::default(),
            config: None,
            registry: None,
            print_handler: None,
            env: None,
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the mode's configuration.
    #[must_use]
    pub fn config(mut self, config: EvalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing registry instead of building the built-in one.
    #[must_use]
    pub fn registry(mut self, registry: SharedRegistry<OperationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn environment(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    pub fn build(self) -> Evaluator {
        Evaluator {
            env: self.env.unwrap_or_default(),
            registry: self
                .registry
                .unwrap_or_else(|| SharedRegistry::new(OperationRegistry::with_builtins())),
            config: self.config.unwrap_or_else(|| self.mode.config()),
            print: self
                .print_handler
                .unwrap_or_else(|| handler_for(self.mode)),
            control: Arc::new(WorkerControl::new()),
            depth: 0,
            read_only: 0,
        }
    }
}

impl Default for EvaluatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
