//! Command handlers for the `kite` CLI.
//!
//! Each handler reports its own failures on stderr and exits non-zero;
//! `main` only dispatches.

use std::path::Path;

use kite_eval::{EvalMode, Evaluator, OperationRegistry};
use kite_value::{codec, Node, Value};

use crate::{load_plan, unknown_operations};

/// Settings for `kite run` and `kite encode`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// `--precision=<digits>`: float display precision.
    pub precision: Option<usize>,
    /// `--shares=<n>`: default worker count for parallel operations.
    pub shares: Option<usize>,
}

/// Parse `--precision=<n>` and `--shares=<n>` from `args`.
pub fn parse_run_options(args: &[String]) -> Result<RunOptions, String> {
    let mut options = RunOptions::default();
    for arg in args {
        if let Some(digits) = arg.strip_prefix("--precision=") {
            let digits = digits
                .parse()
                .map_err(|_| format!("invalid precision '{digits}'"))?;
            options.precision = Some(digits);
        } else if let Some(shares) = arg.strip_prefix("--shares=") {
            let shares: usize = shares
                .parse()
                .map_err(|_| format!("invalid share count '{shares}'"))?;
            if shares == 0 {
                return Err("share count must be at least 1".to_string());
            }
            options.shares = Some(shares);
        } else {
            return Err(format!("unknown option '{arg}'"));
        }
    }
    Ok(options)
}

/// An evaluator for `mode` with `options` applied.
pub fn evaluator_for(mode: EvalMode, options: &RunOptions) -> Evaluator {
    let mut config = mode.config();
    config.float_precision = options.precision;
    if let Some(shares) = options.shares {
        config.default_shares = shares;
    }
    Evaluator::builder().mode(mode).config(config).build()
}

fn load_or_exit(path: &str) -> Node {
    match load_plan(Path::new(path)) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

/// Evaluate `plan` and exit non-zero if the result is an error value.
fn evaluate_or_exit(eval: &mut Evaluator, plan: &Node) -> Value {
    let result = eval.run(plan);
    if let Some(error) = result.as_error() {
        eprintln!("error[{}]: {}", error.error.code(), error.error);
        std::process::exit(1);
    }
    result
}

/// `kite run <plan.json>`: evaluate and print a non-null result.
pub fn run_file(path: &str, options: &RunOptions) {
    let plan = load_or_exit(path);
    let mut eval = evaluator_for(EvalMode::Interpret, options);
    let result = evaluate_or_exit(&mut eval, &plan);
    if !result.is_null() {
        println!("{}", eval.render(&result));
    }
}

/// `kite check <plan.json>`: report operations the registry does not know.
pub fn check_file(path: &str) {
    let plan = load_or_exit(path);
    let registry = OperationRegistry::with_builtins();
    let unknown = unknown_operations(&plan, &registry);
    if unknown.is_empty() {
        println!("{path}: ok");
        return;
    }
    for name in &unknown {
        eprintln!("{path}: unknown operation `{name}`");
    }
    std::process::exit(1);
}

/// `kite encode <plan.json> <out>`: evaluate and write the result's byte
/// encoding to `out`.
pub fn encode_file(path: &str, out: &str, options: &RunOptions) {
    let plan = load_or_exit(path);
    let mut eval = evaluator_for(EvalMode::Interpret, options);
    let result = evaluate_or_exit(&mut eval, &plan);
    let bytes = match codec::to_bytes(&result) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = std::fs::write(out, &bytes) {
        eprintln!("error writing '{out}': {e}");
        std::process::exit(1);
    }
    tracing::debug!(bytes = bytes.len(), out, "encoded result");
}

/// `kite decode <file>`: print a value written by `kite encode`.
pub fn decode_file(path: &str) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error reading '{path}': {e}");
            std::process::exit(1);
        }
    };
    match codec::from_bytes(&bytes) {
        Ok(value) => println!("{value}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
