//! Kite command-line driver.
//!
//! Plans are JSON documents in the serde shape of a plan node:
//!
//! ```text
//! {"call": {"op": "print", "args": [{"lit": {"kind": {"str": "hi"}}}]}}
//! ```
//!
//! The binary is `kite`; this library holds the pieces it is built from so
//! they can be tested without spawning a process.

pub mod commands;
mod plan;

pub use plan::{load_plan, parse_plan, unknown_operations, PlanError};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the tree-formatted tracing subscriber.
///
/// Only when `RUST_LOG` is set, e.g. `RUST_LOG=kite_eval=debug`. Safe to
/// call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(EnvFilter::from_default_env())
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .init();
        }
    });
}

#[cfg(test)]
mod tests;
