//! Loading plan files and checking them against the registry.

use std::path::{Path, PathBuf};

use kite_eval::OperationRegistry;
use kite_ir::Name;
use kite_value::Node;
use rustc_hash::FxHashSet;

/// Failure to load a plan file.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{}' is not a valid plan: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a plan from JSON text.
pub fn parse_plan(text: &str) -> Result<Node, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn load_plan(path: &Path) -> Result<Node, PlanError> {
    let text = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_plan(&text).map_err(|source| PlanError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Operation names used in `plan` that `registry` does not know, in order
/// of first use. Bodies of literal code values are searched too.
pub fn unknown_operations(plan: &Node, registry: &OperationRegistry) -> Vec<Name> {
    let mut seen = FxHashSet::default();
    let mut unknown = Vec::new();
    let mut pending = vec![plan];
    while let Some(node) = pending.pop() {
        match node {
            Node::Ident(_) => {}
            Node::Literal(value) => {
                if let Some(code) = value.as_code() {
                    pending.push(code.body.as_ref());
                }
            }
            Node::Call(call) => {
                if seen.insert(call.op) && !registry.contains(call.op) {
                    unknown.push(call.op);
                }
                pending.extend(call.args.iter().rev());
            }
        }
    }
    unknown
}
