//! Planning: syntax tree to operation tree.
//!
//! The [`Composer`] expands syntactic sugar while it walks the tree:
//! dereferences become source scans or map joins, `order()` becomes an
//! [`Operation::Ordering`], unnamed object members get their alias as key.
//! A global filter, when given, is inserted after every source.

mod alias;
mod composer;
mod operation;
mod rewrite;

use std::collections::HashMap;

pub use alias::{to_object_operations, unambiguous_alias};
pub use composer::Composer;
pub use operation::{
    BinaryOp, Direction, Function, ObjectOperation, Operation, PathStep, Pipeline, SortTerm,
    SourceId, Subscript,
};
pub use rewrite::rewrite;

use crate::ast::Node;
use crate::error::PlanError;

/// Plan `root`, scoping every source by `global_filter` when present.
pub fn plan(
    root: &Node,
    global_filter: Option<&Node>,
    params: &HashMap<String, serde_json::Value>,
) -> Result<Operation, PlanError> {
    let mut composer = Composer::new(params);
    let operation = composer.compose(root)?;
    match global_filter {
        Some(filter) => composer.apply_global_filter(operation, filter),
        None => Ok(operation),
    }
}
