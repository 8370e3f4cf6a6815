//! # Syntax tree accepted by the planner
//!
//! Query text is tokenized and parsed outside this crate. The parser hands
//! over a JSON tree in which every node carries a `node` tag:
//!
//! ```text
//! {"node": "pipeOperator",
//!  "lhs": {"node": "everything"},
//!  "rhs": {"node": "constraint",
//!          "expression": {"node": "binaryOperator", "operator": "equals",
//!                         "lhs": {"node": "attribute", "path": "_type"},
//!                         "rhs": {"node": "string", "value": "post"}}}}
//! ```
//!
//! which is `*[_type == "post"]`. [`Node`] deserializes that form directly
//! and the planner in [`crate::plan`] turns it into an operation tree.
//!
//! - **[node]** - Node kinds and literals
//! - **[operators]** - Binary, prefix and postfix operator names

pub mod node;
pub mod operators;

pub use node::Node;
pub use operators::{BinaryOperator, PostfixOperator, PrefixOperator};
