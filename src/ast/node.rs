use serde::{Deserialize, Serialize};

use super::operators::{BinaryOperator, PostfixOperator, PrefixOperator};

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum Node {
    /// `a | b`
    PipeOperator { lhs: Box<Node>, rhs: Box<Node> },

    /// `a.b`
    DotOperator { lhs: Box<Node>, rhs: Box<Node> },

    /// `*`, every document in the dataset
    Everything,

    /// `[expr]` following a value; `[]` has no expression
    Constraint {
        #[serde(default)]
        expression: Option<Box<Node>>,
    },

    BinaryOperator {
        operator: BinaryOperator,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },

    PrefixOperator {
        operator: PrefixOperator,
        rhs: Box<Node>,
    },

    PostfixOperator {
        operator: PostfixOperator,
        lhs: Box<Node>,
    },

    /// A bare attribute name
    Attribute {
        #[serde(alias = "path")]
        name: String,
    },

    /// `^`
    Parent,

    Object {
        #[serde(default)]
        expressions: Vec<Node>,
    },

    Array {
        #[serde(default)]
        expressions: Vec<Node>,
    },

    /// `[n]` or `[a..b]` / `[a...b]`
    Subscript { value: Box<Node> },

    Range {
        start: Box<Node>,
        end: Box<Node>,
        #[serde(default)]
        inclusive: bool,
    },

    /// `...` inside an object expression
    Ellipsis,

    FunctionCall {
        name: String,
        #[serde(default)]
        arguments: Vec<Node>,
    },

    /// `$name`, bound from the query parameters at plan time
    Param { name: String },

    Integer { value: i64 },
    Float { value: f64 },
    String { value: String },
    Bool { value: bool },
    Null,
}

impl Node {
    pub fn everything() -> Node {
        Node::Everything
    }

    pub fn attribute(name: &str) -> Node {
        Node::Attribute {
            name: name.to_string(),
        }
    }

    pub fn string(value: &str) -> Node {
        Node::String {
            value: value.to_string(),
        }
    }

    pub fn pipe(lhs: Node, rhs: Node) -> Node {
        Node::PipeOperator {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn constraint(expression: Node) -> Node {
        Node::Constraint {
            expression: Some(Box::new(expression)),
        }
    }

    pub fn binary(operator: BinaryOperator, lhs: Node, rhs: Node) -> Node {
        Node::BinaryOperator {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `*[filter]`
    pub fn filtered_everything(filter: Node) -> Node {
        Node::pipe(Node::everything(), Node::constraint(filter))
    }
}
