use serde::{Deserialize, Serialize};

/// Infix operators as named by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOperator {
    // Logical
    And,
    Or,

    // Comparison
    /// `==`
    Equals,
    /// `!=`
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Membership, `x in [..]` or `x in path("a.*")`
    In,
    /// Full text token match
    Match,

    /// `"name": expr` inside an object expression
    Colon,
}

/// Operators written after their operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PostfixOperator {
    Asc,
    Desc,
    /// Dereference, `author->`
    Arrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrefixOperator {
    Not,
}
