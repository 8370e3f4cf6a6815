use std::fmt;

use serde::Serialize;

use crate::value::Value;

/// Identifies one `*` in a plan. Ids are unique within a single plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Match,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "eq",
            BinaryOp::Neq => "neq",
            BinaryOp::Lt => "lt",
            BinaryOp::Lte => "lte",
            BinaryOp::Gt => "gt",
            BinaryOp::Gte => "gte",
            BinaryOp::In => "in",
            BinaryOp::Match => "match",
        }
    }

    /// The operator that gives the same result with operands swapped.
    pub fn mirrored(self) -> BinaryOp {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::Lte => BinaryOp::Gte,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::Gte => BinaryOp::Lte,
            other => other,
        }
    }
}

/// One step of an accessor path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PathStep {
    /// `^`
    Parent,
    Attribute { name: String },
}

impl PathStep {
    pub fn attribute(name: &str) -> PathStep {
        PathStep::Attribute {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortTerm {
    pub expression: Box<Operation>,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subscript {
    pub start: i64,
    pub end: i64,
    /// Resolve to the single element at `start` instead of a slice
    pub first: bool,
}

/// Built-in functions callable from queries. `order()` is not listed; the
/// planner turns it into [`Operation::Ordering`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Function {
    Path,
    JoinPaths,
    Coalesce,
    Count,
    Length,
    Defined,
    References,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Function> {
        Some(match name {
            "path" => Function::Path,
            "joinPaths" => Function::JoinPaths,
            "coalesce" => Function::Coalesce,
            "count" => Function::Count,
            "length" => Function::Length,
            "defined" => Function::Defined,
            "references" => Function::References,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Path => "path",
            Function::JoinPaths => "joinPaths",
            Function::Coalesce => "coalesce",
            Function::Count => "count",
            Function::Length => "length",
            Function::Defined => "defined",
            Function::References => "references",
        }
    }
}

/// A member of an object expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ObjectOperation {
    Assignment { name: String, value: Operation },
    /// `...`, merges the fields of the current value
    Splat,
}

/// An ordered list of stages. The first stage produces the initial value,
/// every later stage is piped over the result of the one before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    pub operations: Vec<Operation>,
    /// Attribute name used when the pipeline appears unnamed inside an
    /// object expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Pipeline {
    pub fn new(operations: Vec<Operation>) -> Self {
        Pipeline {
            operations,
            alias: None,
        }
    }

    pub fn with_alias(operations: Vec<Operation>, alias: Option<String>) -> Self {
        Pipeline { operations, alias }
    }

    /// The source this pipeline reads from, when it starts with one.
    pub fn source_id(&self) -> Option<SourceId> {
        match self.operations.first() {
            Some(Operation::Source { id }) => Some(*id),
            _ => None,
        }
    }
}

/// Node of the planned operation tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    Source {
        id: SourceId,
    },
    Filter {
        filter: Box<Operation>,
    },
    #[serde(rename = "binary")]
    Binary {
        operator: BinaryOp,
        lhs: Box<Operation>,
        rhs: Box<Operation>,
    },
    Not {
        rhs: Box<Operation>,
    },
    Accessor {
        path: Vec<PathStep>,
    },
    Literal {
        value: Value,
    },
    Object {
        operations: Vec<ObjectOperation>,
    },
    Array {
        operations: Vec<Operation>,
    },
    Assignment {
        name: String,
        value: Box<Operation>,
    },
    Splat,
    Subscript(Subscript),
    Range {
        start: Box<Operation>,
        end: Box<Operation>,
        inclusive: bool,
    },
    Ordering {
        terms: Vec<SortTerm>,
    },
    SortDirection(SortTerm),
    FunctionCall {
        function: Function,
        arguments: Vec<Operation>,
    },
    Pipe(Pipeline),
    /// Looks up documents by the ids the inner pipeline resolves to
    MapJoin {
        pipeline: Box<Pipeline>,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Source { .. } => "source",
            Operation::Filter { .. } => "filter",
            Operation::Binary { operator, .. } => operator.name(),
            Operation::Not { .. } => "not",
            Operation::Accessor { .. } => "accessor",
            Operation::Literal { .. } => "literal",
            Operation::Object { .. } => "object",
            Operation::Array { .. } => "array",
            Operation::Assignment { .. } => "assignment",
            Operation::Splat => "splat",
            Operation::Subscript(_) => "subscript",
            Operation::Range { .. } => "range",
            Operation::Ordering { .. } => "ordering",
            Operation::SortDirection(_) => "sortDirection",
            Operation::FunctionCall { .. } => "functionCall",
            Operation::Pipe(_) => "pipe",
            Operation::MapJoin { .. } => "mapJoin",
        }
    }

    pub fn literal(value: impl Into<Value>) -> Operation {
        Operation::Literal {
            value: value.into(),
        }
    }

    pub fn accessor(path: Vec<PathStep>) -> Operation {
        Operation::Accessor { path }
    }

    pub fn attribute(name: &str) -> Operation {
        Operation::Accessor {
            path: vec![PathStep::attribute(name)],
        }
    }

    pub fn binary(operator: BinaryOp, lhs: Operation, rhs: Operation) -> Operation {
        Operation::Binary {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn filter(filter: Operation) -> Operation {
        Operation::Filter {
            filter: Box::new(filter),
        }
    }

    /// True for an accessor whose first step is `^`.
    pub fn is_parent_accessor(&self) -> bool {
        matches!(self, Operation::Accessor { path } if matches!(path.first(), Some(PathStep::Parent)))
    }
}
