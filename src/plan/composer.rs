use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{BinaryOperator, Node, PostfixOperator, PrefixOperator};
use crate::error::PlanError;
use crate::value::Value;

use super::alias::{to_object_operations, unambiguous_alias};
use super::operation::{
    BinaryOp, Direction, Function, Operation, PathStep, Pipeline, SortTerm, SourceId, Subscript,
};
use super::rewrite::rewrite;

/// Turns a syntax tree into an operation tree.
///
/// A composer owns the source id counter for one plan, so ids are unique
/// within the plan and planning never touches shared state.
pub struct Composer<'a> {
    params: &'a HashMap<String, serde_json::Value>,
    next_source_id: u32,
}

impl<'a> Composer<'a> {
    pub fn new(params: &'a HashMap<String, serde_json::Value>) -> Self {
        Composer {
            params,
            next_source_id: 1,
        }
    }

    fn new_source(&mut self) -> Operation {
        let id = SourceId(self.next_source_id);
        self.next_source_id += 1;
        Operation::Source { id }
    }

    pub fn compose(&mut self, node: &Node) -> Result<Operation, PlanError> {
        match node {
            Node::PipeOperator { lhs, rhs } => {
                let lhs = self.compose(lhs)?;
                let rhs = self.compose(rhs)?;
                Ok(pipe_operator(lhs, rhs))
            }
            Node::DotOperator { lhs, rhs } => {
                let lhs = self.compose(lhs)?;
                let rhs = self.compose(rhs)?;
                Ok(dot_operator(lhs, rhs))
            }
            Node::Everything => Ok(Operation::Pipe(Pipeline::new(vec![self.new_source()]))),
            Node::Constraint { expression } => {
                let filter = match expression {
                    Some(expression) => self.compose(expression)?,
                    None => Operation::literal(true),
                };
                Ok(Operation::filter(filter))
            }
            Node::BinaryOperator { operator, lhs, rhs } => {
                let lhs = self.compose(lhs)?;
                let rhs = self.compose(rhs)?;
                binary_operator(*operator, lhs, rhs)
            }
            Node::PrefixOperator { operator, rhs } => {
                let rhs = self.compose(rhs)?;
                match operator {
                    PrefixOperator::Not => Ok(Operation::Not { rhs: Box::new(rhs) }),
                }
            }
            Node::PostfixOperator { operator, lhs } => {
                let lhs = self.compose(lhs)?;
                Ok(self.postfix_operator(*operator, lhs))
            }
            Node::Attribute { name } => Ok(Operation::attribute(name)),
            Node::Parent => Ok(Operation::accessor(vec![PathStep::Parent])),
            Node::Object { expressions } => {
                let members = self.compose_all(expressions)?;
                Ok(Operation::Object {
                    operations: to_object_operations(members)?,
                })
            }
            Node::Array { expressions } => Ok(Operation::Array {
                operations: self.compose_all(expressions)?,
            }),
            Node::Subscript { value } => self.subscript(value),
            Node::Range {
                start,
                end,
                inclusive,
            } => Ok(Operation::Range {
                start: Box::new(self.compose(start)?),
                end: Box::new(self.compose(end)?),
                inclusive: *inclusive,
            }),
            Node::Ellipsis => Ok(Operation::Splat),
            Node::FunctionCall { name, arguments } => {
                let arguments = self.compose_all(arguments)?;
                function_call(name, arguments)
            }
            Node::Param { name } => match self.params.get(name) {
                Some(value) => Ok(Operation::literal(Value::from(value.clone()))),
                None => Err(PlanError::UnknownParameter(name.clone())),
            },
            Node::Integer { value } => Ok(Operation::literal(*value)),
            Node::Float { value } => Ok(Operation::literal(Value::Float(*value))),
            Node::String { value } => Ok(Operation::literal(value.as_str())),
            Node::Bool { value } => Ok(Operation::literal(*value)),
            Node::Null => Ok(Operation::literal(Value::Null)),
        }
    }

    fn compose_all(&mut self, nodes: &[Node]) -> Result<Vec<Operation>, PlanError> {
        nodes.iter().map(|node| self.compose(node)).collect()
    }

    fn subscript(&mut self, value: &Node) -> Result<Operation, PlanError> {
        if let Node::Range {
            start,
            end,
            inclusive,
        } = value
        {
            let start = self.integer_bound(start)?;
            let end = self.integer_bound(end)?;
            let end = if *inclusive { past(end)? } else { end };
            return Ok(Operation::Subscript(Subscript {
                start,
                end,
                first: false,
            }));
        }
        let index = self.integer_bound(value)?;
        Ok(Operation::Subscript(Subscript {
            start: index,
            end: past(index)?,
            first: true,
        }))
    }

    fn integer_bound(&mut self, node: &Node) -> Result<i64, PlanError> {
        match self.compose(node)? {
            Operation::Literal {
                value: Value::Integer(n),
            } => Ok(n),
            other => Err(PlanError::InvalidSubscript(other.kind().to_string())),
        }
    }

    fn postfix_operator(&mut self, operator: PostfixOperator, lhs: Operation) -> Operation {
        match operator {
            PostfixOperator::Asc => Operation::SortDirection(sort_term(lhs, Direction::Asc)),
            PostfixOperator::Desc => Operation::SortDirection(sort_term(lhs, Direction::Desc)),
            PostfixOperator::Arrow => self.dereference(lhs),
        }
    }

    /// Expand `x->` and `x[]->`.
    fn dereference(&mut self, lhs: Operation) -> Operation {
        let alias = unambiguous_alias(&lhs);
        match lhs {
            // x->  becomes  *[^.x._ref == _id][0]
            Operation::Accessor { path } => {
                let mut reference = Vec::with_capacity(path.len() + 2);
                reference.push(PathStep::Parent);
                reference.extend(path);
                reference.push(PathStep::attribute("_ref"));
                Operation::Pipe(Pipeline::with_alias(
                    vec![
                        self.new_source(),
                        Operation::filter(Operation::binary(
                            BinaryOp::Eq,
                            Operation::accessor(reference),
                            Operation::attribute("_id"),
                        )),
                        Operation::Subscript(Subscript {
                            start: 0,
                            end: 1,
                            first: true,
                        }),
                    ],
                    alias,
                ))
            }
            // x[]->  becomes a map join over x[]._ref
            Operation::Pipe(pipeline) => {
                let mut ids = pipeline.operations;
                ids.push(Operation::attribute("_ref"));
                Operation::Pipe(Pipeline::with_alias(
                    vec![
                        self.new_source(),
                        Operation::MapJoin {
                            pipeline: Box::new(Pipeline::new(ids)),
                        },
                    ],
                    alias,
                ))
            }
            other => {
                trace!(kind = other.kind(), "dereference of non-reference yields null");
                Operation::Pipe(Pipeline::new(vec![Operation::literal(Value::Null)]))
            }
        }
    }

    /// Insert `filter` after every source in every pipeline of `operation`.
    pub fn apply_global_filter(
        &mut self,
        operation: Operation,
        filter: &Node,
    ) -> Result<Operation, PlanError> {
        let filter = self.compose(filter)?;
        debug!(?filter, "applying global filter");
        rewrite(operation, &mut |op| {
            Ok(match op {
                Operation::Pipe(pipeline) => {
                    let mut operations = Vec::with_capacity(pipeline.operations.len() + 1);
                    for stage in pipeline.operations {
                        let is_source = matches!(stage, Operation::Source { .. });
                        operations.push(stage);
                        if is_source {
                            operations.push(Operation::filter(filter.clone()));
                        }
                    }
                    Operation::Pipe(Pipeline::with_alias(operations, pipeline.alias))
                }
                other => other,
            })
        })
    }
}

/// The exclusive bound just past `bound`.
fn past(bound: i64) -> Result<i64, PlanError> {
    bound
        .checked_add(1)
        .ok_or(PlanError::SubscriptOutOfRange(bound))
}

fn sort_term(expression: Operation, direction: Direction) -> SortTerm {
    // `"name" desc` sorts by the attribute of that name
    let expression = match expression {
        Operation::Literal { value } => match value {
            Value::String(name) => Operation::attribute(&name),
            other => Operation::attribute(&serde_json::Value::from(other).to_string()),
        },
        other => other,
    };
    SortTerm {
        expression: Box::new(expression),
        direction,
    }
}

fn pipe_operator(lhs: Operation, rhs: Operation) -> Operation {
    match lhs {
        Operation::Pipe(mut pipeline) => {
            pipeline.operations.push(rhs);
            Operation::Pipe(pipeline)
        }
        lhs => Operation::Pipe(Pipeline::new(vec![lhs, rhs])),
    }
}

fn dot_operator(lhs: Operation, rhs: Operation) -> Operation {
    match (lhs, rhs) {
        (Operation::Pipe(mut pipeline), rhs) => {
            pipeline.operations.push(rhs);
            Operation::Pipe(pipeline)
        }
        (Operation::Accessor { mut path }, Operation::Accessor { path: rest }) => {
            path.extend(rest);
            Operation::Accessor { path }
        }
        (lhs, rhs) => Operation::Pipe(Pipeline::new(vec![lhs, rhs])),
    }
}

fn binary_operator(
    operator: BinaryOperator,
    lhs: Operation,
    rhs: Operation,
) -> Result<Operation, PlanError> {
    let op = match operator {
        BinaryOperator::And => BinaryOp::And,
        BinaryOperator::Or => BinaryOp::Or,
        BinaryOperator::Equals => BinaryOp::Eq,
        BinaryOperator::Neq => BinaryOp::Neq,
        BinaryOperator::Lt => BinaryOp::Lt,
        BinaryOperator::Lte => BinaryOp::Lte,
        BinaryOperator::Gt => BinaryOp::Gt,
        BinaryOperator::Gte => BinaryOp::Gte,
        BinaryOperator::In => BinaryOp::In,
        BinaryOperator::Match => BinaryOp::Match,
        BinaryOperator::Colon => {
            return match lhs {
                Operation::Literal {
                    value: Value::String(name),
                } => Ok(Operation::Assignment {
                    name,
                    value: Box::new(rhs),
                }),
                _ => Err(PlanError::InvalidAssignmentKey),
            };
        }
    };
    Ok(Operation::binary(op, lhs, rhs))
}

fn function_call(name: &str, arguments: Vec<Operation>) -> Result<Operation, PlanError> {
    if name == "order" {
        let terms = arguments
            .into_iter()
            .map(|argument| match argument {
                Operation::SortDirection(term) => term,
                other => sort_term(other, Direction::Asc),
            })
            .collect();
        return Ok(Operation::Ordering { terms });
    }
    let function =
        Function::from_name(name).ok_or_else(|| PlanError::UnknownFunction(name.to_string()))?;
    check_arity(function, arguments.len())?;
    Ok(Operation::FunctionCall {
        function,
        arguments,
    })
}

fn check_arity(function: Function, got: usize) -> Result<(), PlanError> {
    let (valid, expected) = match function {
        Function::Path | Function::Count | Function::Length | Function::Defined => {
            (got == 1, "1")
        }
        Function::JoinPaths => (got == 2, "2"),
        Function::References => (got >= 1, "at least 1"),
        Function::Coalesce => (true, "any number of"),
    };
    if valid {
        Ok(())
    } else {
        Err(PlanError::Arity {
            function: function.name(),
            expected,
            got,
        })
    }
}
