use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::ExecError;
use crate::exec::{ExecutionContext, Scope, resolve_path};
use crate::plan::{BinaryOp, Function, Operation, PathStep};
use crate::value::Value;

/// Rewrite comparisons against `^` accessors into comparisons against the
/// values those accessors take in every sibling of `scope`, so the filter
/// can be evaluated without the enclosing document.
///
/// Only the boolean structure of the filter (`and`, `or`, `not`) is
/// searched. A filter with no join comparison is returned unchanged.
/// Returns `None` when the siblings cannot be enumerated, because the
/// enclosing value was computed rather than read from a source.
pub fn generalize_join_filter(
    filter: Operation,
    scope: &Arc<Scope>,
    context: &ExecutionContext,
) -> Result<Option<Operation>, ExecError> {
    match filter {
        Operation::Binary {
            operator: operator @ (BinaryOp::And | BinaryOp::Or),
            lhs,
            rhs,
        } => {
            let Some(lhs) = generalize_join_filter(*lhs, scope, context)? else {
                return Ok(None);
            };
            let Some(rhs) = generalize_join_filter(*rhs, scope, context)? else {
                return Ok(None);
            };
            Ok(Some(Operation::binary(operator, lhs, rhs)))
        }
        Operation::Not { rhs } => Ok(generalize_join_filter(*rhs, scope, context)?
            .map(|rhs| Operation::Not { rhs: Box::new(rhs) })),
        Operation::Binary {
            operator: BinaryOp::Eq,
            lhs,
            rhs,
        } => generalize_eq(*lhs, *rhs, scope, context),
        Operation::Binary {
            operator: BinaryOp::In,
            lhs,
            rhs,
        } => generalize_in(*lhs, *rhs, scope, context),
        Operation::FunctionCall {
            function: Function::References,
            arguments,
        } => {
            if !arguments.iter().any(Operation::is_parent_accessor) {
                return Ok(Some(Operation::FunctionCall {
                    function: Function::References,
                    arguments,
                }));
            }
            let mut generalized = Vec::with_capacity(arguments.len());
            for argument in arguments {
                if argument.is_parent_accessor() {
                    let Some(values) = resolve_join(&argument, scope, context) else {
                        return Ok(None);
                    };
                    generalized.extend(values.into_iter().map(Operation::literal));
                } else {
                    generalized.push(argument);
                }
            }
            Ok(Some(Operation::FunctionCall {
                function: Function::References,
                arguments: generalized,
            }))
        }
        other => Ok(Some(other)),
    }
}

/// The values at `scope`'s position in every document of its source, or
/// its own value alone when it was not read from a source. `None` for a
/// computed value inside a source.
pub(crate) fn sibling_values(scope: &Scope, context: &ExecutionContext) -> Option<Vec<Value>> {
    match scope.source_id().and_then(|id| context.source(id)) {
        None => Some(vec![scope.value().clone()]),
        Some(_) if scope.is_computed() => None,
        Some(source) => Some(
            source
                .documents
                .iter()
                .flat_map(|document| match resolve_path(document, scope.path()) {
                    Value::Array(items) => items,
                    value => vec![value],
                })
                .collect(),
        ),
    }
}

fn resolve_join(
    join: &Operation,
    scope: &Arc<Scope>,
    context: &ExecutionContext,
) -> Option<Vec<Value>> {
    match join {
        Operation::Accessor { path } => resolve_for_all(scope, path, context),
        _ => Some(Vec::new()),
    }
}

fn generalize_eq(
    lhs: Operation,
    rhs: Operation,
    scope: &Arc<Scope>,
    context: &ExecutionContext,
) -> Result<Option<Operation>, ExecError> {
    let (join, constant) = match (lhs.is_parent_accessor(), rhs.is_parent_accessor()) {
        (true, true) => return Err(ExecError::JoinOnBothSides),
        (false, false) => return Ok(Some(Operation::binary(BinaryOp::Eq, lhs, rhs))),
        (true, false) => (lhs, rhs),
        (false, true) => (rhs, lhs),
    };
    let Some(values) = resolve_join(&join, scope, context) else {
        return Ok(None);
    };
    trace!(values = values.len(), "generalizing join equality");
    Ok(Some(match values.len() {
        0 => Operation::literal(false),
        1 => {
            let value = values.into_iter().next().unwrap_or_default();
            Operation::binary(BinaryOp::Eq, constant, Operation::literal(value))
        }
        _ => Operation::binary(BinaryOp::In, constant, Operation::literal(Value::Array(values))),
    }))
}

fn generalize_in(
    lhs: Operation,
    rhs: Operation,
    scope: &Arc<Scope>,
    context: &ExecutionContext,
) -> Result<Option<Operation>, ExecError> {
    match (lhs.is_parent_accessor(), rhs.is_parent_accessor()) {
        (true, true) => Err(ExecError::JoinOnBothSides),
        (false, false) => Ok(Some(Operation::binary(BinaryOp::In, lhs, rhs))),
        (false, true) => {
            let Some(values) = resolve_join(&rhs, scope, context) else {
                return Ok(None);
            };
            let mut candidates = Vec::new();
            for value in values {
                match value {
                    Value::Array(items) => candidates.extend(items),
                    other => candidates.push(other),
                }
            }
            if candidates.is_empty() {
                return Ok(Some(Operation::literal(false)));
            }
            Ok(Some(Operation::binary(
                BinaryOp::In,
                lhs,
                Operation::literal(Value::Array(candidates)),
            )))
        }
        (true, false) => {
            let Some(values) = resolve_join(&lhs, scope, context) else {
                return Ok(None);
            };
            Ok(Some(
                values
                    .into_iter()
                    .map(|value| {
                        Operation::binary(BinaryOp::In, Operation::literal(value), rhs.clone())
                    })
                    .reduce(|a, b| Operation::binary(BinaryOp::Or, a, b))
                    .unwrap_or_else(|| Operation::literal(false)),
            ))
        }
    }
}

/// Every non-null value `steps` resolves to from `scope`, across all the
/// siblings of the first enclosing scope the walk reads an attribute from.
fn resolve_for_all(
    scope: &Arc<Scope>,
    steps: &[PathStep],
    context: &ExecutionContext,
) -> Option<Vec<Value>> {
    let mut current = scope.child(Value::Object(HashMap::new()));
    for (index, step) in steps.iter().enumerate() {
        match step {
            PathStep::Parent => match current.parent() {
                Some(parent) => current = Arc::clone(parent),
                None => return Some(Vec::new()),
            },
            PathStep::Attribute { .. } => {
                let rest = &steps[index..];
                let values = sibling_values(&current, context)?
                    .into_iter()
                    .map(|value| {
                        current
                            .with_value(value)
                            .resolve_accessor(rest)
                            .value()
                            .clone()
                    })
                    .filter(|value| !value.is_null())
                    .collect();
                return Some(values);
            }
        }
    }
    let value = current.value().clone();
    Some(if value.is_null() { Vec::new() } else { vec![value] })
}
