use super::operation::{ObjectOperation, Operation, Pipeline, SortTerm};

/// Rebuild an operation tree bottom-up.
///
/// Children are rewritten before their parent, and `f` sees each node after
/// its children were replaced. Nodes are moved, never shared, so the input
/// tree is left to the caller to drop.
pub fn rewrite<E>(
    operation: Operation,
    f: &mut impl FnMut(Operation) -> Result<Operation, E>,
) -> Result<Operation, E> {
    let rebuilt = match operation {
        Operation::Filter { filter } => Operation::Filter {
            filter: Box::new(rewrite(*filter, f)?),
        },
        Operation::Binary { operator, lhs, rhs } => Operation::Binary {
            operator,
            lhs: Box::new(rewrite(*lhs, f)?),
            rhs: Box::new(rewrite(*rhs, f)?),
        },
        Operation::Not { rhs } => Operation::Not {
            rhs: Box::new(rewrite(*rhs, f)?),
        },
        Operation::Object { operations } => Operation::Object {
            operations: operations
                .into_iter()
                .map(|member| match member {
                    ObjectOperation::Assignment { name, value } => {
                        Ok(ObjectOperation::Assignment {
                            name,
                            value: rewrite(value, f)?,
                        })
                    }
                    ObjectOperation::Splat => Ok(ObjectOperation::Splat),
                })
                .collect::<Result<_, E>>()?,
        },
        Operation::Array { operations } => Operation::Array {
            operations: rewrite_all(operations, f)?,
        },
        Operation::Assignment { name, value } => Operation::Assignment {
            name,
            value: Box::new(rewrite(*value, f)?),
        },
        Operation::Range {
            start,
            end,
            inclusive,
        } => Operation::Range {
            start: Box::new(rewrite(*start, f)?),
            end: Box::new(rewrite(*end, f)?),
            inclusive,
        },
        Operation::Ordering { terms } => Operation::Ordering {
            terms: terms
                .into_iter()
                .map(|term| rewrite_term(term, f))
                .collect::<Result<_, E>>()?,
        },
        Operation::SortDirection(term) => Operation::SortDirection(rewrite_term(term, f)?),
        Operation::FunctionCall {
            function,
            arguments,
        } => Operation::FunctionCall {
            function,
            arguments: rewrite_all(arguments, f)?,
        },
        Operation::Pipe(pipeline) => Operation::Pipe(rewrite_pipeline(pipeline, f)?),
        Operation::MapJoin { pipeline } => Operation::MapJoin {
            pipeline: Box::new(rewrite_pipeline(*pipeline, f)?),
        },
        leaf @ (Operation::Source { .. }
        | Operation::Accessor { .. }
        | Operation::Literal { .. }
        | Operation::Splat
        | Operation::Subscript(_)) => leaf,
    };
    f(rebuilt)
}

fn rewrite_all<E>(
    operations: Vec<Operation>,
    f: &mut impl FnMut(Operation) -> Result<Operation, E>,
) -> Result<Vec<Operation>, E> {
    operations.into_iter().map(|op| rewrite(op, f)).collect()
}

fn rewrite_term<E>(
    term: SortTerm,
    f: &mut impl FnMut(Operation) -> Result<Operation, E>,
) -> Result<SortTerm, E> {
    Ok(SortTerm {
        expression: Box::new(rewrite(*term.expression, f)?),
        direction: term.direction,
    })
}

// Map-join sub-pipelines are rewritten as plain pipelines, so `f` is not
// called with a bare `Pipe` for them; callers see the `MapJoin` node instead.
fn rewrite_pipeline<E>(
    pipeline: Pipeline,
    f: &mut impl FnMut(Operation) -> Result<Operation, E>,
) -> Result<Pipeline, E> {
    Ok(Pipeline {
        operations: rewrite_all(pipeline.operations, f)?,
        alias: pipeline.alias,
    })
}
