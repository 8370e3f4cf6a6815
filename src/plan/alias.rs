use crate::error::PlanError;

use super::operation::{ObjectOperation, Operation, PathStep};

/// The attribute name an expression obviously occupies when it appears
/// unnamed inside an object expression.
///
/// `foo`, `foo[]`, `foo->`, `foo[]->`, `foo[bar == 1]`, `foo[0]` and
/// `foo[0..10]` all yield `foo`. Anything where the name is ambiguous, like
/// `foo.bar`, yields `None`.
pub fn unambiguous_alias(operation: &Operation) -> Option<String> {
    match operation {
        Operation::Accessor { path } => match path.as_slice() {
            [PathStep::Attribute { name }] => Some(name.clone()),
            _ => None,
        },
        Operation::Pipe(pipeline) => match &pipeline.alias {
            Some(alias) => Some(alias.clone()),
            None => pipeline.operations.first().and_then(unambiguous_alias),
        },
        _ => None,
    }
}

/// Convert the members of an object expression, naming unnamed members by
/// their alias.
pub fn to_object_operations(
    expressions: Vec<Operation>,
) -> Result<Vec<ObjectOperation>, PlanError> {
    expressions
        .into_iter()
        .map(|expression| match expression {
            Operation::Assignment { name, value } => Ok(ObjectOperation::Assignment {
                name,
                value: *value,
            }),
            Operation::Splat => Ok(ObjectOperation::Splat),
            other => match unambiguous_alias(&other) {
                Some(name) => Ok(ObjectOperation::Assignment { name, value: other }),
                None => Err(PlanError::UnnamedObjectMember(other.kind())),
            },
        })
        .collect()
}
