use crate::path::Path;
use crate::plan::Function;
use crate::value::Value;

use super::context::ExecutionContext;
use super::references::does_reference;
use super::scope::{Scope, Scoped};

/// Evaluate a built-in function over already evaluated arguments. `scope`
/// is the document the call appears in.
pub(crate) fn call(
    function: Function,
    scope: &Scope,
    arguments: &[Scoped],
    context: &ExecutionContext,
) -> Value {
    let values: Vec<Value> = arguments.iter().map(Scoped::to_value).collect();
    match function {
        Function::Path => values.first().and_then(to_path).map_or(Value::Null, Value::Path),
        Function::JoinPaths => match (values.first().and_then(to_path), values.get(1).and_then(to_path)) {
            (Some(a), Some(b)) => Value::Path(a.concat(&b)),
            _ => Value::Null,
        },
        Function::Coalesce => values.into_iter().find(|v| !v.is_null()).unwrap_or_default(),
        Function::Count => match values.first() {
            Some(Value::Array(items)) => Value::Integer(items.len() as i64),
            Some(value) if !value.is_null() => Value::Integer(1),
            _ => Value::Integer(0),
        },
        Function::Length => match values.first() {
            None | Some(Value::Null) => Value::Null,
            Some(Value::Array(items)) => Value::Integer(items.len() as i64),
            Some(Value::String(s)) => Value::Integer(s.chars().count() as i64),
            Some(Value::Object(fields)) => Value::Integer(fields.len() as i64),
            Some(_) => Value::Integer(1),
        },
        Function::Defined => Value::Boolean(match values.first() {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(fields)) => !fields.is_empty(),
            Some(_) => true,
        }),
        Function::References => {
            let mut ids = Vec::new();
            for value in values {
                match value {
                    Value::Array(items) => ids.extend(items),
                    other => ids.push(other),
                }
            }
            Value::Boolean(does_reference(scope.value(), &ids, context))
        }
    }
}

fn to_path(value: &Value) -> Option<Path> {
    match value {
        Value::String(s) => Some(Path::parse(s)),
        Value::Path(path) => Some(path.clone()),
        _ => None,
    }
}
