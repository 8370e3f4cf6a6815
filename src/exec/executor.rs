use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, trace};

use crate::error::ExecError;
use crate::fetch::{Fetcher, compile};
use crate::path::Path;
use crate::plan::{BinaryOp, ObjectOperation, Operation, Pipeline, Subscript};
use crate::value::Value;

use super::context::ExecutionContext;
use super::functions;
use super::matcher::match_value;
use super::scope::{Scope, Scoped, window_bounds, window_index};
use super::sort::sort;

/// Interprets an operation tree.
///
/// An executor owns the caches of one execution. Sources are fetched
/// lazily, the first time a pipeline reading from them runs, and at most
/// once per execution.
pub struct Executor<'a> {
    fetcher: &'a dyn Fetcher,
    context: ExecutionContext,
}

impl<'a> Executor<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Executor {
            fetcher,
            context: ExecutionContext::new(),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Execute `operation` from the root scope and return its plain value.
    pub async fn run(&self, operation: &Operation) -> Result<Value, ExecError> {
        let result = self.exec(operation, Scope::root()).await?;
        Ok(result.to_value())
    }

    pub(crate) fn exec<'s>(
        &'s self,
        operation: &'s Operation,
        scope: Arc<Scope>,
    ) -> BoxFuture<'s, Result<Scoped, ExecError>> {
        self.dispatch(operation, scope).boxed()
    }

    async fn dispatch(&self, operation: &Operation, scope: Arc<Scope>) -> Result<Scoped, ExecError> {
        match operation {
            Operation::Pipe(pipeline) => self.exec_pipeline(pipeline, scope).await,
            Operation::Source { id } => {
                let data = self.context.source(*id).ok_or(ExecError::UnknownSource(*id))?;
                let documents = Value::Array(data.documents.clone());
                Ok(Scoped::One(scope.source(*id, documents, data.start)))
            }
            Operation::Filter { filter } => self.exec(filter, scope).await,
            Operation::Binary { operator, lhs, rhs } => {
                let lhs = self.eval(lhs, &scope).await?;
                let rhs = self.eval(rhs, &scope).await?;
                let value = binary(*operator, &lhs, &rhs)?;
                Ok(Scoped::One(scope.derived(value)))
            }
            Operation::Not { rhs } => {
                let value = match self.eval(rhs, &scope).await? {
                    Value::Boolean(b) => Value::Boolean(!b),
                    _ => Value::Null,
                };
                Ok(Scoped::One(scope.derived(value)))
            }
            Operation::Accessor { path } => Ok(Scoped::One(scope.resolve_accessor(path))),
            Operation::Literal { value } => Ok(Scoped::One(Scope::detached(value.clone()))),
            Operation::Object { operations } => self.exec_object(operations, scope).await,
            Operation::Array { operations } => {
                let mut elements = Vec::with_capacity(operations.len());
                for element in operations {
                    elements.push(self.eval(element, &scope).await?);
                }
                Ok(Scoped::One(scope.with_value(Value::Array(elements))))
            }
            Operation::FunctionCall {
                function,
                arguments,
            } => {
                let mut evaluated = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    evaluated.push(self.exec(argument, Arc::clone(&scope)).await?);
                }
                let value = functions::call(*function, &scope, &evaluated, &self.context);
                Ok(Scoped::One(scope.with_value(value)))
            }
            Operation::MapJoin { pipeline } => {
                let base = scope.parent().cloned().unwrap_or_else(Scope::root);
                self.exec_map_join(pipeline, scope, &base).await
            }
            other => Err(ExecError::InvalidOperation(other.kind())),
        }
    }

    /// Fetch the pipeline's source if needed, evaluate the first stage and
    /// pipe the result through the rest.
    pub(crate) fn exec_pipeline<'s>(
        &'s self,
        pipeline: &'s Pipeline,
        scope: Arc<Scope>,
    ) -> BoxFuture<'s, Result<Scoped, ExecError>> {
        self.run_pipeline(pipeline, scope).boxed()
    }

    async fn run_pipeline(&self, pipeline: &Pipeline, scope: Arc<Scope>) -> Result<Scoped, ExecError> {
        self.fetch(pipeline, &scope).await?;
        let Some((first, rest)) = pipeline.operations.split_first() else {
            return Ok(Scoped::One(scope.derived(Value::Null)));
        };
        let mut current = self.exec(first, Arc::clone(&scope)).await?;
        for stage in rest {
            current = self.pipe(stage, current, &scope).await?;
        }
        Ok(current)
    }

    async fn fetch(&self, pipeline: &Pipeline, scope: &Arc<Scope>) -> Result<(), ExecError> {
        let Some(id) = pipeline.source_id() else {
            return Ok(());
        };
        if self.context.has_source(id) {
            trace!(source = %id, "source already fetched");
            return Ok(());
        }
        let spec = compile(self, pipeline, scope).await?;
        debug!(source = %id, ?spec, "fetching source");
        let response = self.fetcher.fetch(&spec).await?;
        self.context.store(id, response);
        Ok(())
    }

    /// Evaluate an operand to a plain value.
    async fn eval(&self, operation: &Operation, scope: &Arc<Scope>) -> Result<Value, ExecError> {
        Ok(self.exec(operation, Arc::clone(scope)).await?.to_value())
    }

    /// Apply one pipeline stage. `base` is the scope the pipeline runs in.
    async fn pipe(
        &self,
        stage: &Operation,
        input: Scoped,
        base: &Arc<Scope>,
    ) -> Result<Scoped, ExecError> {
        match stage {
            Operation::Subscript(subscript) => Ok(subscript_of(input, *subscript)),
            Operation::Ordering { terms } => {
                let (items, start) = match input {
                    Scoped::Many { items, start } => (items, start),
                    Scoped::One(scope) => match scope.value() {
                        Value::Array(values) => (
                            values.iter().map(|v| scope.element(v.clone())).collect(),
                            scope.start(),
                        ),
                        _ => (vec![scope], 0),
                    },
                };
                let items = sort(self, items, terms).await?;
                Ok(Scoped::Many { items, start })
            }
            Operation::Filter { filter } => self.pipe_filter(filter, input).await,
            Operation::MapJoin { pipeline } => {
                let owner = match input {
                    Scoped::One(scope) => scope,
                    Scoped::Many { items, .. } => {
                        let values = Value::Array(items.iter().map(|i| i.value().clone()).collect());
                        match items.first().and_then(|item| item.source_id()) {
                            Some(id) => base.source(id, values, 0),
                            None => base.child(values),
                        }
                    }
                };
                self.exec_map_join(pipeline, owner, base).await
            }
            stage => match input {
                Scoped::One(scope) => self.exec(stage, scope).await,
                Scoped::Many { items, start } => {
                    let mut mapped = Vec::with_capacity(items.len());
                    for item in items {
                        let result = self.exec(stage, Arc::clone(&item)).await?;
                        mapped.push(result.into_scope(&item));
                    }
                    Ok(Scoped::Many {
                        items: mapped,
                        start,
                    })
                }
            },
        }
    }

    /// Explode the input into elements and keep those for which `filter`
    /// is exactly `true`.
    async fn pipe_filter(&self, filter: &Operation, input: Scoped) -> Result<Scoped, ExecError> {
        let (candidates, start) = match input {
            Scoped::Many { items, start } => {
                let mut flattened = Vec::with_capacity(items.len());
                for item in items {
                    match item.value() {
                        Value::Array(values) => {
                            flattened.extend(values.iter().map(|v| item.element(v.clone())))
                        }
                        _ => flattened.push(item),
                    }
                }
                (flattened, start)
            }
            Scoped::One(scope) => match scope.value() {
                Value::Array(values) => (
                    values.iter().map(|v| scope.element(v.clone())).collect(),
                    scope.start(),
                ),
                _ => (vec![scope], 0),
            },
        };
        let mut kept = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let verdict = self.exec(filter, Arc::clone(&candidate)).await?;
            if verdict.to_value() == Value::Boolean(true) {
                kept.push(candidate);
            }
        }
        Ok(Scoped::Many { items: kept, start })
    }

    async fn exec_object(
        &self,
        operations: &[ObjectOperation],
        scope: Arc<Scope>,
    ) -> Result<Scoped, ExecError> {
        let mut object = HashMap::new();
        for operation in operations {
            match operation {
                ObjectOperation::Assignment { name, value } => {
                    let value = self.eval(value, &scope).await?;
                    if !value.is_null() {
                        object.insert(name.clone(), value);
                    }
                }
                ObjectOperation::Splat => {
                    if let Value::Object(fields) = scope.value() {
                        object.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                }
            }
        }
        Ok(Scoped::One(scope.with_value(Value::Object(object))))
    }

    /// Look up the documents of `owner` by the ids `pipeline` resolves to in
    /// `base`, in requested order. A missing id yields a null slot.
    async fn exec_map_join(
        &self,
        pipeline: &Pipeline,
        owner: Arc<Scope>,
        base: &Arc<Scope>,
    ) -> Result<Scoped, ExecError> {
        let ids = self.exec_pipeline(pipeline, Arc::clone(base)).await?.to_value();
        let empty = Vec::new();
        let documents = owner.value().as_array().unwrap_or(&empty);
        let lookup = |id: &Value| {
            let document = documents
                .iter()
                .find(|doc| doc.get("_id").is_some_and(|doc_id| doc_id.loose_eq(id)))
                .cloned()
                .unwrap_or_default();
            owner.child(document)
        };
        trace!(?ids, "map join");
        Ok(match &ids {
            Value::Array(ids) => Scoped::many(ids.iter().map(lookup).collect()),
            id => Scoped::One(lookup(id)),
        })
    }
}

fn subscript_of(input: Scoped, subscript: Subscript) -> Scoped {
    match input {
        Scoped::One(scope) => Scoped::One(if subscript.first {
            scope.first(subscript.start)
        } else {
            scope.slice(subscript.start, subscript.end)
        }),
        Scoped::Many { items, start } => {
            if subscript.first {
                Scoped::One(
                    window_index(items.len(), start, subscript.start)
                        .and_then(|index| items.get(index))
                        .map(Arc::clone)
                        .unwrap_or_else(|| Scope::detached(Value::Null)),
                )
            } else {
                let (from, to, remaining) =
                    window_bounds(items.len(), start, subscript.start, subscript.end);
                Scoped::Many {
                    items: items[from..to].to_vec(),
                    start: remaining,
                }
            }
        }
    }
}

/// Apply a binary operator to plain operand values.
pub(crate) fn binary(operator: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExecError> {
    Ok(match operator {
        BinaryOp::And => match (lhs, rhs) {
            (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Value::Boolean(false),
            (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(*a && *b),
            _ => Value::Null,
        },
        BinaryOp::Or => match (lhs, rhs) {
            (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Value::Boolean(true),
            (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(*a || *b),
            _ => Value::Null,
        },
        BinaryOp::Eq => truth(lhs.equals(rhs)),
        BinaryOp::Neq => truth(lhs.equals(rhs).map(|equal| !equal)),
        BinaryOp::Lt => truth(lhs.loose_cmp(rhs).map(Ordering::is_lt)),
        BinaryOp::Lte => truth(lhs.loose_cmp(rhs).map(Ordering::is_le)),
        BinaryOp::Gt => truth(lhs.loose_cmp(rhs).map(Ordering::is_gt)),
        BinaryOp::Gte => truth(lhs.loose_cmp(rhs).map(Ordering::is_ge)),
        BinaryOp::In => membership(lhs, rhs)?,
        BinaryOp::Match => {
            let terms = match rhs {
                Value::Array(terms) => terms.as_slice(),
                single => std::slice::from_ref(single),
            };
            match_value(lhs, terms)
        }
    })
}

/// A known truth value, or null when the comparison was undecidable.
fn truth(known: Option<bool>) -> Value {
    known.map_or(Value::Null, Value::Boolean)
}

/// `lhs in rhs`: array membership or path containment.
fn membership(lhs: &Value, rhs: &Value) -> Result<Value, ExecError> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    match rhs {
        Value::Array(candidates) => {
            for candidate in candidates {
                if lhs.loose_eq(candidate) {
                    return Ok(Value::Boolean(true));
                }
                if let Value::Path(pattern) = candidate
                    && contains(pattern, lhs)?
                {
                    return Ok(Value::Boolean(true));
                }
            }
            Ok(Value::Boolean(false))
        }
        Value::Path(pattern) => Ok(Value::Boolean(contains(pattern, lhs)?)),
        other => Err(ExecError::InOperand(other.type_name())),
    }
}

fn contains(pattern: &Path, candidate: &Value) -> Result<bool, ExecError> {
    match candidate {
        Value::String(s) => Ok(pattern.contains(&Path::parse(s))),
        Value::Path(path) => Ok(pattern.contains(path)),
        other => Err(ExecError::PathCandidate(other.type_name())),
    }
}
