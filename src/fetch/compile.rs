use std::sync::Arc;

use tracing::debug;

use crate::error::ExecError;
use crate::exec::{Executor, Scope};
use crate::plan::{BinaryOp, Operation, Pipeline};
use crate::value::Value;

use super::generalize::{generalize_join_filter, sibling_values};
use super::spec::FetchSpec;

/// Fold `pipeline` into the fetch spec of its source. `scope` is the scope the
/// pipeline runs in, used to resolve joins against the enclosing source.
pub(crate) async fn compile(
    executor: &Executor<'_>,
    pipeline: &Pipeline,
    scope: &Arc<Scope>,
) -> Result<FetchSpec, ExecError> {
    let Some((Operation::Source { .. }, stages)) = pipeline.operations.split_first() else {
        return Err(ExecError::NotASource);
    };

    let mut spec = FetchSpec::default();
    for stage in stages.iter().rev() {
        match stage {
            Operation::Filter { filter } => spec.apply_filter((**filter).clone()),
            Operation::Subscript(subscript) => {
                if subscript.first {
                    spec.clear();
                }
                spec.apply_window(subscript.start, subscript.end);
            }
            Operation::Ordering { terms } => spec.apply_ordering(terms),
            Operation::MapJoin { pipeline } => {
                // positions and order follow the requested ids, not the source
                let filter = spec.filter.take();
                spec.clear();
                spec.filter = filter;
                if let Some(ids) = generalize_map_join(executor, pipeline, scope).await? {
                    spec.apply_filter(ids);
                }
            }
            Operation::Object { .. }
            | Operation::Accessor { .. }
            | Operation::Array { .. }
            | Operation::Pipe(_)
            | Operation::FunctionCall { .. }
            | Operation::Literal { .. }
            | Operation::Binary { .. }
            | Operation::Not { .. } => spec.project(),
            other => return Err(ExecError::UncompilableStage(other.kind())),
        }
    }

    if let Some(filter) = &spec.filter {
        match generalize_join_filter(filter.clone(), scope, executor.context())? {
            None => {
                debug!("join over computed values, fetching everything");
                return Ok(FetchSpec::default());
            }
            Some(generalized) if &generalized != filter => {
                debug!(filter = ?generalized, "join filter generalized");
                return Ok(FetchSpec::filtered(generalized));
            }
            Some(_) => {}
        }
    }
    Ok(spec)
}

/// The filter `_id in [ids]`, where ids are what the join's pipeline
/// resolves to in every sibling of `scope`. `None` when the siblings are
/// computed values that cannot be enumerated.
async fn generalize_map_join(
    executor: &Executor<'_>,
    pipeline: &Pipeline,
    scope: &Arc<Scope>,
) -> Result<Option<Operation>, ExecError> {
    let Some(subjects) = sibling_values(scope, executor.context()) else {
        return Ok(None);
    };

    let mut ids: Vec<Value> = Vec::new();
    for subject in subjects {
        let resolved = executor
            .exec_pipeline(pipeline, Scope::detached(subject))
            .await?
            .to_value();
        let candidates = match resolved {
            Value::Array(items) => items,
            value => vec![value],
        };
        for id in candidates {
            if id.is_truthy() && !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    debug!(ids = ids.len(), "map join generalized");
    Ok(Some(Operation::binary(
        BinaryOp::In,
        Operation::attribute("_id"),
        Operation::literal(Value::Array(ids)),
    )))
}
