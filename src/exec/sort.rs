use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::ExecError;
use crate::plan::{Direction, SortTerm};
use crate::value::{Value, compare_numbers};

use super::executor::Executor;
use super::scope::Scope;

/// Rank used to order values of different types: numbers, then strings,
/// then booleans, then everything else.
pub fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Integer(_) | Value::Float(_) => 1,
        Value::String(_) => 2,
        Value::Boolean(_) => 3,
        _ => 4,
    }
}

/// Compare two sort keys. Values of different types are ordered by
/// [`type_rank`] whatever the direction.
pub fn compare_for_sort(a: &Value, b: &Value, direction: Direction) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    let ordering = match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        _ if rank_a == 1 => compare_numbers(a, b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    };
    match direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

/// Stable sort of `items` by the values of `terms` evaluated in each item.
pub(crate) async fn sort(
    executor: &Executor<'_>,
    items: Vec<Arc<Scope>>,
    terms: &[SortTerm],
) -> Result<Vec<Arc<Scope>>, ExecError> {
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let mut keys = Vec::with_capacity(terms.len());
        for term in terms {
            let key = executor.exec(&term.expression, Arc::clone(&item)).await?;
            keys.push(key.to_value());
        }
        keyed.push((keys, item));
    }
    keyed.sort_by(|(a, _), (b, _)| {
        terms
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(term, (a, b))| compare_for_sort(a, b, term.direction))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}
