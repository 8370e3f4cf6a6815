use serde::Serialize;

use crate::plan::{BinaryOp, Operation, SortTerm};

/// What a pipeline needs from its source.
///
/// Specs are built by folding a pipeline's stages from last to first, so
/// every `apply_*` call refers to a stage that runs *before* everything
/// applied so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchSpec {
    pub filter: Option<Operation>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub ordering: Vec<SortTerm>,
}

impl FetchSpec {
    /// A spec that only carries `filter`.
    pub fn filtered(filter: Operation) -> Self {
        FetchSpec {
            filter: Some(filter),
            ..Default::default()
        }
    }

    pub fn clear(&mut self) {
        *self = FetchSpec::default();
    }

    pub fn has_window(&self) -> bool {
        self.start.is_some()
    }

    fn has_constraints(&self) -> bool {
        self.filter.is_some() || !self.ordering.is_empty()
    }

    pub fn apply_filter(&mut self, constraint: Operation) {
        self.filter = Some(match self.filter.take() {
            Some(existing) => Operation::binary(BinaryOp::And, existing, constraint),
            None => constraint,
        });
    }

    /// Narrow to `[start, end)`. A later window is relative to this one.
    /// Filters and orderings that run after the window cannot be pushed
    /// below it and are dropped. Bounds counting from the end cannot be
    /// pushed at all and leave the fetch empty.
    pub fn apply_window(&mut self, start: i64, end: i64) {
        if start < 0 || end < 0 {
            self.clear();
            return;
        }
        if self.has_constraints() {
            self.clear();
        }
        match (self.start, self.end) {
            (Some(inner_start), Some(inner_end)) => {
                self.start = Some(start.saturating_add(inner_start));
                self.end = Some(inner_end.saturating_add(start).min(end));
            }
            _ => {
                self.start = Some(start);
                self.end = Some(end);
            }
        }
    }

    /// Sort by `terms` before the orderings applied so far, which stay the
    /// dominant comparators.
    pub fn apply_ordering(&mut self, terms: &[SortTerm]) {
        self.ordering.extend(terms.iter().cloned());
    }

    /// A stage that reshapes values: whatever runs after it no longer
    /// refers to source documents.
    pub fn project(&mut self) {
        if self.has_constraints() {
            self.clear();
        }
    }
}
