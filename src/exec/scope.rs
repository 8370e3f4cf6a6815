use std::collections::HashMap;
use std::sync::Arc;

use crate::plan::{PathStep, SourceId, Subscript};
use crate::value::Value;

/// How a scope's value was reached from its source document.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeStep {
    Attribute(String),
    Subscript(Subscript),
}

/// A value together with where it came from.
///
/// Scopes form a tree through their `parent` link; `^` in a query walks that
/// link. The source id and path let a join find the same position in every
/// sibling document of the source.
#[derive(Debug)]
pub struct Scope {
    value: Value,
    parent: Option<Arc<Scope>>,
    path: Vec<ScopeStep>,
    source_id: Option<SourceId>,
    /// Offset of `value` within its logical collection when a fetcher already
    /// applied part of a window
    start: usize,
    /// Set when `value` was computed rather than found at `path` in a
    /// source document
    computed: bool,
}

impl Scope {
    /// The scope every query starts in: an empty object with no parent.
    pub fn root() -> Arc<Scope> {
        Scope::detached(Value::Object(HashMap::new()))
    }

    /// A scope with no provenance at all, as produced by literals.
    pub fn detached(value: Value) -> Arc<Scope> {
        Arc::new(Scope {
            value,
            parent: None,
            path: Vec::new(),
            source_id: None,
            start: 0,
            computed: false,
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    pub fn path(&self) -> &[ScopeStep] {
        &self.path
    }

    pub fn source_id(&self) -> Option<SourceId> {
        self.source_id
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// True when the value cannot be found again by following `path` in the
    /// documents of the source.
    pub fn is_computed(&self) -> bool {
        self.computed
    }

    /// Same parent, a value computed in this scope. The result can no
    /// longer be located in the source's documents.
    pub fn with_value(&self, value: Value) -> Arc<Scope> {
        Arc::new(Scope {
            value,
            parent: self.parent.clone(),
            path: self.path.clone(),
            source_id: self.source_id,
            start: self.start,
            computed: true,
        })
    }

    /// One element of this scope's collection value. Elements keep the
    /// collection's path so joins can find them in sibling documents.
    pub fn element(&self, value: Value) -> Arc<Scope> {
        Arc::new(Scope {
            value,
            parent: self.parent.clone(),
            path: self.path.clone(),
            source_id: self.source_id,
            start: 0,
            computed: self.computed,
        })
    }

    /// A value computed from this scope's operands, such as a comparison
    /// result. It shares the parent but has no path of its own.
    pub fn derived(&self, value: Value) -> Arc<Scope> {
        Arc::new(Scope {
            value,
            parent: self.parent.clone(),
            path: Vec::new(),
            source_id: None,
            start: 0,
            computed: false,
        })
    }

    pub fn child(self: &Arc<Self>, value: Value) -> Arc<Scope> {
        Arc::new(Scope {
            value,
            parent: Some(Arc::clone(self)),
            path: Vec::new(),
            source_id: self.source_id,
            start: 0,
            computed: self.computed,
        })
    }

    /// The documents of a source, as a child of the scope that asked for them.
    pub fn source(self: &Arc<Self>, id: SourceId, documents: Value, start: usize) -> Arc<Scope> {
        Arc::new(Scope {
            value: documents,
            parent: Some(Arc::clone(self)),
            path: Vec::new(),
            source_id: Some(id),
            start,
            computed: false,
        })
    }

    fn attribute(self: &Arc<Self>, name: &str) -> Arc<Scope> {
        let value = self.value.get(name).cloned().unwrap_or(Value::Null);
        let mut path = self.path.clone();
        path.push(ScopeStep::Attribute(name.to_string()));
        Arc::new(Scope {
            value,
            parent: Some(Arc::clone(self)),
            path,
            source_id: self.source_id,
            start: 0,
            computed: self.computed,
        })
    }

    /// The element at `offset`, or a null scope when this is not an array or
    /// the offset is out of range.
    pub fn first(&self, offset: i64) -> Arc<Scope> {
        let Value::Array(items) = &self.value else {
            return self.with_value(Value::Null);
        };
        let value = window_index(items.len(), self.start, offset)
            .and_then(|index| items.get(index))
            .cloned()
            .unwrap_or(Value::Null);
        self.narrowed(
            value,
            Subscript {
                start: offset,
                end: offset.saturating_add(1),
                first: true,
            },
            0,
        )
    }

    /// The elements in `[start, end)`, or a null scope when this is not an
    /// array.
    pub fn slice(&self, start: i64, end: i64) -> Arc<Scope> {
        let Value::Array(items) = &self.value else {
            return self.with_value(Value::Null);
        };
        let (from, to, remaining) = window_bounds(items.len(), self.start, start, end);
        self.narrowed(
            Value::Array(items[from..to].to_vec()),
            Subscript {
                start,
                end,
                first: false,
            },
            remaining,
        )
    }

    fn narrowed(&self, value: Value, subscript: Subscript, start: usize) -> Arc<Scope> {
        let mut path = self.path.clone();
        path.push(ScopeStep::Subscript(subscript));
        Arc::new(Scope {
            value,
            parent: self.parent.clone(),
            path,
            source_id: self.source_id,
            start,
            computed: self.computed,
        })
    }

    /// Walk an accessor path. `^` moves to the parent scope, attributes
    /// descend into objects. Missing attributes resolve to null and stop
    /// the walk.
    pub fn resolve_accessor(self: &Arc<Self>, steps: &[PathStep]) -> Arc<Scope> {
        let mut current = Arc::clone(self);
        for step in steps {
            current = match step {
                PathStep::Parent => match current.parent() {
                    Some(parent) => Arc::clone(parent),
                    None => return Scope::detached(Value::Null),
                },
                PathStep::Attribute { name } => current.attribute(name),
            };
            if current.value.is_null() {
                break;
            }
        }
        current
    }
}

/// Follow a scope path from a document. Subscript steps only apply to
/// arrays and are skipped for anything else.
pub fn resolve_path(value: &Value, steps: &[ScopeStep]) -> Value {
    let mut current = value.clone();
    for step in steps {
        current = match (step, current) {
            (ScopeStep::Attribute(name), value) => value.get(name).cloned().unwrap_or(Value::Null),
            (ScopeStep::Subscript(subscript), Value::Array(items)) => {
                let (from, to) = slice_bounds(items.len(), subscript.start, subscript.end);
                if subscript.first {
                    element_index(items.len(), subscript.start)
                        .and_then(|index| items.get(index))
                        .cloned()
                        .unwrap_or(Value::Null)
                } else {
                    Value::Array(items[from..to].to_vec())
                }
            }
            (ScopeStep::Subscript(_), other) => other,
        };
        if current.is_null() {
            break;
        }
    }
    current
}

/// Clamp `[start, end)` to a collection of `len` items. Negative bounds
/// count from the end.
pub fn slice_bounds(len: usize, start: i64, end: i64) -> (usize, usize) {
    let clamp = |bound: i64| -> usize {
        if bound < 0 {
            (len as i64 + bound).max(0) as usize
        } else {
            (bound as usize).min(len)
        }
    };
    let from = clamp(start);
    let to = clamp(end).max(from);
    (from, to)
}

/// Position of `index` in a collection of `len` items, counting from the end
/// when negative.
pub fn element_index(len: usize, index: i64) -> Option<usize> {
    let index = if index < 0 { len as i64 + index } else { index };
    (0..len as i64).contains(&index).then_some(index as usize)
}

/// Map the logical window `[start, end)` onto `len` items whose first item
/// has logical index `offset`. Returns the item range and the logical index
/// of the first kept item within the window.
pub fn window_bounds(len: usize, offset: usize, start: i64, end: i64) -> (usize, usize, usize) {
    let shift = |bound: i64| {
        if bound < 0 {
            bound
        } else {
            (bound - offset as i64).max(0)
        }
    };
    let (from, to) = slice_bounds(len, shift(start), shift(end));
    let remaining = if start < 0 {
        0
    } else {
        (offset as i64 - start).max(0) as usize
    };
    (from, to, remaining)
}

/// Position of the logical `index` in `len` items starting at `offset`.
pub fn window_index(len: usize, offset: usize, index: i64) -> Option<usize> {
    if index >= 0 && index < offset as i64 {
        return None;
    }
    let shifted = if index < 0 { index } else { index - offset as i64 };
    element_index(len, shifted)
}

/// The result of evaluating an operation: one scope, or a collection of
/// scopes produced by a filter, a sort or a join.
#[derive(Debug, Clone)]
pub enum Scoped {
    One(Arc<Scope>),
    Many {
        items: Vec<Arc<Scope>>,
        /// Logical index of the first item
        start: usize,
    },
}

impl Scoped {
    pub fn many(items: Vec<Arc<Scope>>) -> Scoped {
        Scoped::Many { items, start: 0 }
    }

    /// The plain value: the scope's value, or an array of item values.
    pub fn to_value(&self) -> Value {
        match self {
            Scoped::One(scope) => scope.value().clone(),
            Scoped::Many { items, .. } => {
                Value::Array(items.iter().map(|item| item.value().clone()).collect())
            }
        }
    }

    /// Collapse into a single scope, using `owner`'s provenance for a
    /// collection.
    pub fn into_scope(self, owner: &Scope) -> Arc<Scope> {
        match self {
            Scoped::One(scope) => scope,
            many @ Scoped::Many { .. } => owner.with_value(many.to_value()),
        }
    }
}
