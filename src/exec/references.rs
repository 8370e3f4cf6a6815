use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Where a reference sits inside its document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ReferencePathSegment {
    Field(String),
    Index(usize),
    /// Array element addressed by its `_key`
    Keyed { _key: String },
}

/// A `{_ref, _weak?}` marker found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReferenceDescriptor {
    pub id: String,
    #[serde(default)]
    pub weak: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<ReferencePathSegment>,
}

/// Scan a document for reference markers at any depth.
///
/// A marker is an object with a non-empty string `_ref`. Its own fields are
/// not scanned further. Array elements are addressed by `_key` when they
/// carry one, by index otherwise.
pub fn find_references(document: &Value) -> Vec<ReferenceDescriptor> {
    let mut found = Vec::new();
    collect(document, &mut Vec::new(), &mut found);
    found
}

fn collect(
    value: &Value,
    path: &mut Vec<ReferencePathSegment>,
    found: &mut Vec<ReferenceDescriptor>,
) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let segment = match item.get("_key").and_then(Value::as_str) {
                    Some(key) if !key.is_empty() => ReferencePathSegment::Keyed {
                        _key: key.to_string(),
                    },
                    _ => ReferencePathSegment::Index(index),
                };
                path.push(segment);
                collect(item, path, found);
                path.pop();
            }
        }
        Value::Object(fields) => {
            if let Some(id) = fields.get("_ref").and_then(Value::as_str).filter(|id| !id.is_empty()) {
                found.push(ReferenceDescriptor {
                    id: id.to_string(),
                    weak: fields.get("_weak").and_then(Value::as_bool).unwrap_or(false),
                    path: path.clone(),
                });
                return;
            }
            let mut keys: Vec<_> = fields.keys().collect();
            keys.sort();
            for key in keys {
                path.push(ReferencePathSegment::Field(key.clone()));
                collect(&fields[key], path, found);
                path.pop();
            }
        }
        _ => {}
    }
}

/// True when `document` has an `_id` and references any of `ids`. The scan
/// result is cached per document id in `context`.
pub(crate) fn does_reference(
    document: &Value,
    ids: &[Value],
    context: &super::ExecutionContext,
) -> bool {
    let Some(id) = document.get("_id").filter(|id| id.is_truthy()) else {
        return false;
    };
    let key = match id {
        Value::String(s) => s.clone(),
        other => serde_json::Value::from(other.clone()).to_string(),
    };
    let references = context.references_of(&key, || find_references(document));
    references
        .iter()
        .any(|reference| ids.iter().any(|id| id.as_str() == Some(reference.id.as_str())))
}
