use std::collections::HashMap;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::{FetchError, TranslateError};
use crate::exec::{ReferenceDescriptor, compare_for_sort, find_references};
use crate::fetch::{FetchResponse, FetchSpec, Fetcher};
use crate::plan::Direction;
use crate::value::Value;

use super::selector::{lookup, matches};
use super::translate::to_native_query;

type Json = serde_json::Value;

const REFS_FIELD: &str = "@refs";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Apply sort and window in the store when the translation is exact.
    /// Off, every fetch returns the unsorted superset.
    pub pushdown: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig { pushdown: true }
    }
}

/// An in-memory document store answering fetches with translated
/// selectors.
///
/// Every stored document with a truthy `_id` carries its references in an
/// `@refs` field so `references()` filters can be answered by the selector
/// alone.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    config: CollectionConfig,
    documents: RwLock<Vec<Json>>,
}

impl MemoryCollection {
    pub fn new(config: CollectionConfig) -> Self {
        MemoryCollection {
            config,
            documents: RwLock::new(Vec::new()),
        }
    }

    pub fn with_documents(
        config: CollectionConfig,
        documents: impl IntoIterator<Item = Json>,
    ) -> Result<Self, TranslateError> {
        let collection = MemoryCollection::new(config);
        for document in documents {
            collection.insert(document)?;
        }
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Store a document, replacing any document with the same `_id`.
    pub fn insert(&self, document: Json) -> Result<(), TranslateError> {
        let Json::Object(mut fields) = document else {
            return Err(TranslateError::InvalidDocument(
                "documents must be objects".to_string(),
            ));
        };
        fields.remove(REFS_FIELD);
        // `references()` never holds for a document without a truthy `_id`
        let document = Value::from(Json::Object(fields.clone()));
        if document.get("_id").is_some_and(Value::is_truthy) {
            let references = serde_json::to_value(find_references(&document))
                .map_err(|e| TranslateError::InvalidDocument(e.to_string()))?;
            fields.insert(REFS_FIELD.to_string(), references);
        }
        let document = Json::Object(fields);

        let mut documents = self.documents.write();
        let id = document.get("_id").filter(|id| !id.is_null());
        match id.and_then(|id| documents.iter().position(|d| d.get("_id") == Some(id))) {
            Some(index) => documents[index] = document,
            None => documents.push(document),
        }
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Option<Json> {
        self.documents
            .read()
            .iter()
            .find(|document| document.get("_id").and_then(Json::as_str) == Some(id))
            .map(|document| strip_references(document.clone()).0)
    }

    /// Ids of the documents referencing `id`.
    pub fn find_referencing(&self, id: &str, include_weak: bool) -> Result<Vec<String>, TranslateError> {
        let element = if include_weak {
            json!({ "id": id })
        } else {
            json!({ "id": id, "weak": false })
        };
        let selector = json!({ REFS_FIELD: { "$elemMatch": element } });
        let mut ids = Vec::new();
        for document in self.documents.read().iter() {
            if !matches(&selector, document)? {
                continue;
            }
            if let Some(id) = document.get("_id").and_then(Json::as_str)
                && !ids.iter().any(|seen| seen == id)
            {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Answer a fetch spec. Sort and window are only applied when the
    /// selector matches exactly what the executor keeps.
    #[instrument(skip_all, level = "debug")]
    pub fn fetch_spec(&self, spec: &FetchSpec) -> Result<FetchResponse, TranslateError> {
        let query = to_native_query(spec)?;
        let Some(selector) = &query.selector else {
            debug!("filter can never match");
            return Ok(FetchResponse {
                refs: Some(HashMap::new()),
                ..Default::default()
            });
        };

        let mut found = Vec::new();
        for document in self.documents.read().iter() {
            if matches(selector, document)? {
                found.push(document.clone());
            }
        }

        let mut start = 0;
        if self.config.pushdown && query.exact && query.sortable {
            if !query.sort.is_empty() {
                sort_documents(&mut found, &query.sort);
            }
            start = query.offset.min(found.len());
            let limit = query.limit.unwrap_or(usize::MAX);
            found = found.into_iter().skip(start).take(limit).collect();
        }
        debug!(documents = found.len(), start, exact = query.exact, "fetched");

        let mut refs = HashMap::new();
        let mut results = Vec::with_capacity(found.len());
        for document in found {
            let (document, references) = strip_references(document);
            if let Some(id) = document.get("_id").and_then(Json::as_str) {
                refs.insert(id.to_string(), references);
            }
            results.push(document);
        }
        Ok(FetchResponse {
            results,
            start,
            refs: Some(refs),
        })
    }
}

impl Fetcher for MemoryCollection {
    fn fetch<'a>(&'a self, spec: &'a FetchSpec) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        async move { self.fetch_spec(spec).map_err(FetchError::from) }.boxed()
    }
}

fn sort_documents(documents: &mut [Json], sort: &[(String, i32)]) {
    let key = |document: &Json, field: &str| {
        lookup(document, field)
            .cloned()
            .map(Value::from)
            .unwrap_or_default()
    };
    documents.sort_by(|a, b| {
        sort.iter()
            .map(|(field, direction)| {
                let direction = if *direction < 0 {
                    Direction::Desc
                } else {
                    Direction::Asc
                };
                compare_for_sort(&key(a, field), &key(b, field), direction)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn strip_references(document: Json) -> (Json, Vec<ReferenceDescriptor>) {
    let Json::Object(mut fields) = document else {
        return (document, Vec::new());
    };
    let references = fields
        .remove(REFS_FIELD)
        .and_then(|refs| serde_json::from_value(refs).ok())
        .unwrap_or_default();
    (Json::Object(fields), references)
}
