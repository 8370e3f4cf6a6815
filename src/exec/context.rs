use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::fetch::FetchResponse;
use crate::plan::SourceId;
use crate::value::Value;

use super::references::ReferenceDescriptor;

/// Documents fetched for one source.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub documents: Vec<Value>,
    /// Logical index of the first document
    pub start: usize,
}

/// Caches shared by every scope of one execution: fetched sources and the
/// references of every document seen so far. Dropped with the execution.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    sources: Mutex<HashMap<SourceId, Arc<SourceData>>>,
    references: Mutex<HashMap<String, Arc<Vec<ReferenceDescriptor>>>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_source(&self, id: SourceId) -> bool {
        self.sources.lock().contains_key(&id)
    }

    pub fn source(&self, id: SourceId) -> Option<Arc<SourceData>> {
        self.sources.lock().get(&id).cloned()
    }

    /// Record a fetch response as the data of `id`.
    pub fn store(&self, id: SourceId, response: FetchResponse) {
        if let Some(refs) = response.refs {
            let mut references = self.references.lock();
            for (document, descriptors) in refs {
                references.insert(document, Arc::new(descriptors));
            }
        }
        let data = SourceData {
            documents: response.results.into_iter().map(Value::from).collect(),
            start: response.start,
        };
        trace!(source = %id, documents = data.documents.len(), start = data.start, "source cached");
        self.sources.lock().insert(id, Arc::new(data));
    }

    /// References of a document, computed with `scan` on first use.
    pub fn references_of(
        &self,
        document_id: &str,
        scan: impl FnOnce() -> Vec<ReferenceDescriptor>,
    ) -> Arc<Vec<ReferenceDescriptor>> {
        if let Some(found) = self.references.lock().get(document_id) {
            return Arc::clone(found);
        }
        let found = Arc::new(scan());
        self.references
            .lock()
            .insert(document_id.to_string(), Arc::clone(&found));
        found
    }
}
