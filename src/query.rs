use std::collections::HashMap;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, instrument};

use crate::ast::Node;
use crate::error::{FetchError, QueryError};
use crate::exec::Executor;
use crate::fetch::{FetchResponse, FetchSpec, Fetcher};
use crate::plan::plan;

/// Everything a query needs besides the fetcher.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub query: Node,
    /// Values bound to `$name` parameters
    pub params: HashMap<String, serde_json::Value>,
    /// Filter applied after every source of the query, typically the
    /// caller's permission scope
    pub global_filter: Option<Node>,
}

impl QueryOptions {
    pub fn new(query: Node) -> Self {
        QueryOptions {
            query,
            params: HashMap::new(),
            global_filter: None,
        }
    }

    pub fn with_params(mut self, params: HashMap<String, serde_json::Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_global_filter(mut self, filter: Node) -> Self {
        self.global_filter = Some(filter);
        self
    }
}

/// Plan and execute a query, fetching documents through `fetcher`.
///
/// Every execution owns its own caches, so concurrent queries may share a
/// fetcher freely.
#[instrument(skip_all)]
pub async fn query(
    options: &QueryOptions,
    fetcher: &dyn Fetcher,
) -> Result<serde_json::Value, QueryError> {
    let operation = plan(
        &options.query,
        options.global_filter.as_ref(),
        &options.params,
    )?;
    debug!(?operation, "planned");
    let executor = Executor::new(fetcher);
    let value = executor.run(&operation).await?;
    Ok(value.into())
}

/// Answers every fetch with one document.
struct SingleDocument(serde_json::Value);

impl Fetcher for SingleDocument {
    fn fetch<'a>(&'a self, _spec: &'a FetchSpec) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        let response = FetchResponse::new(vec![self.0.clone()]);
        futures::future::ready(Ok(response)).boxed()
    }
}

/// Whether `document` passes `filter`, evaluated exactly as `*[filter]`
/// would evaluate it against a collection holding only that document.
pub async fn matches_filter(
    document: &serde_json::Value,
    filter: &Node,
    params: &HashMap<String, serde_json::Value>,
) -> Result<bool, QueryError> {
    let options = QueryOptions::new(Node::filtered_everything(filter.clone()))
        .with_params(params.clone());
    let result = query(&options, &SingleDocument(document.clone())).await?;
    Ok(result.as_array().is_some_and(|kept| !kept.is_empty()))
}
