//! Fetching documents for a pipeline's source.
//!
//! Before a pipeline runs, its stages are folded into a [`FetchSpec`] (a
//! filter, a window and an ordering) that a [`Fetcher`] may use to narrow
//! what it returns. Fetchers are allowed to return more than the fetch spec
//! asks for: every predicate is evaluated again on the returned documents.

mod compile;
mod generalize;
mod spec;

use std::collections::HashMap;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::exec::ReferenceDescriptor;

pub(crate) use compile::compile;
pub use generalize::generalize_join_filter;
pub use spec::FetchSpec;

/// Documents returned for one [`FetchSpec`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FetchResponse {
    /// A superset of the documents matching the spec's filter
    pub results: Vec<serde_json::Value>,
    /// How much of the requested window was already skipped, 0 when the
    /// window was not applied
    #[serde(default)]
    pub start: usize,
    /// References of the returned documents keyed by document id. Computed
    /// on demand when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<HashMap<String, Vec<ReferenceDescriptor>>>,
}

impl FetchResponse {
    pub fn new(results: Vec<serde_json::Value>) -> Self {
        FetchResponse {
            results,
            ..Default::default()
        }
    }
}

/// Resolves a [`FetchSpec`] into candidate documents.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, spec: &'a FetchSpec) -> BoxFuture<'a, Result<FetchResponse, FetchError>>;
}

/// A [`Fetcher`] backed by a closure.
pub struct FetchFn<F>(F);

/// Wrap an async closure as a [`Fetcher`].
///
/// ```
/// use vellum::fetch::{FetchResponse, fetch_fn};
///
/// let fetcher = fetch_fn(|_spec| async { Ok(FetchResponse::new(vec![])) });
/// # let _ = fetcher;
/// ```
pub fn fetch_fn<F, Fut>(f: F) -> FetchFn<F>
where
    F: Fn(FetchSpec) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResponse, FetchError>> + Send + 'static,
{
    FetchFn(f)
}

impl<F, Fut> Fetcher for FetchFn<F>
where
    F: Fn(FetchSpec) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResponse, FetchError>> + Send + 'static,
{
    fn fetch<'a>(&'a self, spec: &'a FetchSpec) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        (self.0)(spec.clone()).boxed()
    }
}
