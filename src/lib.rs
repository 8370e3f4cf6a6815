//! An embeddable query engine for JSON document collections.
//!
//! Queries arrive as a parsed syntax tree ([`Node`]), are planned into an
//! operation tree and executed against documents supplied by a [`Fetcher`].
//! Before each source is read, the stages that follow it are compiled into
//! a [`FetchSpec`] so the fetcher can narrow, sort and window the documents
//! it returns.
//!
//! ```
//! use vellum::{MemoryCollection, Node, QueryOptions, query};
//! use vellum::native::CollectionConfig;
//! use serde_json::json;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let posts = MemoryCollection::with_documents(
//!     CollectionConfig::default(),
//!     vec![
//!         json!({"_id": "a", "_type": "post"}),
//!         json!({"_id": "b", "_type": "author"}),
//!     ],
//! )
//! .unwrap();
//!
//! let tree: Node = serde_json::from_value(json!({
//!     "node": "pipeOperator",
//!     "lhs": {"node": "everything"},
//!     "rhs": {"node": "constraint", "expression": {
//!         "node": "binaryOperator", "operator": "equals",
//!         "lhs": {"node": "attribute", "path": "_type"},
//!         "rhs": {"node": "string", "value": "post"}}}
//! }))
//! .unwrap();
//!
//! let result = query(&QueryOptions::new(tree), &posts).await.unwrap();
//! assert_eq!(result, json!([{"_id": "a", "_type": "post"}]));
//! # });
//! # }
//! ```

pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod native;
pub mod path;
pub mod plan;
pub mod query;
pub mod value;

pub use ast::Node;
pub use error::{ExecError, FetchError, PlanError, QueryError, TranslateError};
pub use fetch::{FetchResponse, FetchSpec, Fetcher, fetch_fn};
pub use native::MemoryCollection;
pub use path::Path;
pub use plan::{Operation, plan};
pub use query::{QueryOptions, matches_filter, query};
pub use value::Value;
