//! Execute parsed queries against a JSON collection

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::CliError;
use crate::ast::Node;
use crate::error::QueryError;
use crate::exec::{Executor, Scope};
use crate::fetch::{FetchSpec, compile};
use crate::native::{CollectionConfig, MemoryCollection};
use crate::plan::{Operation, plan};
use crate::query::{QueryOptions, query};

/// Options for the run and explain commands
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Parser output for the query, as JSON
    pub query: String,
    /// JSON array of documents
    pub documents: Option<String>,
    /// Parser output for a filter applied after every source
    pub global_filter: Option<String>,
    pub params: HashMap<String, serde_json::Value>,
    pub config: CollectionConfig,
}

impl RunOptions {
    fn query_options(&self) -> Result<QueryOptions, CliError> {
        let mut options =
            QueryOptions::new(serde_json::from_str(&self.query)?).with_params(self.params.clone());
        if let Some(filter) = &self.global_filter {
            options = options.with_global_filter(serde_json::from_str::<Node>(filter)?);
        }
        Ok(options)
    }

    fn collection(&self) -> Result<MemoryCollection, CliError> {
        let documents = self.documents.as_ref().ok_or(CliError::NoDocuments)?;
        let documents: Vec<serde_json::Value> = serde_json::from_str(documents)?;
        debug!(documents = documents.len(), "loading collection");
        Ok(MemoryCollection::with_documents(
            self.config.clone(),
            documents,
        )?)
    }
}

/// Split a `name=<json>` parameter. A value that is not valid JSON is taken
/// as a plain string.
pub fn parse_param(raw: &str) -> Result<(String, serde_json::Value), CliError> {
    let (name, value) = raw
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| CliError::Param(raw.to_string()))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

/// Run a query against the documents in `options`.
pub async fn execute_run(options: &RunOptions) -> Result<serde_json::Value, CliError> {
    let collection = options.collection()?;
    Ok(query(&options.query_options()?, &collection).await?)
}

/// The operation tree of a query and the fetch its root source would make.
#[derive(Debug, Serialize)]
pub struct ExplainOutput {
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchSpec>,
}

/// Plan a query and compile its root pipeline without running it. Joins
/// that need sibling documents resolve against an empty collection unless
/// documents are given.
pub async fn execute_explain(options: &RunOptions) -> Result<ExplainOutput, CliError> {
    let query_options = options.query_options()?;
    let operation = plan(
        &query_options.query,
        query_options.global_filter.as_ref(),
        &query_options.params,
    )?;

    let collection = match options.documents {
        Some(_) => options.collection()?,
        None => MemoryCollection::new(options.config.clone()),
    };
    let fetch = match &operation {
        Operation::Pipe(pipeline) if pipeline.source_id().is_some() => {
            let executor = Executor::new(&collection);
            let spec = compile(&executor, pipeline, &Scope::root())
                .await
                .map_err(QueryError::from)?;
            Some(spec)
        }
        _ => None,
    };
    Ok(ExplainOutput { operation, fetch })
}
