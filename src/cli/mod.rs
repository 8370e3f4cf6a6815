//! CLI support for vellum
//!
//! Runs a parsed query against a JSON collection held in memory, for use
//! from the `vellum` binary or from other tools that embed it.

mod run;

pub use run::{ExplainOutput, RunOptions, execute_explain, execute_run, parse_param};

use std::io;

use thiserror::Error;

use crate::error::{PlanError, QueryError, TranslateError};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Query failed: {0}")]
    Query(#[from] QueryError),

    #[error("Invalid documents: {0}")]
    Documents(#[from] TranslateError),

    #[error("Invalid parameter '{0}', expected name=<json>")]
    Param(String),

    #[error("No documents provided. Use --documents or pipe a JSON array to stdin.")]
    NoDocuments,
}

impl From<PlanError> for CliError {
    fn from(e: PlanError) -> Self {
        CliError::Query(QueryError::Plan(e))
    }
}
