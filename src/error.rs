use thiserror::Error;

use crate::plan::SourceId;

/// Errors raised while turning a syntax tree into an operation tree.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("subscript bounds must be integer literals, got {0}")]
    InvalidSubscript(String),

    #[error("subscript bound {0} is out of range")]
    SubscriptOutOfRange(i64),

    #[error("invalid object attribute assignment, use string literals as keys")]
    InvalidAssignmentKey,

    #[error("unknown function {0}()")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), got {got}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("parameter ${0} is not defined")]
    UnknownParameter(String),

    #[error("cannot derive an attribute name for {0} in object expression")]
    UnnamedObjectMember(&'static str),
}

/// Errors raised by a [`Fetcher`](crate::fetch::Fetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch failed: {0}")]
    Message(String),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("fetch failed: {message}")]
    Source {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl FetchError {
    pub fn message(message: impl Into<String>) -> Self {
        FetchError::Message(message.into())
    }
}

/// Errors raised while executing an operation tree.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("operation {0} cannot be evaluated in this position")]
    InvalidOperation(&'static str),

    #[error("in-operator does not apply to right-hand side of type {0}")]
    InOperand(&'static str),

    #[error("path containment is only valid for a string or path, got {0}")]
    PathCandidate(&'static str),

    #[error("source #{0} was consumed before it was fetched")]
    UnknownSource(SourceId),

    #[error("in a join, only one side of a comparison may reference the parent")]
    JoinOnBothSides,

    #[error("pipelines that do not start with a source cannot be fetched")]
    NotASource,

    #[error("pipeline stage {0} cannot be compiled into a fetch")]
    UncompilableStage(&'static str),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Errors raised by the document-store translator and the in-memory store.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("no selector translation for operation {0}")]
    Unsupported(&'static str),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Any failure of [`query`](crate::query::query).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("execution error: {0}")]
    Exec(#[from] ExecError),
}

impl From<FetchError> for QueryError {
    fn from(e: FetchError) -> Self {
        QueryError::Exec(ExecError::Fetch(e))
    }
}
