//! Execution of operation trees.
//!
//! Values flow through execution wrapped in a [`Scope`], which remembers the
//! source document and path a value was reached by. Comparisons use
//! three-valued logic: anything that is not comparable yields null, and
//! `and`/`or`/`not` propagate null unless one side alone decides.

mod context;
mod executor;
mod functions;
mod matcher;
mod references;
mod scope;
mod sort;

pub use context::{ExecutionContext, SourceData};
pub use executor::Executor;
pub(crate) use executor::binary;
pub use matcher::{TermMatcher, match_text, match_value};
pub use references::{ReferenceDescriptor, ReferencePathSegment, find_references};
pub use scope::{Scope, ScopeStep, Scoped, element_index, resolve_path, slice_bounds};
pub use sort::{compare_for_sort, type_rank};
