//! Document-store dialect.
//!
//! Filters and orderings translate into Mongo-style selector documents. A
//! translation is *exact* when the selector keeps the same documents as the
//! executor; otherwise it is a superset, never a subset. [`MemoryCollection`]
//! evaluates those selectors over documents held in memory.

mod collection;
mod selector;
mod translate;

pub use collection::{CollectionConfig, MemoryCollection};
pub use selector::{lookup, matches};
pub use translate::{Clause, NativeQuery, to_native_query, to_selector};
