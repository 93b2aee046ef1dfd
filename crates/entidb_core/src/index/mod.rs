//! Index implementations for access paths.
//!
//! EntiDB indexes are internal optimizations maintained by the collection
//! runtime, not a query DSL — callers never reference an index by name;
//! the query planner consults the index manager to accelerate indexable
//! predicates and falls back to a full scan otherwise.
//!
//! # Index Variants
//!
//! - [`OrderedIndex`]: sorted traversal, point lookup, and range queries
//! - [`HashIndex`]: O(1) equality lookup
//! - [`FtsIndex`]: tokenized full-text search with ranked (TF-IDF) results

mod engine;
mod fts;
mod hash;
mod ordered;
pub mod persistence;
mod traits;

pub use engine::{IndexManager, IndexVariant};
pub use fts::{FtsConfig, FtsIndex, ScoredId};
pub use hash::HashIndex;
pub use ordered::OrderedIndex;
pub use traits::{Index, IndexKey};
