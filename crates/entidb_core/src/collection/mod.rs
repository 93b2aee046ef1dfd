//! Typed collection API.
//!
//! Provides `Collection<T>` for type-safe entity storage, the `Entity`
//! trait bridging typed values and attribute maps, and the `Query` tree
//! evaluated by the collection's index-aware planner.

mod codec;
mod locks;
mod query;
mod typed;

pub use codec::Entity;
pub use query::{EmptyQueryListError, Query};
pub use typed::Collection;
