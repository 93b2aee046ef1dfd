//! Entity identity.

mod id;

pub use id::{is_reserved_id, EntityId, MIGRATION_HISTORY_ID, SCHEMA_VERSION_ID};
