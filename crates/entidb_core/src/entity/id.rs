//! Entity identifier.

use std::fmt;
use uuid::Uuid;

/// Unique identifier for an entity.
///
/// The data model only requires identifiers to be process-wide unique
/// strings; this wraps a UUID v4 string for generated ids but accepts any
/// caller-supplied string, since entities may arrive with ids already
/// assigned (e.g. natural keys, migrated data).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new random entity id (UUID v4, hyphenated form).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing string as an entity id.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the inner `String`.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns whether this id is reserved (begins with a double underscore).
    ///
    /// Reserved ids (`__schema_version__`, `__migration_history__`) are
    /// invisible to user-facing operations.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with("__")
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns whether a raw id string is reserved.
///
/// Free function mirroring [`EntityId::is_reserved`] for call sites that
/// only have a `&str` (e.g. iterating a storage port's `get_all` result).
#[must_use]
pub fn is_reserved_id(id: &str) -> bool {
    id.starts_with("__")
}

/// The reserved id holding the current schema version record.
pub const SCHEMA_VERSION_ID: &str = "__schema_version__";

/// The reserved id holding the migration history ring.
pub const MIGRATION_HISTORY_ID: &str = "__migration_history__";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_unique() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn from_string_roundtrip() {
        let id = EntityId::from_string("u1");
        assert_eq!(id.as_str(), "u1");
        assert_eq!(id.into_string(), "u1".to_string());
    }

    #[test]
    fn reserved_ids_detected() {
        assert!(EntityId::from_string("__schema_version__").is_reserved());
        assert!(!EntityId::from_string("u1").is_reserved());
        assert!(is_reserved_id(SCHEMA_VERSION_ID));
        assert!(is_reserved_id(MIGRATION_HISTORY_ID));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = EntityId::from_string("a");
        let b = EntityId::from_string("b");
        assert!(a < b);
    }

    #[test]
    fn display() {
        let id = EntityId::from_string("u1");
        assert_eq!(format!("{id}"), "u1");
    }
}
