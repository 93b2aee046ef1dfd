//! Index Manager - per-collection registry of field indexes.
//!
//! The manager owns one index per (field, variant) pair and dispatches
//! maintenance calls (`insert`/`remove`) to every registered index, and
//! lookups (`search`/`range_search`) to the index named by the caller.
//!
//! # Invariants
//!
//! - Users do not reference indexes directly; the collection runtime and
//!   query planner are the only callers.
//! - Index state is always rebuildable from a collection's entities;
//!   persisted index files are an optimization, not a source of truth.

use crate::error::{CoreError, CoreResult};
use crate::index::fts::ScoredId;
use crate::index::{persistence, FtsConfig, FtsIndex, HashIndex, Index, IndexKey, OrderedIndex};
use entidb_codec::Value;
use std::path::Path;

/// The kind of index to create for a field.
#[derive(Debug, Clone)]
pub enum IndexVariant {
    /// Sorted, supports range queries.
    Ordered,
    /// Unordered, equality lookup only.
    Hash,
    /// Tokenized inverted index.
    FullText(FtsConfig),
}

impl IndexVariant {
    fn name(&self) -> &'static str {
        match self {
            Self::Ordered => "ordered",
            Self::Hash => "hash",
            Self::FullText(_) => "fulltext",
        }
    }
}

enum IndexEntry {
    Ordered(OrderedIndex),
    Hash(HashIndex),
    FullText(FtsIndex),
}

impl IndexEntry {
    fn as_index(&self) -> &dyn Index {
        match self {
            Self::Ordered(i) => i,
            Self::Hash(i) => i,
            Self::FullText(i) => i,
        }
    }

    fn as_index_mut(&mut self) -> &mut dyn Index {
        match self {
            Self::Ordered(i) => i,
            Self::Hash(i) => i,
            Self::FullText(i) => i,
        }
    }

    fn variant(&self) -> IndexVariant {
        match self {
            Self::Ordered(_) => IndexVariant::Ordered,
            Self::Hash(_) => IndexVariant::Hash,
            Self::FullText(i) => IndexVariant::FullText(i.config().clone()),
        }
    }
}

/// Registry of indexes for a single collection, keyed by field name.
pub struct IndexManager {
    entries: Vec<(String, IndexEntry)>,
}

impl IndexManager {
    /// Creates an empty index manager.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.entries.iter().position(|(name, _)| name == field)
    }

    /// Returns whether an index exists for `field`.
    #[must_use]
    pub fn has_index(&self, field: &str) -> bool {
        self.position(field).is_some()
    }

    /// Creates an index of the given variant on `field`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::index_already_exists`] if one already exists.
    pub fn create_index(&mut self, field: impl Into<String>, variant: IndexVariant) -> CoreResult<()> {
        let field = field.into();
        if self.has_index(&field) {
            return Err(CoreError::index_already_exists(field));
        }
        let entry = match variant {
            IndexVariant::Ordered => IndexEntry::Ordered(OrderedIndex::new(field.clone())),
            IndexVariant::Hash => IndexEntry::Hash(HashIndex::new(field.clone())),
            IndexVariant::FullText(config) => IndexEntry::FullText(FtsIndex::new(field.clone(), config)),
        };
        self.entries.push((field, entry));
        Ok(())
    }

    /// Removes the index on `field`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::index_not_found`] if no index exists for `field`.
    pub fn remove_index(&mut self, field: &str) -> CoreResult<()> {
        let pos = self.position(field).ok_or_else(|| CoreError::index_not_found(field))?;
        self.entries.remove(pos);
        Ok(())
    }

    /// Feeds `(id, attrs)` into every registered index.
    pub fn insert(&mut self, id: &str, attrs: &Value) -> CoreResult<()> {
        for (_, entry) in &mut self.entries {
            entry.as_index_mut().insert(id, attrs)?;
        }
        Ok(())
    }

    /// Removes `(id, attrs)` from every registered index.
    pub fn remove(&mut self, id: &str, attrs: &Value) -> CoreResult<()> {
        for (_, entry) in &mut self.entries {
            entry.as_index_mut().remove(id, attrs)?;
        }
        Ok(())
    }

    /// Clears the contents of every registered index (definitions remain).
    pub fn clear_all_entries(&mut self) {
        for (_, entry) in &mut self.entries {
            entry.as_index_mut().clear();
        }
    }

    /// Removes every index definition.
    pub fn remove_all(&mut self) {
        self.entries.clear();
    }

    /// Returns the field names of all registered indexes.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Performs a point search on the named field's index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::index_not_found`] if no index exists for `field`.
    pub fn search(&self, field: &str, key: &IndexKey) -> CoreResult<Vec<String>> {
        let pos = self.position(field).ok_or_else(|| CoreError::index_not_found(field))?;
        Ok(self.entries[pos].1.as_index().search(key))
    }

    /// Performs a range search on the named field's ordered index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::index_not_found`] if absent, or
    /// [`CoreError::index_unsupported_type`] if the field's index is not
    /// ordered.
    pub fn range_search(
        &self,
        field: &str,
        lo: Option<&IndexKey>,
        hi: Option<&IndexKey>,
        include_lower: bool,
        include_upper: bool,
    ) -> CoreResult<Vec<String>> {
        let pos = self.position(field).ok_or_else(|| CoreError::index_not_found(field))?;
        match &self.entries[pos].1 {
            IndexEntry::Ordered(index) => {
                Ok(index.range_search(lo, hi, include_lower, include_upper))
            }
            _ => Err(CoreError::index_unsupported_type(format!(
                "field {field} is not an ordered index"
            ))),
        }
    }

    /// Returns a reference to the full-text index on `field`, if one exists
    /// and is of that variant. Used by the query planner to dispatch
    /// phrase/proximity/prefix/ranked search.
    #[must_use]
    pub fn fulltext(&self, field: &str) -> Option<&FtsIndex> {
        self.position(field).and_then(|pos| match &self.entries[pos].1 {
            IndexEntry::FullText(index) => Some(index),
            _ => None,
        })
    }

    /// `searchRanked` passthrough for the named full-text field.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::index_not_found`] if no full-text index exists
    /// for `field`.
    pub fn search_ranked(&self, field: &str, text: &str) -> CoreResult<Vec<ScoredId>> {
        self.fulltext(field)
            .map(|index| index.search_ranked(text))
            .ok_or_else(|| CoreError::index_not_found(field))
    }

    /// Persists every registered index to `dir` under `collection`'s name.
    pub fn save_all(&self, dir: &Path, collection: &str) -> CoreResult<()> {
        for (field, entry) in &self.entries {
            match entry {
                IndexEntry::Ordered(index) => persistence::save_ordered(dir, collection, index)?,
                IndexEntry::Hash(index) => persistence::save_hash(dir, collection, index)?,
                IndexEntry::FullText(index) => persistence::save_fulltext(dir, collection, index)?,
            }
            let _ = field;
        }
        Ok(())
    }

    /// Loads every currently-registered index's persisted state from `dir`.
    ///
    /// Index *definitions* (which fields have indexes, and of what variant)
    /// must already exist in this manager; this only restores their
    /// contents. Returns the number of indexes successfully loaded.
    pub fn load_all(&mut self, dir: &Path, collection: &str) -> CoreResult<usize> {
        let mut loaded = 0;
        for (field, entry) in &mut self.entries {
            let result = match entry.variant() {
                IndexVariant::Ordered => {
                    persistence::load_ordered(dir, collection, field).map(IndexEntry::Ordered)
                }
                IndexVariant::Hash => {
                    persistence::load_hash(dir, collection, field).map(IndexEntry::Hash)
                }
                IndexVariant::FullText(config) => {
                    persistence::load_fulltext(dir, collection, field, config).map(IndexEntry::FullText)
                }
            };
            if let Ok(loaded_entry) = result {
                *entry = loaded_entry;
                loaded += 1;
            }
        }
        Ok(loaded)
    }
}

impl Default for IndexManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn map(field: &str, value: Value) -> Value {
        Value::Map(vec![(Value::Text(field.to_string()), value)])
    }

    #[test]
    fn create_and_detect_index() {
        let mut manager = IndexManager::new();
        manager.create_index("age", IndexVariant::Ordered).unwrap();
        assert!(manager.has_index("age"));
    }

    #[test]
    fn duplicate_create_fails() {
        let mut manager = IndexManager::new();
        manager.create_index("age", IndexVariant::Ordered).unwrap();
        assert!(manager.create_index("age", IndexVariant::Hash).is_err());
    }

    #[test]
    fn search_missing_field_errors() {
        let manager = IndexManager::new();
        assert!(manager.search("age", &IndexKey::Int(1)).is_err());
    }

    #[test]
    fn insert_and_search_dispatch() {
        let mut manager = IndexManager::new();
        manager.create_index("age", IndexVariant::Ordered).unwrap();
        manager.insert("a", &map("age", Value::Integer(30))).unwrap();
        assert_eq!(manager.search("age", &IndexKey::Int(30)).unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn range_search_rejects_non_ordered() {
        let mut manager = IndexManager::new();
        manager.create_index("name", IndexVariant::Hash).unwrap();
        let result = manager.range_search("name", None, None, true, false);
        assert!(result.is_err());
    }

    #[test]
    fn remove_index_then_missing() {
        let mut manager = IndexManager::new();
        manager.create_index("age", IndexVariant::Ordered).unwrap();
        manager.remove_index("age").unwrap();
        assert!(!manager.has_index("age"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let mut manager = IndexManager::new();
        manager.create_index("age", IndexVariant::Ordered).unwrap();
        manager.insert("a", &map("age", Value::Integer(5))).unwrap();
        manager.save_all(dir.path(), "users").unwrap();

        let mut restored = IndexManager::new();
        restored.create_index("age", IndexVariant::Ordered).unwrap();
        let loaded = restored.load_all(dir.path(), "users").unwrap();

        assert_eq!(loaded, 1);
        assert_eq!(restored.search("age", &IndexKey::Int(5)).unwrap(), vec!["a".to_string()]);
    }
}
