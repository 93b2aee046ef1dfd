//! Hash index implementation.

use crate::error::CoreResult;
use crate::index::traits::{Index, IndexKey};
use crate::path;
use entidb_codec::Value;
use std::collections::HashMap;

/// Index backed by an unordered key→ids mapping.
///
/// Supports only point lookup (`search`) and `containsKey`; use
/// [`crate::index::OrderedIndex`] for range queries.
pub struct HashIndex {
    field: String,
    entries: HashMap<IndexKey, Vec<String>>,
    count: usize,
}

impl HashIndex {
    /// Creates a new hash index over `field`.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            entries: HashMap::new(),
            count: 0,
        }
    }

    /// Returns the field this index covers.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns whether the given key has at least one entry.
    #[must_use]
    pub fn contains_key(&self, key: &IndexKey) -> bool {
        self.entries.contains_key(key)
    }

    fn extract_key(&self, attrs: &Value) -> Option<IndexKey> {
        path::resolve(attrs, &self.field).and_then(IndexKey::from_value)
    }

    /// Exports the index as a key→ids map, for persistence.
    #[must_use]
    pub fn to_map(&self) -> Vec<(IndexKey, Vec<String>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Restores the index from a previously exported map, replacing any
    /// existing contents.
    pub fn restore_from_map(&mut self, entries: Vec<(IndexKey, Vec<String>)>) {
        self.count = entries.iter().map(|(_, ids)| ids.len()).sum();
        self.entries = entries.into_iter().collect();
    }
}

impl Index for HashIndex {
    fn insert(&mut self, id: &str, attrs: &Value) -> CoreResult<()> {
        let Some(key) = self.extract_key(attrs) else {
            return Ok(());
        };
        let ids = self.entries.entry(key).or_default();
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
            self.count += 1;
        }
        Ok(())
    }

    fn remove(&mut self, id: &str, attrs: &Value) -> CoreResult<()> {
        let Some(key) = self.extract_key(attrs) else {
            return Ok(());
        };
        if let Some(ids) = self.entries.get_mut(&key) {
            if let Some(pos) = ids.iter().position(|existing| existing == id) {
                ids.remove(pos);
                self.count -= 1;
                if ids.is_empty() {
                    self.entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn search(&self, key: &IndexKey) -> Vec<String> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }

    fn len(&self) -> usize {
        self.count
    }
}
