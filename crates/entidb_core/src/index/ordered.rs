//! Ordered (sorted) index implementation.

use crate::error::{CoreError, CoreResult};
use crate::index::traits::{Index, IndexKey};
use crate::path;
use entidb_codec::Value;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Index backed by a sorted mapping from keys to ordered id lists.
///
/// Supports point lookup, range scans, and `minKey`/`maxKey`. Boolean keys
/// are rejected — booleans are not Comparable by contract and are only
/// usable through [`crate::index::HashIndex`].
pub struct OrderedIndex {
    field: String,
    entries: BTreeMap<IndexKey, Vec<String>>,
    count: usize,
}

impl OrderedIndex {
    /// Creates a new ordered index over `field`.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            entries: BTreeMap::new(),
            count: 0,
        }
    }

    /// Returns the field this index covers.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    fn extract_key(&self, attrs: &Value) -> CoreResult<Option<IndexKey>> {
        let Some(value) = path::resolve(attrs, &self.field) else {
            return Ok(None);
        };
        match IndexKey::from_value(value) {
            Some(IndexKey::Bool(_)) => Err(CoreError::index_unsupported_type(
                "boolean keys are not permitted in ordered indexes",
            )),
            other => Ok(other),
        }
    }

    /// Returns ids with keys in `[lo, hi)` by default, honoring the
    /// inclusivity flags. `None` bounds are unbounded on that side.
    #[must_use]
    pub fn range_search(
        &self,
        lo: Option<&IndexKey>,
        hi: Option<&IndexKey>,
        include_lower: bool,
        include_upper: bool,
    ) -> Vec<String> {
        let lower = match lo {
            Some(k) if include_lower => Bound::Included(k.clone()),
            Some(k) => Bound::Excluded(k.clone()),
            None => Bound::Unbounded,
        };
        let upper = match hi {
            Some(k) if include_upper => Bound::Included(k.clone()),
            Some(k) => Bound::Excluded(k.clone()),
            None => Bound::Unbounded,
        };
        let mut result = Vec::new();
        for (_, ids) in self.entries.range((lower, upper)) {
            result.extend(ids.iter().cloned());
        }
        result
    }

    /// Returns the smallest key, if any.
    #[must_use]
    pub fn min_key(&self) -> Option<&IndexKey> {
        self.entries.keys().next()
    }

    /// Returns the largest key, if any.
    #[must_use]
    pub fn max_key(&self) -> Option<&IndexKey> {
        self.entries.keys().next_back()
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

impl Index for OrderedIndex {
    fn insert(&mut self, id: &str, attrs: &Value) -> CoreResult<()> {
        let Some(key) = self.extract_key(attrs)? else {
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
        let Some(key) = self.extract_key(attrs)? else {
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
