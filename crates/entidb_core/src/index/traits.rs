//! Index key types and the common index trait.

use entidb_codec::Value;
use std::cmp::Ordering;

/// A value extracted from an entity's attribute map for indexing purposes.
///
/// The data model only has five primitive value kinds (text, integer,
/// float, boolean, null); a timestamp is represented as an integer
/// (milliseconds since the epoch) and therefore indexes as [`IndexKey::Int`]
/// like any other integer field. `Null` values are never indexed — a
/// missing or null field is a no-op for `insert`/`remove`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum IndexKey {
    /// An integer key (also used for timestamp fields).
    Int(i64),
    /// A floating-point key.
    Float(f64),
    /// A text key.
    Text(String),
    /// A boolean key. Not permitted in ordered indexes (not Comparable).
    Bool(bool),
}

impl IndexKey {
    /// Extracts an indexable key from a [`Value`], if any.
    ///
    /// Returns `None` for `Null`, `Bytes`, `Array`, and `Map` values, which
    /// are not indexable primitives.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(n) => Some(Self::Int(*n)),
            Value::Float(n) => Some(Self::Float(*n)),
            Value::Text(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null | Value::Bytes(_) | Value::Array(_) | Value::Map(_) => None,
        }
    }

    /// Returns the variant name, for error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
        }
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other)
            .expect("ordered index keys must be mutually comparable")
    }
}

impl std::hash::Hash for IndexKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Self::Int(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            Self::Float(n) => {
                1u8.hash(state);
                n.to_bits().hash(state);
            }
            Self::Text(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            Self::Bool(b) => {
                3u8.hash(state);
                b.hash(state);
            }
        }
    }
}

/// Common interface implemented by every index variant.
///
/// `insert`/`remove` take the entity's full attribute map; implementations
/// extract the field(s) they care about and are no-ops when the field is
/// absent. This mirrors how the original crate's indexes took whole
/// entities rather than pre-extracted keys, keeping index maintenance a
/// single call site in the collection runtime.
pub trait Index: Send + Sync {
    /// Indexes `id` using the field value(s) found in `attrs`, if present.
    fn insert(&mut self, id: &str, attrs: &Value) -> crate::error::CoreResult<()>;

    /// Removes `id` from the index using the field value(s) in `attrs`.
    fn remove(&mut self, id: &str, attrs: &Value) -> crate::error::CoreResult<()>;

    /// Returns ids whose indexed field equals `key`, in insertion order.
    fn search(&self, key: &IndexKey) -> Vec<String>;

    /// Clears all entries.
    fn clear(&mut self);

    /// Returns the number of distinct keys in the index.
    fn len(&self) -> usize;

    /// Returns true if the index has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_value_extracts_primitives() {
        assert_eq!(IndexKey::from_value(&Value::Integer(5)), Some(IndexKey::Int(5)));
        assert_eq!(IndexKey::from_value(&Value::Bool(true)), Some(IndexKey::Bool(true)));
        assert_eq!(IndexKey::from_value(&Value::Null), None);
    }

    #[test]
    fn ordering_within_same_variant() {
        assert!(IndexKey::Int(1) < IndexKey::Int(2));
        assert!(IndexKey::Text("a".into()) < IndexKey::Text("b".into()));
    }

    #[test]
    #[should_panic(expected = "mutually comparable")]
    fn ordering_across_variants_panics() {
        let _ = IndexKey::Int(1).cmp(&IndexKey::Text("a".into()));
    }
}
