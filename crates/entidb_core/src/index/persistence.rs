//! Index persistence: saving/loading index state to/from disk.
//!
//! Each (collection, field) index is written to its own file containing
//! `{field, variant, entries}`, serialized with `serde_json` so that every
//! supported key type (string, integer, float, boolean) round-trips
//! faithfully through [`crate::index::IndexKey`]'s derived `Serialize`/
//! `Deserialize` impls — the same self-describing-record strategy the
//! original crate used for its manifest and backup metadata.
//!
//! Corruption in an index file is surfaced as [`CoreError::corrupted`];
//! index state is always derivable by rebuilding from the collection's
//! entities, so callers may treat a load failure as "rebuild instead of
//! fail" if they choose to.

use crate::error::{CoreError, CoreResult};
use crate::index::{FtsIndex, HashIndex, IndexKey, OrderedIndex};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
enum IndexBody {
    Ordered {
        entries: Vec<(IndexKey, Vec<String>)>,
    },
    Hash {
        entries: Vec<(IndexKey, Vec<String>)>,
    },
    Fulltext {
        entries: Vec<(String, Vec<(String, Vec<usize>)>)>,
    },
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct IndexFile {
    field: String,
    #[serde(flatten)]
    body: IndexBody,
}

/// Returns the on-disk path for a (collection, field) index file.
#[must_use]
pub fn index_path(dir: &Path, collection: &str, field: &str) -> PathBuf {
    dir.join(format!("{collection}.{field}.index.json"))
}

fn write_file(path: &Path, file: &IndexFile) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CoreError::write_failed(e.to_string()))?;
    }
    let json = serde_json::to_vec_pretty(file).map_err(|e| CoreError::write_failed(e.to_string()))?;
    fs::write(path, json).map_err(|e| CoreError::write_failed(e.to_string()))
}

fn read_file(path: &Path) -> CoreResult<IndexFile> {
    let bytes = fs::read(path).map_err(|e| CoreError::read_failed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| CoreError::corrupted(e.to_string()))
}

/// Saves an ordered index to `dir/{collection}.{field}.index.json`.
pub fn save_ordered(dir: &Path, collection: &str, index: &OrderedIndex) -> CoreResult<()> {
    let file = IndexFile {
        field: index.field().to_string(),
        body: IndexBody::Ordered {
            entries: index.to_map(),
        },
    };
    write_file(&index_path(dir, collection, index.field()), &file)
}

/// Loads an ordered index previously saved with [`save_ordered`].
pub fn load_ordered(dir: &Path, collection: &str, field: &str) -> CoreResult<OrderedIndex> {
    let file = read_file(&index_path(dir, collection, field))?;
    let IndexBody::Ordered { entries } = file.body else {
        return Err(CoreError::corrupted(format!(
            "expected ordered index body for field {field}"
        )));
    };
    let mut index = OrderedIndex::new(file.field);
    index.restore_from_map(entries);
    Ok(index)
}

/// Saves a hash index to `dir/{collection}.{field}.index.json`.
pub fn save_hash(dir: &Path, collection: &str, index: &HashIndex) -> CoreResult<()> {
    let file = IndexFile {
        field: index.field().to_string(),
        body: IndexBody::Hash {
            entries: index.to_map(),
        },
    };
    write_file(&index_path(dir, collection, index.field()), &file)
}

/// Loads a hash index previously saved with [`save_hash`].
pub fn load_hash(dir: &Path, collection: &str, field: &str) -> CoreResult<HashIndex> {
    let file = read_file(&index_path(dir, collection, field))?;
    let IndexBody::Hash { entries } = file.body else {
        return Err(CoreError::corrupted(format!(
            "expected hash index body for field {field}"
        )));
    };
    let mut index = HashIndex::new(file.field);
    index.restore_from_map(entries);
    Ok(index)
}

/// Saves a full-text index to `dir/{collection}.{field}.index.json`.
///
/// Only the postings are persisted; tokenizer configuration (stop words,
/// minimum length, case-sensitivity) is supplied fresh by the caller on
/// load, since it is part of index *declaration*, not index *state*.
pub fn save_fulltext(dir: &Path, collection: &str, index: &FtsIndex) -> CoreResult<()> {
    let file = IndexFile {
        field: index.field().to_string(),
        body: IndexBody::Fulltext {
            entries: index.to_map(),
        },
    };
    write_file(&index_path(dir, collection, index.field()), &file)
}

/// Loads a full-text index previously saved with [`save_fulltext`], using
/// `config` for its tokenizer settings.
pub fn load_fulltext(
    dir: &Path,
    collection: &str,
    field: &str,
    config: crate::index::FtsConfig,
) -> CoreResult<FtsIndex> {
    let file = read_file(&index_path(dir, collection, field))?;
    let IndexBody::Fulltext { entries } = file.body else {
        return Err(CoreError::corrupted(format!(
            "expected fulltext index body for field {field}"
        )));
    };
    let mut index = FtsIndex::new(file.field, config);
    index.restore_from_map(entries);
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Index;
    use entidb_codec::Value;
    use tempfile::tempdir;

    fn map(field: &str, value: Value) -> Value {
        Value::Map(vec![(Value::Text(field.to_string()), value)])
    }

    #[test]
    fn ordered_index_roundtrips() {
        let dir = tempdir().unwrap();
        let mut index = OrderedIndex::new("age");
        index.insert("a", &map("age", Value::Integer(30))).unwrap();

        save_ordered(dir.path(), "users", &index).unwrap();
        let loaded = load_ordered(dir.path(), "users", "age").unwrap();

        assert_eq!(loaded.search(&IndexKey::Int(30)), vec!["a".to_string()]);
    }

    #[test]
    fn hash_index_roundtrips() {
        let dir = tempdir().unwrap();
        let mut index = HashIndex::new("name");
        index.insert("a", &map("name", Value::Text("x".into()))).unwrap();

        save_hash(dir.path(), "users", &index).unwrap();
        let loaded = load_hash(dir.path(), "users", "name").unwrap();

        assert_eq!(loaded.search(&IndexKey::Text("x".into())), vec!["a".to_string()]);
    }

    #[test]
    fn fulltext_index_roundtrips() {
        let dir = tempdir().unwrap();
        let mut index = FtsIndex::new("body", crate::index::FtsConfig::default());
        index.insert("a", &map("body", Value::Text("fox".into()))).unwrap();

        save_fulltext(dir.path(), "posts", &index).unwrap();
        let loaded = load_fulltext(dir.path(), "posts", "body", crate::index::FtsConfig::default()).unwrap();

        assert_eq!(loaded.search("fox"), vec!["a".to_string()]);
    }

    #[test]
    fn loading_wrong_variant_is_corrupted_error() {
        let dir = tempdir().unwrap();
        let mut index = HashIndex::new("name");
        index.insert("a", &map("name", Value::Text("x".into()))).unwrap();
        save_hash(dir.path(), "users", &index).unwrap();

        let result = load_ordered(dir.path(), "users", "name");
        assert!(result.is_err());
    }
}
