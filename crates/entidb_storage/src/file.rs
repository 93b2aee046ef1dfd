//! Single-file storage backend for persistent storage.

use crate::error::{StorageError, StorageResult};
use crate::port::StoragePort;
use entidb_codec::Value;
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// A single-file storage port.
///
/// The entire key→attribute-map store is held in memory and rewritten to a
/// single file (JSON, one object per line is not used here - the whole map
/// is serialized as one JSON document) on every mutating call. This keeps
/// the format simple and self-describing at the cost of O(n) writes; the
/// port contract does not require anything cleverer; callers needing more
/// throughput compose this with `entidb_core`'s transaction batching.
///
/// # Durability
///
/// Every mutating call rewrites the file and calls `sync_all`. An advisory
/// `fs2` lock on the file guards against two processes opening the same
/// path concurrently.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    file: RwLock<File>,
    cache: RwLock<HashMap<String, Value>>,
    open: AtomicBool,
}

impl FileStorage {
    /// Opens or creates a file-backed store at `path`.
    ///
    /// Parent directories are created if missing. If the file already
    /// contains data it is loaded and validated immediately; the store
    /// still starts closed - call [`StoragePort::open`] to use it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directories cannot be
    /// created, the advisory lock cannot be acquired, or existing contents
    /// are corrupted.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        file.try_lock_exclusive()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        let cache = load_cache(&file)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            cache: RwLock::new(cache),
            open: AtomicBool::new(false),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn require_open(&self) -> StorageResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StorageError::Closed)
        }
    }

    fn persist(&self, cache: &HashMap<String, Value>) -> StorageResult<()> {
        let doc = Value::map(
            cache
                .iter()
                .map(|(k, v)| (Value::Text(k.clone()), v.clone()))
                .collect(),
        );
        let json = serde_json::to_vec(&doc)
            .map_err(|e| StorageError::Corrupted(format!("encode failed: {e}")))?;

        let mut file = self.file.write();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&json)?;
        file.sync_all()?;
        Ok(())
    }
}

fn load_cache(file: &File) -> StorageResult<HashMap<String, Value>> {
    let mut file = file.try_clone()?;
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;

    if buf.is_empty() {
        return Ok(HashMap::new());
    }

    let doc: Value = serde_json::from_slice(&buf)
        .map_err(|e| StorageError::Corrupted(format!("decode failed: {e}")))?;

    match doc {
        Value::Map(pairs) => pairs
            .into_iter()
            .map(|(k, v)| match k {
                Value::Text(s) => Ok((s, v)),
                other => Err(StorageError::Corrupted(format!(
                    "expected text key, found {other:?}"
                ))),
            })
            .collect(),
        other => Err(StorageError::Corrupted(format!(
            "expected top-level map, found {other:?}"
        ))),
    }
}

impl StoragePort for FileStorage {
    fn open(&self) -> StorageResult<()> {
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        if self.open.load(Ordering::Acquire) {
            self.persist(&self.cache.read())?;
        }
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn get(&self, id: &str) -> StorageResult<Option<Value>> {
        self.require_open()?;
        Ok(self.cache.read().get(id).cloned())
    }

    fn get_all(&self) -> StorageResult<HashMap<String, Value>> {
        self.require_open()?;
        Ok(self.cache.read().clone())
    }

    fn insert(&self, id: &str, map: Value) -> StorageResult<()> {
        self.require_open()?;
        let mut cache = self.cache.write();
        if cache.contains_key(id) {
            return Err(StorageError::already_exists(id));
        }
        cache.insert(id.to_string(), map);
        self.persist(&cache)
    }

    fn update(&self, id: &str, map: Value) -> StorageResult<()> {
        self.require_open()?;
        let mut cache = self.cache.write();
        if !cache.contains_key(id) {
            return Err(StorageError::not_found(id));
        }
        cache.insert(id.to_string(), map);
        self.persist(&cache)
    }

    fn upsert(&self, id: &str, map: Value) -> StorageResult<()> {
        self.require_open()?;
        let mut cache = self.cache.write();
        cache.insert(id.to_string(), map);
        self.persist(&cache)
    }

    fn delete(&self, id: &str) -> StorageResult<bool> {
        self.require_open()?;
        let mut cache = self.cache.write();
        let removed = cache.remove(id).is_some();
        if removed {
            self.persist(&cache)?;
        }
        Ok(removed)
    }

    fn delete_all(&self) -> StorageResult<()> {
        self.require_open()?;
        let mut cache = self.cache.write();
        cache.clear();
        self.persist(&cache)
    }

    fn insert_many(&self, entries: HashMap<String, Value>) -> StorageResult<()> {
        self.require_open()?;
        let mut cache = self.cache.write();
        cache.extend(entries);
        self.persist(&cache)
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        self.require_open()?;
        Ok(self.cache.read().contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn opened(path: &Path) -> FileStorage {
        let storage = FileStorage::open(path).unwrap();
        storage.open().unwrap();
        storage
    }

    #[test]
    fn file_create_new_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let storage = opened(&path);
        assert!(storage.get_all().unwrap().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn file_insert_and_get() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let storage = opened(&path);
        storage.insert("u1", Value::Integer(42)).unwrap();
        assert_eq!(storage.get("u1").unwrap(), Some(Value::Integer(42)));
    }

    #[test]
    fn file_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        {
            let storage = opened(&path);
            storage.insert("u1", Value::Text("hello".into())).unwrap();
            storage.close().unwrap();
        }
        {
            let storage = FileStorage::open(&path).unwrap();
            storage.open().unwrap();
            assert_eq!(
                storage.get("u1").unwrap(),
                Some(Value::Text("hello".into()))
            );
        }
    }

    #[test]
    fn file_insert_duplicate_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let storage = opened(&path);
        storage.insert("u1", Value::Integer(1)).unwrap();
        assert!(matches!(
            storage.insert("u1", Value::Integer(2)),
            Err(StorageError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn file_closed_rejects_operations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let storage = FileStorage::open(&path).unwrap();
        assert!(matches!(storage.get("x"), Err(StorageError::Closed)));
    }

    #[test]
    fn file_delete_all_empties_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let storage = opened(&path);
        storage.insert("u1", Value::Integer(1)).unwrap();
        storage.insert("u2", Value::Integer(2)).unwrap();
        storage.delete_all().unwrap();
        assert!(storage.get_all().unwrap().is_empty());
    }
}
