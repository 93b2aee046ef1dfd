//! In-memory storage backend for testing and ephemeral databases.

use crate::error::{StorageError, StorageResult};
use crate::port::StoragePort;
use entidb_codec::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory storage port.
///
/// Suitable for unit tests, integration tests, and ephemeral databases that
/// don't need persistence. Thread-safe; can be shared across threads behind
/// an `Arc`.
///
/// # Example
///
/// ```rust
/// use entidb_storage::{StoragePort, InMemoryStorage};
/// use entidb_codec::Value;
///
/// let storage = InMemoryStorage::new();
/// storage.open().unwrap();
/// storage.insert("u1", Value::map(vec![])).unwrap();
/// assert!(storage.exists("u1").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    data: RwLock<HashMap<String, Value>>,
    open: AtomicBool,
}

impl InMemoryStorage {
    /// Creates a new, closed in-memory storage port.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn require_open(&self) -> StorageResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StorageError::Closed)
        }
    }
}

impl StoragePort for InMemoryStorage {
    fn open(&self) -> StorageResult<()> {
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn get(&self, id: &str) -> StorageResult<Option<Value>> {
        self.require_open()?;
        Ok(self.data.read().get(id).cloned())
    }

    fn get_all(&self) -> StorageResult<HashMap<String, Value>> {
        self.require_open()?;
        Ok(self.data.read().clone())
    }

    fn insert(&self, id: &str, map: Value) -> StorageResult<()> {
        self.require_open()?;
        let mut data = self.data.write();
        if data.contains_key(id) {
            return Err(StorageError::already_exists(id));
        }
        data.insert(id.to_string(), map);
        Ok(())
    }

    fn update(&self, id: &str, map: Value) -> StorageResult<()> {
        self.require_open()?;
        let mut data = self.data.write();
        if !data.contains_key(id) {
            return Err(StorageError::not_found(id));
        }
        data.insert(id.to_string(), map);
        Ok(())
    }

    fn upsert(&self, id: &str, map: Value) -> StorageResult<()> {
        self.require_open()?;
        self.data.write().insert(id.to_string(), map);
        Ok(())
    }

    fn delete(&self, id: &str) -> StorageResult<bool> {
        self.require_open()?;
        Ok(self.data.write().remove(id).is_some())
    }

    fn delete_all(&self) -> StorageResult<()> {
        self.require_open()?;
        self.data.write().clear();
        Ok(())
    }

    fn insert_many(&self, entries: HashMap<String, Value>) -> StorageResult<()> {
        self.require_open()?;
        self.data.write().extend(entries);
        Ok(())
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        self.require_open()?;
        Ok(self.data.read().contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage.open().unwrap();
        storage
    }

    #[test]
    fn new_is_closed() {
        let storage = InMemoryStorage::new();
        assert!(!storage.is_open());
        assert!(matches!(storage.get("x"), Err(StorageError::Closed)));
    }

    #[test]
    fn open_then_empty() {
        let storage = opened();
        assert!(storage.get_all().unwrap().is_empty());
    }

    #[test]
    fn insert_then_get() {
        let storage = opened();
        storage.insert("u1", Value::Integer(1)).unwrap();
        assert_eq!(storage.get("u1").unwrap(), Some(Value::Integer(1)));
    }

    #[test]
    fn insert_duplicate_fails() {
        let storage = opened();
        storage.insert("u1", Value::Integer(1)).unwrap();
        let err = storage.insert("u1", Value::Integer(2)).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }

    #[test]
    fn update_missing_fails() {
        let storage = opened();
        let err = storage.update("missing", Value::Integer(1)).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn update_existing_replaces() {
        let storage = opened();
        storage.insert("u1", Value::Integer(1)).unwrap();
        storage.update("u1", Value::Integer(2)).unwrap();
        assert_eq!(storage.get("u1").unwrap(), Some(Value::Integer(2)));
    }

    #[test]
    fn upsert_inserts_and_replaces() {
        let storage = opened();
        storage.upsert("u1", Value::Integer(1)).unwrap();
        assert_eq!(storage.get("u1").unwrap(), Some(Value::Integer(1)));
        storage.upsert("u1", Value::Integer(2)).unwrap();
        assert_eq!(storage.get("u1").unwrap(), Some(Value::Integer(2)));
    }

    #[test]
    fn delete_is_idempotent() {
        let storage = opened();
        storage.insert("u1", Value::Integer(1)).unwrap();
        assert!(storage.delete("u1").unwrap());
        assert!(!storage.delete("u1").unwrap());
    }

    #[test]
    fn delete_all_clears() {
        let storage = opened();
        storage.insert("u1", Value::Integer(1)).unwrap();
        storage.insert("u2", Value::Integer(2)).unwrap();
        storage.delete_all().unwrap();
        assert!(storage.get_all().unwrap().is_empty());
    }

    #[test]
    fn insert_many_bulk_loads() {
        let storage = opened();
        let mut entries = HashMap::new();
        entries.insert("u1".to_string(), Value::Integer(1));
        entries.insert("u2".to_string(), Value::Integer(2));
        storage.insert_many(entries).unwrap();
        assert_eq!(storage.get_all().unwrap().len(), 2);
    }

    #[test]
    fn exists_reflects_state() {
        let storage = opened();
        assert!(!storage.exists("u1").unwrap());
        storage.insert("u1", Value::Integer(1)).unwrap();
        assert!(storage.exists("u1").unwrap());
    }

    #[test]
    fn close_then_reopen() {
        let storage = opened();
        storage.insert("u1", Value::Integer(1)).unwrap();
        storage.close().unwrap();
        assert!(matches!(storage.get("u1"), Err(StorageError::Closed)));
        storage.open().unwrap();
        assert_eq!(storage.get("u1").unwrap(), Some(Value::Integer(1)));
    }
}
