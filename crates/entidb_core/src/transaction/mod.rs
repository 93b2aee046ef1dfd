//! Transaction engine.
//!
//! A [`Transaction`] buffers a sequence of writes against one
//! [`StoragePort`] and applies them atomically at [`Transaction::commit`].
//! Reads made through the transaction see its own buffered writes plus,
//! depending on [`IsolationLevel`], either a point-in-time snapshot taken
//! at `begin` or the storage port's live state.

mod manager;

pub use manager::TransactionManager;

use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use entidb_codec::Value;
use entidb_storage::StoragePort;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Read/conflict-detection semantics for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Reads always see the storage port's current live state.
    ReadUncommitted,
    /// Reads see the storage port's current live state (no in-process
    /// concurrent writers exist below this crate, so this behaves the same
    /// as `ReadUncommitted` here; the level is kept for API completeness
    /// and future multi-writer backends).
    ReadCommitted,
    /// Reads see a snapshot taken at `begin`.
    RepeatableRead,
    /// Like `RepeatableRead`, and commit fails if anything it read has
    /// changed in storage since `begin`.
    Serializable,
}

/// A single buffered write.
#[derive(Debug, Clone)]
pub enum TransactionOperation {
    /// Insert a new entity.
    Insert {
        /// Target id.
        id: String,
        /// Attribute map to write.
        attrs: Value,
    },
    /// Replace an existing entity.
    Update {
        /// Target id.
        id: String,
        /// Attribute map to write.
        attrs: Value,
    },
    /// Insert or replace an entity.
    Upsert {
        /// Target id.
        id: String,
        /// Attribute map to write.
        attrs: Value,
    },
    /// Remove an entity.
    Delete {
        /// Target id.
        id: String,
    },
}

impl TransactionOperation {
    fn id(&self) -> &str {
        match self {
            Self::Insert { id, .. } | Self::Update { id, .. } | Self::Upsert { id, .. } | Self::Delete { id } => id,
        }
    }
}

/// Lifecycle state of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting operations; not yet committed or rolled back.
    Active,
    /// Successfully committed; operations were applied to storage.
    Committed,
    /// Explicitly rolled back; no operations were applied.
    RolledBack,
    /// Commit was attempted and failed; storage was restored to its
    /// pre-transaction snapshot.
    Failed,
}

/// A buffered, atomically-committed sequence of writes.
pub struct Transaction<'a> {
    id: TransactionId,
    storage: &'a dyn StoragePort,
    isolation: IsolationLevel,
    snapshot: HashMap<String, Value>,
    operations: Vec<TransactionOperation>,
    read_set: HashSet<String>,
    status: TransactionStatus,
    active_slot: Option<&'a Mutex<bool>>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(id: TransactionId, storage: &'a dyn StoragePort, isolation: IsolationLevel) -> CoreResult<Self> {
        let snapshot = storage.get_all()?;
        Ok(Self {
            id,
            storage,
            isolation,
            snapshot,
            operations: Vec::new(),
            read_set: HashSet::new(),
            status: TransactionStatus::Active,
            active_slot: None,
        })
    }

    /// Attaches the manager slot this transaction holds, released on drop.
    pub(crate) fn with_active_slot(mut self, slot: &'a Mutex<bool>) -> Self {
        self.active_slot = Some(slot);
        self
    }

    /// Returns this transaction's id.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    fn ensure_active(&self) -> CoreResult<()> {
        if self.status == TransactionStatus::Active {
            Ok(())
        } else {
            Err(CoreError::transaction_failed(format!(
                "transaction {} is not active",
                self.id
            )))
        }
    }

    fn overlay_value(&self, id: &str) -> Option<Option<Value>> {
        let mut result = None;
        for op in &self.operations {
            if op.id() != id {
                continue;
            }
            result = Some(match op {
                TransactionOperation::Insert { attrs, .. }
                | TransactionOperation::Update { attrs, .. }
                | TransactionOperation::Upsert { attrs, .. } => Some(attrs.clone()),
                TransactionOperation::Delete { .. } => None,
            });
        }
        result
    }

    /// Reads `id`, honoring this transaction's isolation level and its own
    /// buffered writes.
    pub fn get(&mut self, id: &str) -> CoreResult<Option<Value>> {
        self.ensure_active()?;
        if let Some(overlaid) = self.overlay_value(id) {
            return Ok(overlaid);
        }
        let value = match self.isolation {
            IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => self.storage.get(id)?,
            IsolationLevel::RepeatableRead | IsolationLevel::Serializable => self.snapshot.get(id).cloned(),
        };
        if self.isolation == IsolationLevel::Serializable {
            self.read_set.insert(id.to_string());
        }
        Ok(value)
    }

    /// Queues an insert.
    pub fn insert(&mut self, id: impl Into<String>, attrs: Value) -> CoreResult<()> {
        self.ensure_active()?;
        self.operations.push(TransactionOperation::Insert { id: id.into(), attrs });
        Ok(())
    }

    /// Queues an update.
    pub fn update(&mut self, id: impl Into<String>, attrs: Value) -> CoreResult<()> {
        self.ensure_active()?;
        self.operations.push(TransactionOperation::Update { id: id.into(), attrs });
        Ok(())
    }

    /// Queues an upsert.
    pub fn upsert(&mut self, id: impl Into<String>, attrs: Value) -> CoreResult<()> {
        self.ensure_active()?;
        self.operations.push(TransactionOperation::Upsert { id: id.into(), attrs });
        Ok(())
    }

    /// Queues a delete.
    pub fn delete(&mut self, id: impl Into<String>) -> CoreResult<()> {
        self.ensure_active()?;
        self.operations.push(TransactionOperation::Delete { id: id.into() });
        Ok(())
    }

    /// Returns the number of buffered operations.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    fn check_conflicts(&self) -> CoreResult<()> {
        let mut conflicting = Vec::new();
        for id in &self.read_set {
            let current = self.storage.get(id)?;
            if current.as_ref() != self.snapshot.get(id) {
                conflicting.push(id.clone());
            }
        }
        if conflicting.is_empty() {
            Ok(())
        } else {
            Err(CoreError::transaction_conflict(conflicting))
        }
    }

    fn apply_operations(&self) -> CoreResult<()> {
        for op in &self.operations {
            match op {
                TransactionOperation::Insert { id, attrs } => self.storage.insert(id, attrs.clone())?,
                TransactionOperation::Update { id, attrs } => self.storage.update(id, attrs.clone())?,
                TransactionOperation::Upsert { id, attrs } => self.storage.upsert(id, attrs.clone())?,
                TransactionOperation::Delete { id } => {
                    self.storage.delete(id)?;
                }
            }
        }
        Ok(())
    }

    fn restore_snapshot(&self) -> CoreResult<()> {
        self.storage.delete_all()?;
        self.storage.insert_many(self.snapshot.clone())?;
        Ok(())
    }

    /// Checks conflicts (under `Serializable`) and applies every buffered
    /// operation to storage. On any failure, storage is restored to its
    /// pre-transaction snapshot and the error is returned.
    pub fn commit(mut self) -> CoreResult<()> {
        self.ensure_active()?;
        if self.isolation == IsolationLevel::Serializable {
            self.check_conflicts()?;
        }
        match self.apply_operations() {
            Ok(()) => {
                self.status = TransactionStatus::Committed;
                Ok(())
            }
            Err(err) => {
                self.status = TransactionStatus::Failed;
                if let Err(restore_err) = self.restore_snapshot() {
                    return Err(CoreError::transaction_failed(format!(
                        "commit failed ({err}) and restore failed ({restore_err})"
                    )));
                }
                Err(CoreError::transaction_failed(err.to_string()))
            }
        }
    }

    /// Discards every buffered operation without touching storage.
    pub fn rollback(mut self) {
        self.operations.clear();
        self.status = TransactionStatus::RolledBack;
    }
}

static SCOPE_TXN_IDS: AtomicU64 = AtomicU64::new(1);

/// Runs `f` inside a transaction begun directly against `storage`, with no
/// manager and no one-active-transaction constraint — commits on `Ok`,
/// rolls back and re-raises on `Err`.
///
/// Unlike [`TransactionManager::run_in_transaction`], callers may hold any
/// number of these concurrently against the same port; nothing here
/// coordinates with a manager's active-transaction slot.
///
/// # Errors
///
/// Propagates `f`'s error (after rollback) or a commit failure.
pub fn transaction<T>(
    storage: &dyn StoragePort,
    isolation: IsolationLevel,
    f: impl FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
) -> CoreResult<T> {
    let id = TransactionId::new(SCOPE_TXN_IDS.fetch_add(1, Ordering::SeqCst));
    let mut txn = Transaction::begin(id, storage, isolation)?;
    let result = f(&mut txn);
    match result {
        Ok(value) => txn.commit().map(|()| value),
        Err(err) => {
            txn.rollback();
            Err(err)
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.status == TransactionStatus::Active {
            tracing::debug!(id = %self.id, "transaction dropped without commit or rollback");
            self.status = TransactionStatus::RolledBack;
        }
        if let Some(slot) = self.active_slot {
            *slot.lock() = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidb_storage::InMemoryStorage;

    fn storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage.open().unwrap();
        storage
    }

    #[test]
    fn commit_applies_buffered_operations() {
        let storage = storage();
        let mut txn = Transaction::begin(TransactionId::new(1), &storage, IsolationLevel::ReadCommitted).unwrap();
        txn.insert("a", Value::Integer(1)).unwrap();
        txn.commit().unwrap();
        assert_eq!(storage.get("a").unwrap(), Some(Value::Integer(1)));
    }

    #[test]
    fn rollback_discards_operations() {
        let storage = storage();
        let mut txn = Transaction::begin(TransactionId::new(1), &storage, IsolationLevel::ReadCommitted).unwrap();
        txn.insert("a", Value::Integer(1)).unwrap();
        txn.rollback();
        assert_eq!(storage.get("a").unwrap(), None);
    }

    #[test]
    fn read_your_own_writes() {
        let storage = storage();
        let mut txn = Transaction::begin(TransactionId::new(1), &storage, IsolationLevel::RepeatableRead).unwrap();
        txn.insert("a", Value::Integer(1)).unwrap();
        assert_eq!(txn.get("a").unwrap(), Some(Value::Integer(1)));
    }

    #[test]
    fn repeatable_read_ignores_concurrent_writes() {
        let storage = storage();
        storage.insert("a", Value::Integer(1)).unwrap();
        let mut txn = Transaction::begin(TransactionId::new(1), &storage, IsolationLevel::RepeatableRead).unwrap();
        storage.update("a", Value::Integer(2)).unwrap();
        assert_eq!(txn.get("a").unwrap(), Some(Value::Integer(1)));
    }

    #[test]
    fn read_committed_sees_concurrent_writes() {
        let storage = storage();
        storage.insert("a", Value::Integer(1)).unwrap();
        let mut txn = Transaction::begin(TransactionId::new(1), &storage, IsolationLevel::ReadCommitted).unwrap();
        storage.update("a", Value::Integer(2)).unwrap();
        assert_eq!(txn.get("a").unwrap(), Some(Value::Integer(2)));
    }

    #[test]
    fn serializable_detects_conflict() {
        let storage = storage();
        storage.insert("a", Value::Integer(1)).unwrap();
        let mut txn = Transaction::begin(TransactionId::new(1), &storage, IsolationLevel::Serializable).unwrap();
        txn.get("a").unwrap();
        storage.update("a", Value::Integer(2)).unwrap();
        txn.update("a", Value::Integer(3)).unwrap();
        assert!(matches!(txn.commit(), Err(CoreError::TransactionConflict { .. })));
    }

    #[test]
    fn scope_helper_commits_without_a_manager() {
        let storage = storage();
        transaction(&storage, IsolationLevel::ReadCommitted, |txn| txn.insert("a", Value::Integer(1))).unwrap();
        assert_eq!(storage.get("a").unwrap(), Some(Value::Integer(1)));
    }

    #[test]
    fn scope_helper_rolls_back_on_error() {
        let storage = storage();
        let result: CoreResult<()> = transaction(&storage, IsolationLevel::ReadCommitted, |txn| {
            txn.insert("a", Value::Integer(1))?;
            Err(CoreError::invalid_argument("boom"))
        });
        assert!(result.is_err());
        assert_eq!(storage.get("a").unwrap(), None);
    }

    #[test]
    fn scope_helper_allows_concurrent_uses_unlike_the_manager() {
        let storage = storage();
        transaction(&storage, IsolationLevel::ReadCommitted, |txn| txn.insert("a", Value::Integer(1))).unwrap();
        transaction(&storage, IsolationLevel::ReadCommitted, |txn| txn.insert("b", Value::Integer(2))).unwrap();
        assert_eq!(storage.get("a").unwrap(), Some(Value::Integer(1)));
        assert_eq!(storage.get("b").unwrap(), Some(Value::Integer(2)));
    }

    #[test]
    fn failed_commit_restores_snapshot() {
        let storage = storage();
        storage.insert("a", Value::Integer(1)).unwrap();
        let mut txn = Transaction::begin(TransactionId::new(1), &storage, IsolationLevel::ReadCommitted).unwrap();
        txn.insert("a", Value::Integer(2)).unwrap(); // "a" already exists -> insert fails
        assert!(txn.commit().is_err());
        assert_eq!(storage.get("a").unwrap(), Some(Value::Integer(1)));
    }
}
