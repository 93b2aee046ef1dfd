//! One-active-transaction-per-port coordination.

use super::{IsolationLevel, Transaction};
use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use entidb_storage::StoragePort;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Issues transactions over a single [`StoragePort`], enforcing that at
/// most one is active at a time.
///
/// EntiDB is single-writer: a `StoragePort` has no internal locking of its
/// own, so every transaction against it must be serialized at this layer.
pub struct TransactionManager {
    storage: Arc<dyn StoragePort>,
    next_id: AtomicU64,
    active: Mutex<bool>,
}

impl TransactionManager {
    /// Creates a manager over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StoragePort>) -> Self {
        Self {
            storage,
            next_id: AtomicU64::new(1),
            active: Mutex::new(false),
        }
    }

    /// Begins a transaction at the given isolation level.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TransactionAlreadyActive`] if one is already in
    /// progress.
    pub fn begin(&self, isolation: IsolationLevel) -> CoreResult<Transaction<'_>> {
        let mut guard = self.active.lock();
        if *guard {
            return Err(CoreError::TransactionAlreadyActive);
        }
        let id = TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let txn = Transaction::begin(id, self.storage.as_ref(), isolation)?.with_active_slot(&self.active);
        *guard = true;
        Ok(txn)
    }

    /// Runs `f` inside a fresh transaction, committing on `Ok` and rolling
    /// back on `Err`.
    ///
    /// # Errors
    ///
    /// Propagates `f`'s error (after rollback) or a commit failure.
    pub fn run_in_transaction<T>(
        &self,
        isolation: IsolationLevel,
        f: impl FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let mut txn = self.begin(isolation)?;
        let result = f(&mut txn);
        match result {
            Ok(value) => txn.commit().map(|()| value),
            Err(err) => {
                txn.rollback();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidb_codec::Value;
    use entidb_storage::InMemoryStorage;

    fn manager() -> TransactionManager {
        let storage: Arc<dyn StoragePort> = Arc::new(InMemoryStorage::new());
        storage.open().unwrap();
        TransactionManager::new(storage)
    }

    #[test]
    fn run_in_transaction_commits_on_success() {
        let manager = manager();
        manager
            .run_in_transaction(IsolationLevel::ReadCommitted, |txn| txn.insert("a", Value::Integer(1)))
            .unwrap();
        assert_eq!(manager.storage.get("a").unwrap(), Some(Value::Integer(1)));
    }

    #[test]
    fn run_in_transaction_rolls_back_on_error() {
        let manager = manager();
        let result: CoreResult<()> = manager.run_in_transaction(IsolationLevel::ReadCommitted, |txn| {
            txn.insert("a", Value::Integer(1))?;
            Err(CoreError::invalid_argument("boom"))
        });
        assert!(result.is_err());
        assert_eq!(manager.storage.get("a").unwrap(), None);
    }

    #[test]
    fn only_one_active_transaction_allowed() {
        let manager = manager();
        let _txn = manager.begin(IsolationLevel::ReadCommitted).unwrap();
        assert!(matches!(manager.begin(IsolationLevel::ReadCommitted), Err(CoreError::TransactionAlreadyActive)));
    }

    #[test]
    fn slot_is_released_after_commit() {
        let manager = manager();
        manager
            .run_in_transaction(IsolationLevel::ReadCommitted, |txn| txn.insert("a", Value::Integer(1)))
            .unwrap();
        let _txn = manager.begin(IsolationLevel::ReadCommitted).unwrap();
    }
}
