//! Database facade.
//!
//! [`Database`] ties one [`StoragePort`] to a [`TransactionManager`] and a
//! [`MigrationManager`], and hands out [`Collection`] handles over that
//! same storage. It owns no data of its own - everything it exposes is a
//! thin wrapper over its collaborators.

use crate::collection::{Collection, Entity};
use crate::config::{CollectionConfig, MigrationConfig};
use crate::error::CoreResult;
use crate::migration::{MigrationManager, MigrationReport, MigrationStrategy};
use crate::transaction::{self, IsolationLevel, Transaction, TransactionManager};
use entidb_storage::{FileStorage, InMemoryStorage, StoragePort};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// The top-level handle applications open and hold.
pub struct Database {
    storage: Arc<dyn StoragePort>,
    transactions: TransactionManager,
    migrations: Mutex<MigrationManager>,
}

impl Database {
    /// Opens a database over an arbitrary storage port.
    ///
    /// # Errors
    ///
    /// Returns an error if `storage.open()` fails, or if auto-migration is
    /// enabled and initializing the schema version record fails.
    pub fn open(storage: Arc<dyn StoragePort>, migration_config: MigrationConfig) -> CoreResult<Self> {
        storage.open()?;
        let migrations = MigrationManager::new(migration_config.clone());
        let db = Self {
            transactions: TransactionManager::new(storage.clone()),
            storage,
            migrations: Mutex::new(migrations),
        };
        if migration_config.auto_migrate {
            db.migrations.lock().current_version(db.storage.as_ref())?;
        }
        Ok(db)
    }

    /// Opens an ephemeral in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails (see [`Database::open`]).
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open(Arc::new(InMemoryStorage::new()), MigrationConfig::default())
    }

    /// Opens a file-backed database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or initialization
    /// fails (see [`Database::open`]).
    pub fn open_file(path: &Path, migration_config: MigrationConfig) -> CoreResult<Self> {
        let storage = FileStorage::open(path)?;
        Self::open(Arc::new(storage), migration_config)
    }

    /// Returns a typed collection handle named `name`, sharing this
    /// database's storage port.
    #[must_use]
    pub fn collection<T: Entity>(&self, name: impl Into<String>, config: CollectionConfig) -> Collection<T> {
        Collection::new(name, self.storage.clone(), config)
    }

    /// Registers a migration strategy.
    pub fn register_migration(&self, strategy: Box<dyn MigrationStrategy>) {
        self.migrations.lock().register(strategy);
    }

    /// Migrates this database's schema to `target`.
    ///
    /// # Errors
    ///
    /// See [`MigrationManager::migrate_to`].
    pub fn migrate_to(&self, target: &str) -> CoreResult<MigrationReport> {
        self.migrations.lock().migrate_to(self.storage.as_ref(), target)
    }

    /// Returns the currently recorded schema version.
    ///
    /// # Errors
    ///
    /// See [`MigrationManager::current_version`].
    pub fn schema_version(&self) -> CoreResult<String> {
        self.migrations.lock().current_version(self.storage.as_ref())
    }

    /// Begins a transaction directly against this database's storage port.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::TransactionAlreadyActive`] if one
    /// is already in progress.
    pub fn begin_transaction(&self, isolation: IsolationLevel) -> CoreResult<Transaction<'_>> {
        self.transactions.begin(isolation)
    }

    /// Runs `f` inside a transaction, committing on success and rolling
    /// back on error.
    ///
    /// # Errors
    ///
    /// Propagates `f`'s error or a commit failure.
    pub fn transaction<T>(
        &self,
        isolation: IsolationLevel,
        f: impl FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        self.transactions.run_in_transaction(isolation, f)
    }

    /// Runs `f` inside a transaction begun directly against this database's
    /// storage port, bypassing the one-active-transaction constraint
    /// [`Database::transaction`] enforces. Callers that want several
    /// transactions in flight at once (e.g. from different threads, each
    /// touching disjoint ids) use this instead.
    ///
    /// # Errors
    ///
    /// Propagates `f`'s error or a commit failure.
    pub fn scoped_transaction<T>(
        &self,
        isolation: IsolationLevel,
        f: impl FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        transaction::transaction(self.storage.as_ref(), isolation, f)
    }

    /// Returns whether the underlying storage port is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.storage.is_open()
    }

    /// Closes the underlying storage port, flushing pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn close(&self) -> CoreResult<()> {
        Ok(self.storage.close()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::error::CoreError;
    use entidb_codec::Value;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: Option<EntityId>,
        text: String,
    }

    impl Entity for Note {
        fn entity_id(&self) -> Option<EntityId> {
            self.id.clone()
        }

        fn to_attrs(&self) -> Value {
            Value::map(vec![(Value::Text("text".into()), Value::Text(self.text.clone()))])
        }

        fn from_attrs(id: &EntityId, attrs: &Value) -> CoreResult<Self> {
            let text = attrs
                .as_map()
                .and_then(|m| m.iter().find(|(k, _)| k.as_text() == Some("text")))
                .and_then(|(_, v)| v.as_text())
                .unwrap_or_default()
                .to_string();
            Ok(Note { id: Some(id.clone()), text })
        }
    }

    #[test]
    fn open_in_memory_initializes_schema_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), "0.0.0");
    }

    #[test]
    fn collection_handles_share_storage() {
        let db = Database::open_in_memory().unwrap();
        let notes: Collection<Note> = db.collection("notes", CollectionConfig::default());
        let id = notes.insert(&Note { id: None, text: "hi".into() }).unwrap();

        let notes_again: Collection<Note> = db.collection("notes", CollectionConfig::default());
        assert_eq!(notes_again.get(&id).unwrap().unwrap().text, "hi");
    }

    #[test]
    fn transaction_helper_commits() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(IsolationLevel::ReadCommitted, |txn| txn.insert("x", Value::Integer(1))).unwrap();
        assert_eq!(db.begin_transaction(IsolationLevel::ReadCommitted).unwrap().get("x").unwrap(), Some(Value::Integer(1)));
    }

    #[test]
    fn scoped_transaction_commits_without_the_manager_lock() {
        let db = Database::open_in_memory().unwrap();
        db.scoped_transaction(IsolationLevel::ReadCommitted, |txn| txn.insert("x", Value::Integer(1))).unwrap();
        assert_eq!(db.begin_transaction(IsolationLevel::ReadCommitted).unwrap().get("x").unwrap(), Some(Value::Integer(1)));
    }

    #[test]
    fn close_then_reopen_fails_reads() {
        let db = Database::open_in_memory().unwrap();
        db.close().unwrap();
        assert!(!db.is_open());
        assert!(matches!(db.schema_version(), Err(CoreError::Storage(_))));
    }
}
