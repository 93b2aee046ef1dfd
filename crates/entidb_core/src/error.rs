//! Error types for EntiDB core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in EntiDB core operations.
///
/// Variants are grouped by the category named in the taxonomy: storage,
/// index, query, transaction, collection, migration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage port error, surfaced unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] entidb_storage::StorageError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] entidb_codec::CodecError),

    /// The storage port is not open.
    #[error("storage is not open")]
    StorageNotOpen,

    /// A read from the storage port failed.
    #[error("read failed: {message}")]
    ReadFailed {
        /// Description of the failure.
        message: String,
    },

    /// A write to the storage port failed.
    #[error("write failed: {message}")]
    WriteFailed {
        /// Description of the failure.
        message: String,
    },

    /// `insert` was called for an id that already exists.
    #[error("entity already exists: {id}")]
    EntityAlreadyExists {
        /// The colliding id.
        id: String,
    },

    /// The requested entity does not exist.
    #[error("entity not found: {id}")]
    EntityNotFound {
        /// The id that was not found.
        id: String,
    },

    /// On-disk data could not be parsed.
    #[error("corrupted data: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// A version recorded on disk does not match what was expected.
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// The version the caller expected.
        expected: String,
        /// The version actually present.
        found: String,
    },

    /// An index with the given field name does not exist.
    #[error("index not found for field {field}")]
    IndexNotFound {
        /// The field name.
        field: String,
    },

    /// `createIndex` was called for a field that already has one.
    #[error("index already exists for field {field}")]
    IndexAlreadyExists {
        /// The field name.
        field: String,
    },

    /// The index variant does not support the requested operation.
    #[error("unsupported operation for index variant: {message}")]
    IndexUnsupportedType {
        /// Description of the mismatch.
        message: String,
    },

    /// A query tree referenced a node it does not understand.
    #[error("bad query node: {message}")]
    QueryBadNode {
        /// Description of the problem.
        message: String,
    },

    /// A serialized query used an unknown `type` tag.
    #[error("unknown query type: {type_name}")]
    QueryUnknownType {
        /// The unrecognized type tag.
        type_name: String,
    },

    /// A transaction operation was attempted with no active transaction.
    #[error("no active transaction")]
    TransactionNotActive,

    /// `beginTransaction` was called while one was already active.
    #[error("a transaction is already active")]
    TransactionAlreadyActive,

    /// Serializable isolation detected a conflicting write.
    #[error("transaction conflict on {} id(s): {ids:?}{more}", ids.len(), more = if *total > ids.len() { format!(" (+{} more)", total - ids.len()) } else { String::new() })]
    TransactionConflict {
        /// The first few conflicting ids (at most five).
        ids: Vec<String>,
        /// The total number of conflicting ids.
        total: usize,
    },

    /// Commit or rollback failed in a way that may leave storage inconsistent.
    #[error("transaction failed: {message}")]
    TransactionFailed {
        /// Description of the failure.
        message: String,
    },

    /// An operation was attempted on a disposed collection.
    #[error("collection is disposed")]
    CollectionDisposed,

    /// A stored value did not rehydrate into the expected entity type.
    #[error("type mismatch: {message}")]
    CollectionTypeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// A collection operation failed for a reason not covered above.
    #[error("collection operation failed: {message}")]
    CollectionOperationFailed {
        /// Description of the failure.
        message: String,
    },

    /// Reading or initializing the schema version record failed.
    #[error("migration initialization failed: {message}")]
    MigrationInitFailed {
        /// Description of the failure.
        message: String,
    },

    /// No sequence of strategies connects the current and target versions.
    #[error("no migration path from {from} to {to}")]
    MigrationNoPath {
        /// The version migration started from.
        from: String,
        /// The version migration was targeting.
        to: String,
    },

    /// A migration step's transform failed.
    #[error("migration step failed: {message}")]
    MigrationStepFailed {
        /// Description of the failure.
        message: String,
    },

    /// A migration failed and its rollback also failed.
    #[error("migration rollback failed: {message}")]
    MigrationRollbackFailed {
        /// Description of the failure.
        message: String,
    },

    /// An invalid argument was passed to an API.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument issue.
        message: String,
    },
}

impl CoreError {
    /// Creates a read-failed error.
    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed {
            message: message.into(),
        }
    }

    /// Creates a write-failed error.
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates an entity-already-exists error.
    pub fn entity_already_exists(id: impl Into<String>) -> Self {
        Self::EntityAlreadyExists { id: id.into() }
    }

    /// Creates an entity-not-found error.
    pub fn entity_not_found(id: impl Into<String>) -> Self {
        Self::EntityNotFound { id: id.into() }
    }

    /// Creates a corrupted-data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates an index-not-found error.
    pub fn index_not_found(field: impl Into<String>) -> Self {
        Self::IndexNotFound { field: field.into() }
    }

    /// Creates an index-already-exists error.
    pub fn index_already_exists(field: impl Into<String>) -> Self {
        Self::IndexAlreadyExists { field: field.into() }
    }

    /// Creates an index-unsupported-type error.
    pub fn index_unsupported_type(message: impl Into<String>) -> Self {
        Self::IndexUnsupportedType {
            message: message.into(),
        }
    }

    /// Creates a transaction-conflict error, keeping only the first five ids.
    #[must_use]
    pub fn transaction_conflict(all_ids: Vec<String>) -> Self {
        let total = all_ids.len();
        let ids = all_ids.into_iter().take(5).collect();
        Self::TransactionConflict { ids, total }
    }

    /// Creates a transaction-failed error.
    pub fn transaction_failed(message: impl Into<String>) -> Self {
        Self::TransactionFailed {
            message: message.into(),
        }
    }

    /// Creates a collection-type-mismatch error.
    pub fn collection_type_mismatch(message: impl Into<String>) -> Self {
        Self::CollectionTypeMismatch {
            message: message.into(),
        }
    }

    /// Creates a collection-operation-failed error.
    pub fn collection_operation_failed(message: impl Into<String>) -> Self {
        Self::CollectionOperationFailed {
            message: message.into(),
        }
    }

    /// Creates a migration-init-failed error.
    pub fn migration_init_failed(message: impl Into<String>) -> Self {
        Self::MigrationInitFailed {
            message: message.into(),
        }
    }

    /// Creates a no-migration-path error.
    pub fn migration_no_path(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::MigrationNoPath {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a migration-step-failed error.
    pub fn migration_step_failed(message: impl Into<String>) -> Self {
        Self::MigrationStepFailed {
            message: message.into(),
        }
    }

    /// Creates a migration-rollback-failed error.
    pub fn migration_rollback_failed(message: impl Into<String>) -> Self {
        Self::MigrationRollbackFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_conflict_truncates_to_five() {
        let ids: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        let err = CoreError::transaction_conflict(ids);
        match err {
            CoreError::TransactionConflict { ids, total } => {
                assert_eq!(ids.len(), 5);
                assert_eq!(total, 8);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn transaction_conflict_message_mentions_overflow_count() {
        let ids: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        let err = CoreError::transaction_conflict(ids);
        assert!(err.to_string().contains("+3 more"));
    }
}
