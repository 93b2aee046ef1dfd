//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted an operation while the store is closed.
    #[error("storage is closed")]
    Closed,

    /// `insert` was called for an id that already exists.
    #[error("entity already exists: {id}")]
    AlreadyExists {
        /// The id that already exists.
        id: String,
    },

    /// `update` was called for an id that does not exist.
    #[error("entity not found: {id}")]
    NotFound {
        /// The id that was not found.
        id: String,
    },

    /// The on-disk file contents could not be parsed.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// Failed to acquire the advisory file lock (another process has it open).
    #[error("failed to lock storage file: {0}")]
    LockFailed(String),
}

impl StorageError {
    /// Create an already-exists error.
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    /// Create a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}
