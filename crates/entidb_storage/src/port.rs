//! Storage port trait definition.

use crate::error::StorageResult;
use entidb_codec::Value;
use std::collections::HashMap;

/// The abstract key→attribute-map store every higher layer of EntiDB consumes.
///
/// A `StoragePort` is a **black box**. It knows nothing about indexes,
/// transactions, or migrations - it just holds `(id, attribute map)` pairs
/// and lets callers mutate them. Concurrency control, index maintenance, and
/// conflict detection are the caller's responsibility (see `entidb_core`).
///
/// # Invariants
///
/// - `insert` fails if `id` already exists; `update` fails if it doesn't.
/// - `upsert` always succeeds.
/// - `delete` is idempotent and reports whether it removed anything.
/// - `getAll` includes reserved ids (`__schema_version__`, ...); it is the
///   caller's job to filter them out of user-facing results.
///
/// # Implementors
///
/// - [`super::InMemoryStorage`] - for tests and ephemeral databases
/// - [`super::FileStorage`] - for persistent single-file storage
pub trait StoragePort: Send + Sync {
    /// Opens the store. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying resource cannot be opened.
    fn open(&self) -> StorageResult<()>;

    /// Closes the store, flushing any pending writes. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn close(&self) -> StorageResult<()>;

    /// Returns whether the store is currently open.
    fn is_open(&self) -> bool;

    /// Returns the attribute map for `id`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the read fails.
    fn get(&self, id: &str) -> StorageResult<Option<Value>>;

    /// Returns every `(id, attribute map)` pair, including reserved ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the read fails.
    fn get_all(&self) -> StorageResult<HashMap<String, Value>>;

    /// Inserts a new entity. Fails if `id` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::AlreadyExists`] if `id` is taken, or
    /// an I/O error.
    fn insert(&self, id: &str, map: Value) -> StorageResult<()>;

    /// Replaces an existing entity. Fails if `id` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if `id` is absent, or an
    /// I/O error.
    fn update(&self, id: &str, map: Value) -> StorageResult<()>;

    /// Inserts or replaces an entity unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn upsert(&self, id: &str, map: Value) -> StorageResult<()>;

    /// Removes `id` if present. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete(&self, id: &str) -> StorageResult<bool>;

    /// Removes every entity, including reserved ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete_all(&self) -> StorageResult<()>;

    /// Bulk-inserts every pair in `entries`.
    ///
    /// Atomicity is best-effort at this layer: on a mid-batch failure some
    /// entries may already be written. Callers needing atomicity compose
    /// this with a transaction's snapshot/restore.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry fails to insert.
    fn insert_many(&self, entries: HashMap<String, Value>) -> StorageResult<()>;

    /// Returns whether `id` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the read fails.
    fn exists(&self, id: &str) -> StorageResult<bool>;
}
