//! # EntiDB Core
//!
//! Core database engine for EntiDB - an embedded entity-document database
//! built on a pluggable storage port.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Database                          │
//! │  (facade: collections, transactions, migrations)      │
//! └───────┬──────────────┬──────────────┬────────────────┘
//!         │              │              │
//! ┌───────▼──────┐ ┌─────▼──────┐ ┌─────▼────────────┐
//! │ Collection<T>│ │ Transaction │ │ MigrationManager  │
//! │ (CRUD, find, │ │ Manager     │ │ (version graph,   │
//! │  index mgmt) │ │ (buffer +   │ │  backup/restore)  │
//! │              │ │  commit)    │ │                   │
//! └───────┬──────┘ └─────┬──────┘ └─────┬─────────────┘
//!         │              │              │
//! ┌───────▼──────┐       │              │
//! │ IndexManager │       │              │
//! │ (ordered,    │       │              │
//! │  hash, fts)  │       │              │
//! └───────┬──────┘       │              │
//!         └──────────────┴──────────────┘
//! ┌───────────────────────▼──────────────────────────────┐
//! │              StoragePort (trait)                      │
//! │  (opaque id → attribute-map store: InMemory, File)    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Invariants
//!
//! - A `StoragePort` knows nothing about indexes, transactions, or
//!   migrations; every collaborator above it is built entirely on its
//!   five-verb interface (get/insert/update/upsert/delete).
//! - Index state is always rebuildable from a collection's entities.
//! - A transaction buffers its writes and applies them atomically at
//!   commit; a failed commit restores the pre-transaction snapshot.
//! - Reserved ids (`__schema_version__`, `__migration_history__`) are
//!   invisible to user-facing collection operations.
//!
//! ## Example
//!
//! ```rust,ignore
//! use entidb_core::{Database, CollectionConfig, Entity, EntityId};
//! use entidb_codec::Value;
//!
//! let db = Database::open_in_memory()?;
//! let notes: entidb_core::Collection<Note> = db.collection("notes", CollectionConfig::default());
//! let id = notes.insert(&Note { id: None, text: "hello".into() })?;
//! let note = notes.get_or_throw(&id)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod database;
mod entity;
mod error;
mod index;
mod migration;
mod path;
mod transaction;
mod types;

pub use collection::{Collection, EmptyQueryListError, Entity, Query};
pub use config::{CollectionConfig, MigrationConfig};
pub use database::Database;
pub use entity::{is_reserved_id, EntityId, MIGRATION_HISTORY_ID, SCHEMA_VERSION_ID};
pub use error::{CoreError, CoreResult};
pub use index::{FtsConfig, FtsIndex, HashIndex, Index, IndexKey, IndexManager, IndexVariant, OrderedIndex, ScoredId};
pub use migration::{
    EntityTransform, MigrationDirection, MigrationLogEntry, MigrationManager, MigrationOutcome, MigrationReport,
    MigrationStrategy, NoOpStrategy, SingleEntityStrategy, Version,
};
pub use transaction::{
    transaction, IsolationLevel, Transaction, TransactionManager, TransactionOperation, TransactionStatus,
};
pub use types::TransactionId;
