//! # EntiDB Storage
//!
//! The `StoragePort` trait and its implementations for EntiDB.
//!
//! A storage port is an **opaque key→attribute-map store**. It knows nothing
//! about indexes, transactions, queries, or migrations - those live in
//! `entidb_core` and are built entirely on top of this trait.
//!
//! ## Design Principles
//!
//! - Ports store `(id, attribute map)` pairs, not bytes.
//! - No knowledge of indexes, transactions, or migrations.
//! - Must be `Send + Sync` for concurrent access.
//! - `entidb_core` owns all higher-level semantics.
//!
//! ## Available Ports
//!
//! - [`InMemoryStorage`] - for testing and ephemeral databases
//! - [`FileStorage`] - for persistent single-file storage
//!
//! ## Example
//!
//! ```rust
//! use entidb_storage::{StoragePort, InMemoryStorage};
//! use entidb_codec::Value;
//!
//! let storage = InMemoryStorage::new();
//! storage.open().unwrap();
//! storage.insert("u1", Value::Text("hello".into())).unwrap();
//! assert_eq!(storage.get("u1").unwrap(), Some(Value::Text("hello".into())));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod port;

pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
pub use memory::InMemoryStorage;
pub use port::StoragePort;
