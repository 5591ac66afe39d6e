//! Persistent key-value store and typed accessors.
//!
//! # Responsibility
//! - Define the `read`/`write` contract consumed by the relay.
//! - Keep SQL and serialization details behind that contract.
//! - Map the two well-known keys onto typed values.
//!
//! # Invariants
//! - Write failures are returned to the caller, never swallowed.
//! - The document tree is always written wholesale under one key.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod nest_store;
mod sqlite;

pub use memory::MemoryKvStore;
pub use nest_store::{NestStore, SeedReport};
pub use sqlite::SqliteKvStore;

/// Key holding the serialized `DocumentTree`.
pub const DOCUMENT_TREE_KEY: &str = "documentTree";
/// Key holding the panel width in pixels.
pub const PANEL_WIDTH_KEY: &str = "panelWidth";

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failures.
#[derive(Debug)]
pub enum StoreError {
    /// SQLite transport or bootstrap failure.
    Db(DbError),
    /// Backend refused the operation.
    Unavailable(String),
    /// Value could not be encoded for storage.
    Encode(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
            Self::Encode(err) => write!(f, "failed to encode stored value: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Minimal string key-value contract.
pub trait KeyValueStore: Send {
    /// Returns the stored value, or `None` when the key is absent.
    fn read(&self, key: &str) -> StoreResult<Option<String>>;
    /// Overwrites `key` with `value`.
    fn write(&mut self, key: &str, value: &str) -> StoreResult<()>;
}
