//! Storage Engine Module
//!
//! Boundary between the cache adapter and the table store it persists into.
//! The adapter only ever talks to a [`Driver`] (to open a handle) and a
//! [`Session`] (to run schema and row queries over that handle).

mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryEngine;

/// A stored row: a JSON object whose `id` field is the primary key.
pub type Document = Map<String, Value>;

/// Name of the primary key field in every document.
pub const PRIMARY_KEY: &str = "id";

// == Engine Error ==
/// Errors reported by the storage engine.
///
/// The adapter forwards these verbatim, so the messages mirror what a table
/// store would put on the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No server answered at the configured address
    #[error("Could not connect to {host}:{port}")]
    Unreachable { host: String, port: u16 },

    /// The server rejected the supplied credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The handle was closed or the transport dropped
    #[error("Connection is closed")]
    Closed,

    /// An insert collided with an existing primary key
    #[error("Duplicate primary key `id`: {0}")]
    DuplicatePrimaryKey(String),

    /// A create targeted an object that is already there
    #[error("{kind} `{name}` already exists")]
    AlreadyExists { kind: &'static str, name: String },

    /// A query targeted an object that is not there
    #[error("{kind} `{name}` does not exist")]
    DoesNotExist { kind: &'static str, name: String },

    /// A written document had no string `id`
    #[error("Document is missing a string primary key `id`")]
    MissingPrimaryKey,
}

/// Shorthand for engine call results.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

// == Table Reference ==
/// Fully qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub db: String,
    pub table: String,
}

impl TableRef {
    pub fn new(db: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.table)
    }
}

// == Connect Options ==
/// Everything a driver needs to open a handle.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    /// Default database for the handle
    pub db: String,
    /// Upper bound on pooled connections
    pub max: usize,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Options the adapter does not understand, forwarded untouched
    pub extra: Map<String, Value>,
}

// == Driver ==
/// Opens handles to a table store.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Connects and returns a live session, or the reason it could not.
    async fn connect(&self, options: &ConnectOptions) -> EngineResult<Arc<dyn Session>>;
}

// == Session ==
/// A live handle to a table store.
///
/// All queries run over the network in a real deployment and may fail with
/// [`EngineError::Closed`] once the handle is gone.
#[async_trait]
pub trait Session: Send + Sync {
    async fn db_list(&self) -> EngineResult<Vec<String>>;

    async fn db_create(&self, db: &str) -> EngineResult<()>;

    async fn table_list(&self, db: &str) -> EngineResult<Vec<String>>;

    async fn table_create(&self, table: &TableRef) -> EngineResult<()>;

    async fn index_list(&self, table: &TableRef) -> EngineResult<Vec<String>>;

    /// Creates a secondary index over the top-level field of the same name.
    async fn index_create(&self, table: &TableRef, index: &str) -> EngineResult<()>;

    /// Fetches a row by primary key.
    async fn get(&self, table: &TableRef, id: &str) -> EngineResult<Option<Document>>;

    /// Inserts a new row. Fails with [`EngineError::DuplicatePrimaryKey`] if
    /// the id is taken.
    async fn insert(&self, table: &TableRef, doc: Document) -> EngineResult<()>;

    /// Writes the row with the same id in full. A missing row is inserted.
    async fn replace(&self, table: &TableRef, doc: Document) -> EngineResult<()>;

    /// Deletes a row by primary key and returns how many rows went away.
    async fn delete(&self, table: &TableRef, id: &str) -> EngineResult<u64>;

    /// Deletes every row whose `index` value is at or below `upper`, walking
    /// the secondary index instead of scanning the table.
    async fn delete_through(&self, table: &TableRef, index: &str, upper: i64)
        -> EngineResult<u64>;

    /// Number of pooled connections that are currently usable.
    fn open_connections(&self) -> usize;

    /// Releases the handle. Later queries fail with [`EngineError::Closed`].
    fn close(&self);
}

/// Reads the primary key of a document.
pub fn document_id(doc: &Document) -> EngineResult<&str> {
    doc.get(PRIMARY_KEY)
        .and_then(Value::as_str)
        .ok_or(EngineError::MissingPrimaryKey)
}
