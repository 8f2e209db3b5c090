//! In-Process Table Store
//!
//! A [`Driver`] that keeps databases, tables and secondary indexes in memory.
//! It behaves like a single-node table store: primary keys are unique,
//! secondary indexes are ordered, and handles can be closed or severed.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::{
    document_id, ConnectOptions, Document, Driver, EngineError, EngineResult, Session, TableRef,
};

// == Table ==
#[derive(Debug, Default)]
struct Table {
    rows: HashMap<String, Document>,
    /// Index name -> ordered (indexed value, primary key) pairs
    indexes: HashMap<String, BTreeSet<(i64, String)>>,
}

impl Table {
    /// Rows without a numeric value for the field stay out of the index.
    fn index_value(doc: &Document, field: &str) -> Option<i64> {
        doc.get(field).and_then(Value::as_i64)
    }

    fn put(&mut self, id: String, doc: Document) {
        self.remove(&id);
        for (name, index) in self.indexes.iter_mut() {
            if let Some(value) = Self::index_value(&doc, name) {
                index.insert((value, id.clone()));
            }
        }
        self.rows.insert(id, doc);
    }

    fn remove(&mut self, id: &str) -> Option<Document> {
        let doc = self.rows.remove(id)?;
        for (name, index) in self.indexes.iter_mut() {
            if let Some(value) = Self::index_value(&doc, name) {
                index.remove(&(value, id.to_string()));
            }
        }
        Some(doc)
    }

    fn create_index(&mut self, name: &str) {
        let entries = self
            .rows
            .iter()
            .filter_map(|(id, doc)| Self::index_value(doc, name).map(|v| (v, id.clone())))
            .collect();
        self.indexes.insert(name.to_string(), entries);
    }
}

type Catalog = HashMap<String, HashMap<String, Table>>;

// == Shared State ==
#[derive(Debug, Default)]
struct Inner {
    catalog: RwLock<Catalog>,
    credentials: Option<(String, String)>,
    unreachable: AtomicBool,
    /// Bumped to invalidate every session opened before
    generation: AtomicU64,
    connects: AtomicUsize,
}

impl Inner {
    fn read_table<R>(&self, table: &TableRef, f: impl FnOnce(&Table) -> R) -> EngineResult<R> {
        let catalog = self.catalog.read();
        let tables = catalog.get(&table.db).ok_or_else(|| missing_db(&table.db))?;
        let t = tables
            .get(&table.table)
            .ok_or_else(|| missing_table(table))?;
        Ok(f(t))
    }

    fn write_table<R>(
        &self,
        table: &TableRef,
        f: impl FnOnce(&mut Table) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let mut catalog = self.catalog.write();
        let tables = catalog
            .get_mut(&table.db)
            .ok_or_else(|| missing_db(&table.db))?;
        let t = tables
            .get_mut(&table.table)
            .ok_or_else(|| missing_table(table))?;
        f(t)
    }
}

fn missing_db(db: &str) -> EngineError {
    EngineError::DoesNotExist {
        kind: "Database",
        name: db.to_string(),
    }
}

fn missing_table(table: &TableRef) -> EngineError {
    EngineError::DoesNotExist {
        kind: "Table",
        name: table.to_string(),
    }
}

// == Memory Engine ==
/// Cloneable handle to one in-process table store.
///
/// Clones share the same data, so a test can keep one clone for inspection
/// while a connection owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    inner: Arc<Inner>,
}

impl MemoryEngine {
    /// Creates an empty store that accepts any credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that only accepts the given user and password.
    pub fn with_credentials(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                credentials: Some((user.into(), password.into())),
                ..Inner::default()
            }),
        }
    }

    /// Makes later connect attempts fail (or succeed again).
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Drops every open session without telling its owner.
    pub fn sever_connections(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Number of rows in a table, or `None` if it does not exist.
    pub fn row_count(&self, table: &TableRef) -> Option<usize> {
        self.inner.read_table(table, |t| t.rows.len()).ok()
    }

    /// Whether the table has a secondary index with this name.
    pub fn has_index(&self, table: &TableRef, index: &str) -> bool {
        self.inner
            .read_table(table, |t| t.indexes.contains_key(index))
            .unwrap_or(false)
    }

    /// Writes a row directly, bypassing any session.
    pub fn put_raw(&self, table: &TableRef, doc: Document) -> EngineResult<()> {
        let id = document_id(&doc)?.to_string();
        self.inner.write_table(table, |t| {
            t.put(id, doc);
            Ok(())
        })
    }
}

#[async_trait]
impl Driver for MemoryEngine {
    async fn connect(&self, options: &ConnectOptions) -> EngineResult<Arc<dyn Session>> {
        if self.inner.unreachable.load(Ordering::SeqCst) {
            return Err(EngineError::Unreachable {
                host: options.host.clone(),
                port: options.port,
            });
        }

        if let Some((user, password)) = &self.inner.credentials {
            let accepted = options.user.as_deref() == Some(user.as_str())
                && options.password.as_deref() == Some(password.as_str());
            if !accepted {
                return Err(EngineError::Authentication(
                    "Wrong password or unknown user".to_string(),
                ));
            }
        }

        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        debug!(host = %options.host, port = options.port, max = options.max, "memory session opened");

        Ok(Arc::new(MemorySession {
            inner: self.inner.clone(),
            generation: self.inner.generation.load(Ordering::SeqCst),
            closed: AtomicBool::new(false),
        }))
    }
}

// == Memory Session ==
struct MemorySession {
    inner: Arc<Inner>,
    generation: u64,
    closed: AtomicBool,
}

impl MemorySession {
    fn is_live(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
            && self.generation == self.inner.generation.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> EngineResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(EngineError::Closed)
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn db_list(&self) -> EngineResult<Vec<String>> {
        self.ensure_live()?;
        Ok(self.inner.catalog.read().keys().cloned().collect())
    }

    async fn db_create(&self, db: &str) -> EngineResult<()> {
        self.ensure_live()?;
        let mut catalog = self.inner.catalog.write();
        if catalog.contains_key(db) {
            return Err(EngineError::AlreadyExists {
                kind: "Database",
                name: db.to_string(),
            });
        }
        catalog.insert(db.to_string(), HashMap::new());
        Ok(())
    }

    async fn table_list(&self, db: &str) -> EngineResult<Vec<String>> {
        self.ensure_live()?;
        let catalog = self.inner.catalog.read();
        let tables = catalog.get(db).ok_or_else(|| missing_db(db))?;
        Ok(tables.keys().cloned().collect())
    }

    async fn table_create(&self, table: &TableRef) -> EngineResult<()> {
        self.ensure_live()?;
        let mut catalog = self.inner.catalog.write();
        let tables = catalog
            .get_mut(&table.db)
            .ok_or_else(|| missing_db(&table.db))?;
        if tables.contains_key(&table.table) {
            return Err(EngineError::AlreadyExists {
                kind: "Table",
                name: table.to_string(),
            });
        }
        tables.insert(table.table.clone(), Table::default());
        Ok(())
    }

    async fn index_list(&self, table: &TableRef) -> EngineResult<Vec<String>> {
        self.ensure_live()?;
        self.inner
            .read_table(table, |t| t.indexes.keys().cloned().collect())
    }

    async fn index_create(&self, table: &TableRef, index: &str) -> EngineResult<()> {
        self.ensure_live()?;
        self.inner.write_table(table, |t| {
            if t.indexes.contains_key(index) {
                return Err(EngineError::AlreadyExists {
                    kind: "Index",
                    name: index.to_string(),
                });
            }
            t.create_index(index);
            Ok(())
        })
    }

    async fn get(&self, table: &TableRef, id: &str) -> EngineResult<Option<Document>> {
        self.ensure_live()?;
        self.inner.read_table(table, |t| t.rows.get(id).cloned())
    }

    async fn insert(&self, table: &TableRef, doc: Document) -> EngineResult<()> {
        self.ensure_live()?;
        let id = document_id(&doc)?.to_string();
        self.inner.write_table(table, |t| {
            if t.rows.contains_key(&id) {
                return Err(EngineError::DuplicatePrimaryKey(id));
            }
            t.put(id, doc);
            Ok(())
        })
    }

    async fn replace(&self, table: &TableRef, doc: Document) -> EngineResult<()> {
        self.ensure_live()?;
        let id = document_id(&doc)?.to_string();
        self.inner.write_table(table, |t| {
            t.put(id, doc);
            Ok(())
        })
    }

    async fn delete(&self, table: &TableRef, id: &str) -> EngineResult<u64> {
        self.ensure_live()?;
        self.inner
            .write_table(table, |t| Ok(u64::from(t.remove(id).is_some())))
    }

    async fn delete_through(
        &self,
        table: &TableRef,
        index: &str,
        upper: i64,
    ) -> EngineResult<u64> {
        self.ensure_live()?;
        self.inner.write_table(table, |t| {
            let entries = t.indexes.get(index).ok_or_else(|| EngineError::DoesNotExist {
                kind: "Index",
                name: index.to_string(),
            })?;
            let doomed: Vec<String> = entries
                .iter()
                .take_while(|(value, _)| *value <= upper)
                .map(|(_, id)| id.clone())
                .collect();
            for id in &doomed {
                t.remove(id);
            }
            Ok(doomed.len() as u64)
        })
    }

    fn open_connections(&self) -> usize {
        usize::from(self.is_live())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
