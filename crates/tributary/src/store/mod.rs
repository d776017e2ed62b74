//! `SQLite` storage layer for Tributary.
//!
//! `SQLite` is the source of truth: there is no standalone in-memory graph.
//! Every engine read and write is a query against the current transaction.
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL)
//! - `helpers` - Row conversion and column encoding
//! - `entities` - Entity CRUD operations
//! - `edges` - `GraphStore` implementation over the edge table

mod edges;
mod entities;
mod helpers;
mod schema;

pub(crate) use schema::SCHEMA;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, TransactionBehavior};

use crate::error::{Error, Result};
use crate::types::{DependencyEdge, DependencyPath, EntityId, Kind, Scope};

/// A resolved dependency name together with its current outbound closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntity {
    /// Entity ID.
    pub id: EntityId,
    /// Entity name (the name that was resolved).
    pub name: String,
    /// Every stored outbound edge of the entity, self-edge included.
    pub closure: Vec<DependencyEdge>,
}

/// Which edges a delete applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeFilter {
    /// Exactly one edge, by natural key.
    Key {
        /// Owning entity.
        entity_id: EntityId,
        /// Entity depended upon.
        dependency_id: EntityId,
        /// The route.
        path: DependencyPath,
    },
    /// Every edge whose path routes through the entity (including its own).
    Containing(EntityId),
}

impl EdgeFilter {
    /// Filter matching exactly `edge`.
    #[must_use]
    pub fn key_of(edge: &DependencyEdge) -> Self {
        Self::Key {
            entity_id: edge.entity_id,
            dependency_id: edge.dependency_id,
            path: edge.path.clone(),
        }
    }
}

/// Storage operations the dependency engine needs.
///
/// Implementations operate inside whatever transaction the caller opened;
/// the engine never commits or rolls back on its own. All methods propagate
/// storage failures unchanged.
pub trait GraphStore {
    /// Resolve `names` to entities of `kind` in `scope`, each with its outbound closure.
    ///
    /// Names with no matching entity are simply absent from the result.
    fn find_by_names_with_closure(
        &self,
        kind: Kind,
        scope: &Scope,
        names: &BTreeSet<String>,
    ) -> Result<Vec<ResolvedEntity>>;

    /// Insert edges, ignoring any whose natural key is already stored.
    ///
    /// Returns the number of rows written.
    fn upsert_edges(&self, edges: &[DependencyEdge]) -> Result<usize>;

    /// All edges owned by `entity_id`.
    fn query_outbound(&self, entity_id: EntityId) -> Result<Vec<DependencyEdge>>;

    /// All edges whose path contains `id`.
    fn query_containing(&self, id: EntityId) -> Result<Vec<DependencyEdge>>;

    /// Delete the edges selected by `filter`, returning how many were removed.
    fn delete_edges(&self, filter: &EdgeFilter) -> Result<usize>;

    /// IDs of entities (outside `ids`) that depend on any of `ids`, sorted and distinct.
    fn dependant_ids(&self, ids: &[EntityId]) -> Result<Vec<EntityId>>;

    /// Names of entities that depend on `id`, sorted and distinct.
    fn dependant_names(&self, id: EntityId) -> Result<Vec<String>>;
}

/// `GraphStore` and entity CRUD over one `SQLite` connection or transaction.
///
/// A `rusqlite::Transaction` derefs to `Connection`, so the same store works
/// for read-only queries and inside a write transaction.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    /// Wrap a connection (or transaction).
    #[must_use]
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

/// `SQLite` database handle.
///
/// The connection is wrapped in a `Mutex` so the handle can be shared across
/// threads; all writes additionally take the database write lock up front
/// (`BEGIN IMMEDIATE`), which serializes concurrent saves.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database file.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    pub(crate) fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            Error::Internal(format!(
                "database connection mutex poisoned (a thread panicked while holding the lock): {e}"
            ))
        })
    }

    /// Run read-only queries against the current committed state.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&SqliteStore<'_>) -> Result<T>) -> Result<T> {
        let conn = self.connection()?;
        f(&SqliteStore::new(&conn))
    }

    /// Run `f` in one `BEGIN IMMEDIATE` transaction, committing only if it succeeds.
    ///
    /// On error the transaction is dropped, which rolls it back.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&SqliteStore<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&SqliteStore::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }
}
