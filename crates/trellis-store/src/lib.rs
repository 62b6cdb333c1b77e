//! Trellis Store — durable SQLite graph store.
//!
//! Single source of truth for files, symbols, edges, and metrics. Uses
//! rusqlite with bundled SQLite, WAL mode, and an embedded schema. Writes go
//! through transactional batches ([`WriteBatch`]); reads are point queries or
//! chunked bulk exports.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;
use thiserror::Error;
use trellis_core::IndexConfig;

mod batch;
mod queries;


pub use batch::{BatchSummary, EdgeWrite, FileWrite, MetricWrite, SymbolWrite, WriteBatch};
pub use queries::{EdgeDirection, GraphScope, Lookup, Scope, ScopeEdge, ScopeNode};

const SCHEMA: &str = include_str!("schema.sql");

/// Errors surfaced by the store layer.
///
/// `NotFound`/`Ambiguous` lookups are values ([`Lookup`]), not errors; only
/// genuine store failures land here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    /// A batch would have left a dangling edge; the batch was rolled back.
    #[error("store integrity violation: {0}")]
    Integrity(String),

    /// Writer contention outlasted the busy timeout.
    #[error("store busy: timed out waiting for the writer")]
    Busy,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, _) = &e {
            if err.code == rusqlite::ErrorCode::DatabaseBusy {
                return StoreError::Busy;
            }
        }
        StoreError::Sqlite(e)
    }
}

/// SQLite-backed graph store.
///
/// Wraps `rusqlite::Connection` in a `Mutex` to satisfy `Send + Sync`; the
/// single connection is the store's write-serialization point.
pub struct Store {
    conn: Mutex<Connection>,
    chunk_size: usize,
}

impl Store {
    /// Get a lock on the underlying connection.
    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Store mutex poisoned")
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Default database location for a project root.
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(".trellis").join("index.db")
    }

    /// Open (or create) the store at the given path.
    pub fn open(path: &Path, config: &IndexConfig) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers while a writer commits
        conn.pragma_update(None, "journal_mode", "WAL")?;
        // 64MB cache
        conn.pragma_update(None, "cache_size", -64000i64)?;
        // Foreign keys ON
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        // Bounded wait on writer contention, then StoreError::Busy
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        conn.execute_batch(SCHEMA)?;

        Ok(Store {
            conn: Mutex::new(conn),
            chunk_size: config.store.chunk_size,
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store {
            conn: Mutex::new(conn),
            chunk_size: IndexConfig::default().store.chunk_size,
        })
    }
}

/// Store handle plus configuration, created at the start of an operation and
/// threaded through every call. Nothing in the engine is process-global.
pub struct EngineContext {
    pub store: Store,
    pub config: IndexConfig,
}

impl EngineContext {
    /// Open the store for a project root and load its configuration.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let config = IndexConfig::load(root).map_err(|e| StoreError::Config(e.to_string()))?;
        let store = Store::open(&Store::default_path(root), &config)?;
        Ok(EngineContext { store, config })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(EngineContext {
            store: Store::open_in_memory()?,
            config: IndexConfig::default(),
        })
    }
}
