//! Pooled SQLite sessions
//!
//! Every operation borrows its own connection from an `r2d2` pool and
//! runs inside its own transaction. Connections are never shared between
//! concurrent callers and go back to the pool when the session is dropped,
//! whether the operation succeeded or failed.
//!
//! Writes use `BEGIN IMMEDIATE`, which takes SQLite's write lock up
//! front. Check-then-act sequences (uniqueness pre-checks, favorite
//! toggles) therefore run one at a time per database file, while the
//! UNIQUE constraints in the schema remain the final guard.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::storage::error::StoreResult;
use crate::storage::schema::{init_schema, needs_init};

/// A connection checked out of the pool for one unit of work
pub type Session = PooledConnection<SqliteConnectionManager>;

/// Connection pool over the archive database
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open or create the database described by the configuration
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_path(
            &config.database_path(),
            config.pool_size,
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    /// Open or create a database file with an explicit pool size
    pub fn open_path(path: &Path, pool_size: u32, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(busy_timeout.max(Duration::from_secs(1)))
            .build(manager)
            .with_context(|| format!("Failed to open SQLite database at {:?}", path))?;

        let db = Self {
            pool,
            path: Some(path.to_path_buf()),
        };
        db.ensure_schema()?;

        info!("Opened database {:?} (pool size {})", path, pool_size.max(1));
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    ///
    /// The pool holds a single connection that is never recycled, since
    /// each in-memory connection is a separate database.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .context("Failed to open in-memory database")?;

        let db = Self { pool, path: None };
        db.ensure_schema()?;
        Ok(db)
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Check out a connection for one unit of work
    pub fn session(&self) -> StoreResult<Session> {
        let session = self.pool.get()?;
        debug!(
            "Session acquired ({} idle of {})",
            self.pool.state().idle_connections,
            self.pool.state().connections
        );
        Ok(session)
    }

    /// Run a read-only unit of work in a deferred transaction
    ///
    /// All queries inside `f` see one consistent snapshot.
    pub fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let mut session = self.session()?;
        let tx = session.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run a unit of work that writes, committing only if `f` succeeds
    ///
    /// On error the transaction is dropped, which rolls it back.
    pub fn write<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction) -> StoreResult<T>,
    {
        let mut session = self.session()?;
        let tx = session.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.pool.get().context("Failed to get a database connection")?;
        if needs_init(&conn) {
            init_schema(&conn).context("Failed to initialize SQLite schema")?;
            info!("Initialized database schema");
        }
        Ok(())
    }
}
