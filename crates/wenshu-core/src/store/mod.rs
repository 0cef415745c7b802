//! Query and mutation layer
//!
//! `Store` is the main entry point. Each public method is one unit of
//! work: it checks a connection out of the pool, runs inside its own
//! transaction, and releases the connection before returning.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open()?;
//!
//! let doc = store.create_document(NewDocument::new("出师表集"))?;
//! let res = store.create_resource(
//!     NewResource::new(doc.id, "出师表").simplified_text("先帝创业未半而中道崩殂"),
//! )?;
//!
//! let hits = store.fulltext_search("先帝")?;
//! let outcome = store.toggle_favorite(user.id, res.id, None)?;
//! ```
//!
//! ## Acting users
//!
//! Reads that depend on who is looking take `Option<UserId>`; `None` is an
//! anonymous viewer. Mutations on per-user records take a `UserId` and
//! refuse ids `<= 0` with `Forbidden` before touching any data.

mod access;
mod documents;
mod favorites;
mod notes;
mod resources;
mod search;
mod stats;
mod users;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Params};

use crate::config::Config;
use crate::models::UserId;
use crate::storage::{Database, StoreError, StoreResult};

/// Unified storage interface for the archive
pub struct Store {
    db: Database,
}

impl Store {
    /// Open the store using the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(&config)
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let db = Database::open(config).context("Failed to open database")?;
        Ok(Self { db })
    }

    /// Open a store backed by an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
        })
    }

    /// Get the underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }
}

// ==================== Shared helpers ====================

/// Current time as stored in the database (epoch milliseconds)
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

/// Trim a required text field, rejecting blank values
pub(crate) fn required(field: &str, value: &str) -> StoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::validation(format!("{} must not be blank", field)));
    }
    Ok(trimmed.to_string())
}

/// Refuse anonymous actors
pub(crate) fn require_actor(user_id: UserId) -> StoreResult<UserId> {
    if user_id <= 0 {
        return Err(StoreError::Forbidden);
    }
    Ok(user_id)
}

/// Check whether a query returns at least one row
pub(crate) fn exists<P: Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<bool> {
    Ok(conn.prepare(sql)?.exists(params)?)
}

/// Fail with `NotFound` unless `table` has a row with this id
pub(crate) fn ensure_row(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    id: i64,
) -> StoreResult<()> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT 1 FROM {} WHERE id = ?", table), [id], |row| {
            row.get(0)
        })
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::not_found(entity, id)),
    }
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `ESCAPE '\'`
pub(crate) fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
