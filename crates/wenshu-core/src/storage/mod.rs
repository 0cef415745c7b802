//! Storage layer
//!
//! Handles the SQLite schema, pooled per-request sessions, and the error
//! taxonomy shared by every query and mutation.
//!
//! ## Architecture
//!
//! - **Schema**: tables, indexes, the statistics view and the FTS index
//! - **Database**: `r2d2` pool handing out one connection per unit of work
//! - **Error**: `StoreError`, the failure classes callers can act on

pub mod database;
pub mod error;
pub mod schema;

pub use database::{Database, Session};
pub use error::{StoreError, StoreResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
