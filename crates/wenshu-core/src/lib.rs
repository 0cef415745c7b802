//! Wenshu Core Library
//!
//! This crate provides the data layer for Wenshu, an archive of historical
//! local-government documents (文书). Documents group resources; each
//! resource carries an original transcription, a simplified-character
//! version and a vernacular translation. Registered users annotate
//! resources with notes, bookmark them as favorites and have their reading
//! progress recorded.
//!
//! # Architecture
//!
//! - **SQLite**: Single source of truth, accessed through an r2d2 pool
//! - **FTS5**: Trigram index over the three text columns, kept in sync by triggers
//!
//! Every `Store` method is its own transaction, so concurrent callers never
//! share a connection.
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open()?;
//!
//! let doc = store.create_document(NewDocument::new("出师表集").region("蜀"))?;
//! let res = store.create_resource(
//!     NewResource::new(doc.id, "出师表").simplified_text("先帝创业未半而中道崩殂"),
//! )?;
//!
//! let hits = store.fulltext_search("先帝")?;
//! let stats = store.document_stats()?;
//! ```
//!
//! # Modules
//!
//! - `store`: Query and mutation layer (main entry point)
//! - `models`: Records for users, documents, resources, notes, favorites and progress
//! - `storage`: Connection pool, schema and error type
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod storage;
pub mod store;

pub use config::Config;
pub use models::{
    AccessRecord, Document, DocumentStats, DocumentSummary, DocumentUpdate, Favorite,
    FavoriteEntry, HistoryEntry, NewDocument, NewResource, NewUser, Note, NoteEntry, NoteUpdate,
    Resource, ResourceEntry, ResourceInfo, ResourceUpdate, SearchHit, ToggleOutcome, Totals, User,
    UserId,
};
pub use storage::{Database, StoreError, StoreResult};
pub use store::Store;
