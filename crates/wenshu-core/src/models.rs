//! Data models for the document archive
//!
//! One record type per table, plus the input records used by create and
//! update operations and the joined read records returned by list queries.
//! Records are plain data; formatting and truncation belong to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a registered user
pub type UserId = i64;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Opaque hash produced by the caller's password hasher
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub recovery_question: Option<String>,
    #[serde(skip_serializing, default)]
    pub recovery_answer: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a user
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub recovery_question: Option<String>,
    pub recovery_answer: Option<String>,
}

/// A named document collection (文书)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub region: Option<String>,
    pub intro: Option<String>,
    /// Whether a cover image is stored (fetch it with `Store::get_document_cover`)
    pub has_cover: bool,
}

/// Input for creating a document
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub name: String,
    pub region: Option<String>,
    pub intro: Option<String>,
}

impl NewDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn intro(mut self, intro: impl Into<String>) -> Self {
        self.intro = Some(intro.into());
        self
    }
}

/// Partial update of a document; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    pub name: Option<String>,
    pub region: Option<String>,
    pub intro: Option<String>,
}

impl DocumentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.region.is_none() && self.intro.is_none()
    }
}

/// A document with its resource count and authors, for listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    #[serde(flatten)]
    pub document: Document,
    pub resource_count: i64,
    /// Distinct non-empty authors of the document's resources, sorted
    pub authors: Vec<String>,
}

/// One text artifact within a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: i64,
    pub document_id: i64,
    pub name: String,
    pub resource_type: Option<String>,
    pub original_text: Option<String>,
    pub simplified_text: Option<String>,
    pub translated_text: Option<String>,
}

/// Input for creating a resource
#[derive(Debug, Clone, Default)]
pub struct NewResource {
    pub document_id: i64,
    pub name: String,
    pub resource_type: Option<String>,
    pub original_text: Option<String>,
    pub simplified_text: Option<String>,
    pub translated_text: Option<String>,
}

impl NewResource {
    pub fn new(document_id: i64, name: impl Into<String>) -> Self {
        Self {
            document_id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn original_text(mut self, text: impl Into<String>) -> Self {
        self.original_text = Some(text.into());
        self
    }

    pub fn simplified_text(mut self, text: impl Into<String>) -> Self {
        self.simplified_text = Some(text.into());
        self
    }

    pub fn translated_text(mut self, text: impl Into<String>) -> Self {
        self.translated_text = Some(text.into());
        self
    }
}

/// Partial update of a resource; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ResourceUpdate {
    pub document_id: Option<i64>,
    pub name: Option<String>,
    pub resource_type: Option<String>,
    pub original_text: Option<String>,
    pub simplified_text: Option<String>,
    pub translated_text: Option<String>,
}

/// Descriptive metadata for a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResourceInfo {
    pub resource_id: i64,
    pub author: Option<String>,
    /// Dynasty or period the text dates from
    pub dynasty: Option<String>,
}

/// A resource as seen by a particular viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceEntry {
    #[serde(flatten)]
    pub resource: Resource,
    pub info: Option<ResourceInfo>,
    /// Always false for anonymous viewers
    pub favorited: bool,
}

/// A search result with the name of its document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(flatten)]
    pub resource: Resource,
    pub document_name: String,
    /// Always false for anonymous viewers
    pub favorited: bool,
}

/// A user's annotation on a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: i64,
    pub user_id: UserId,
    pub resource_id: i64,
    pub content: String,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a note; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub content: Option<String>,
    /// Trimmed before storing; a blank value clears the tags
    pub tags: Option<String>,
}

/// A note together with where it is attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteEntry {
    #[serde(flatten)]
    pub note: Note,
    pub resource_name: String,
    pub document_id: i64,
    pub document_name: String,
}

/// A user's bookmark on a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    pub id: i64,
    pub user_id: UserId,
    pub resource_id: i64,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A favorite together with the resource and document it points at
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoriteEntry {
    #[serde(flatten)]
    pub favorite: Favorite,
    pub resource_name: String,
    pub document_id: i64,
    pub document_name: String,
}

/// Result of toggling a favorite
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Whether the resource is favorited after the toggle
    pub favorited: bool,
}

/// A user's reading progress on a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessRecord {
    pub id: i64,
    pub user_id: UserId,
    pub resource_id: i64,
    /// Percentage read, always within 0..=100
    pub progress: i64,
    pub accessed_at: DateTime<Utc>,
}

/// An access record together with what was read
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: AccessRecord,
    pub resource_name: String,
    pub document_id: i64,
    pub document_name: String,
}

/// Per-document aggregate counts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentStats {
    pub document_id: i64,
    pub document_name: String,
    pub document_region: Option<String>,
    pub resource_count: i64,
    pub image_count: i64,
    /// Number of favorites on the document's resources
    pub collection_count: i64,
    /// Number of notes on the document's resources
    pub annotation_count: i64,
}

/// Archive-wide totals
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Totals {
    pub documents: i64,
    pub resources: i64,
    pub favorites: i64,
    pub notes: i64,
}

impl Totals {
    /// Sum per-document statistics
    pub fn from_stats(stats: &[DocumentStats]) -> Self {
        stats.iter().fold(
            Totals {
                documents: stats.len() as i64,
                ..Totals::default()
            },
            |mut acc, s| {
                acc.resources += s.resource_count;
                acc.favorites += s.collection_count;
                acc.notes += s.annotation_count;
                acc
            },
        )
    }
}

/// Clamp a reading progress value into 0..=100
pub fn clamp_progress(progress: i64) -> i64 {
    progress.clamp(0, 100)
}
