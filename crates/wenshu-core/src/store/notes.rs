//! Notes (annotations) on resources
//!
//! Only the author of a note may edit or delete it.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::documents::{document_from_row, DOCUMENT_COLUMNS};
use super::{ensure_row, now_millis, require_actor, required, to_datetime, Store};
use crate::models::{Document, Note, NoteEntry, NoteUpdate, UserId};
use crate::storage::{StoreError, StoreResult};

const NOTE_COLUMNS: &str =
    "n.id, n.user_id, n.resource_id, n.content, n.tags, n.created_at, n.updated_at";

fn note_from_row(row: &Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        user_id: row.get(1)?,
        resource_id: row.get(2)?,
        content: row.get(3)?,
        tags: row.get(4)?,
        created_at: to_datetime(row.get(5)?),
        updated_at: to_datetime(row.get(6)?),
    })
}

fn fetch_note(conn: &Connection, id: i64) -> StoreResult<Option<Note>> {
    let note = conn
        .query_row(
            &format!("SELECT {} FROM notes n WHERE n.id = ?", NOTE_COLUMNS),
            [id],
            note_from_row,
        )
        .optional()?;
    Ok(note)
}

/// Load a note and check that `actor` wrote it
fn owned_note(conn: &Connection, actor: UserId, id: i64) -> StoreResult<Note> {
    let note = fetch_note(conn, id)?.ok_or_else(|| StoreError::not_found("Note", id))?;
    if note.user_id != actor {
        return Err(StoreError::Forbidden);
    }
    Ok(note)
}

impl Store {
    /// Attach a note to a resource
    pub fn create_note(
        &self,
        user_id: UserId,
        resource_id: i64,
        content: &str,
        tags: Option<&str>,
    ) -> StoreResult<Note> {
        let user_id = require_actor(user_id)?;
        let content = required("note content", content)?;
        let tags = tags.map(str::trim).filter(|t| !t.is_empty());

        self.db.write(|tx| {
            ensure_row(tx, "users", "User", user_id)?;
            ensure_row(tx, "resources", "Resource", resource_id)?;

            let now = now_millis();
            tx.execute(
                r#"
                INSERT INTO notes (user_id, resource_id, content, tags, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![user_id, resource_id, content, tags, now, now],
            )?;

            let id = tx.last_insert_rowid();
            info!(
                "User {} added note {} on resource {}",
                user_id, id, resource_id
            );
            fetch_note(tx, id)?.ok_or_else(|| StoreError::not_found("Note", id))
        })
    }

    /// Get a note by ID
    pub fn get_note(&self, id: i64) -> StoreResult<Option<Note>> {
        self.db.read(|conn| fetch_note(conn, id))
    }

    /// All notes on a resource, oldest first
    pub fn notes_by_resource(&self, resource_id: i64) -> StoreResult<Vec<Note>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM notes n WHERE n.resource_id = ? ORDER BY n.created_at, n.id",
                NOTE_COLUMNS
            ))?;
            let notes = stmt
                .query_map([resource_id], note_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(notes)
        })
    }

    /// A user's notes with resource and document names, most recently edited first
    pub fn notes_by_user(&self, user_id: UserId) -> StoreResult<Vec<NoteEntry>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {}, r.name, d.id, d.name
                FROM notes n
                JOIN resources r ON r.id = n.resource_id
                JOIN documents d ON d.id = r.document_id
                WHERE n.user_id = ?
                ORDER BY n.updated_at DESC, n.id DESC
                "#,
                NOTE_COLUMNS
            ))?;
            let entries = stmt
                .query_map([user_id], |row| {
                    Ok(NoteEntry {
                        note: note_from_row(row)?,
                        resource_name: row.get(7)?,
                        document_id: row.get(8)?,
                        document_name: row.get(9)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// Edit a note's content or tags
    ///
    /// Blank tags clear the note's tags. `updated_at` never moves backwards,
    /// even if the clock does.
    pub fn update_note(&self, actor: UserId, id: i64, update: NoteUpdate) -> StoreResult<Note> {
        let actor = require_actor(actor)?;
        let content = match update.content {
            Some(ref c) => Some(required("note content", c)?),
            None => None,
        };

        self.db.write(|tx| {
            let note = owned_note(tx, actor, id)?;
            let updated_at = now_millis().max(note.updated_at.timestamp_millis());
            let tags = match update.tags.as_deref() {
                Some(t) => Some(t.trim()).filter(|t| !t.is_empty()),
                None => note.tags.as_deref(),
            };

            tx.execute(
                r#"
                UPDATE notes SET
                    content = COALESCE(?1, content),
                    tags = ?2,
                    updated_at = ?3
                WHERE id = ?4
                "#,
                params![content, tags, updated_at, id],
            )?;

            info!("User {} updated note {}", actor, id);
            fetch_note(tx, id)?.ok_or_else(|| StoreError::not_found("Note", id))
        })
    }

    /// Delete a note written by `actor`
    pub fn delete_note(&self, actor: UserId, id: i64) -> StoreResult<()> {
        let actor = require_actor(actor)?;
        self.db.write(|tx| {
            owned_note(tx, actor, id)?;
            tx.execute("DELETE FROM notes WHERE id = ?", [id])?;
            info!("User {} deleted note {}", actor, id);
            Ok(())
        })
    }

    /// The document a note's resource belongs to
    pub fn note_document(&self, note_id: i64) -> StoreResult<Option<Document>> {
        self.db.read(|conn| {
            let doc = conn
                .query_row(
                    &format!(
                        r#"
                        SELECT {} FROM documents d
                        JOIN resources r ON r.document_id = d.id
                        JOIN notes n ON n.resource_id = r.id
                        WHERE n.id = ?
                        "#,
                        DOCUMENT_COLUMNS
                    ),
                    [note_id],
                    document_from_row,
                )
                .optional()?;
            Ok(doc)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{document, resource, store, user};

    #[test]
    fn test_create_and_list_notes() {
        let store = store();
        let author = user(&store, "author");
        let doc = document(&store, "出师表集");
        let res = resource(&store, doc.id, "出师表", "先帝创业未半");

        let first = store
            .create_note(author.id, res.id, "开篇点题", Some("结构"))
            .unwrap();
        let second = store.create_note(author.id, res.id, "忠言", None).unwrap();

        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(first.tags.as_deref(), Some("结构"));
        assert!(second.tags.is_none());

        let ids: Vec<i64> = store
            .notes_by_resource(res.id)
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);

        let entries = store.notes_by_user(author.id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].resource_name, "出师表");
        assert_eq!(entries[0].document_id, doc.id);
        assert_eq!(entries[0].document_name, "出师表集");
    }

    #[test]
    fn test_create_note_validation() {
        let store = store();
        let author = user(&store, "author");
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");

        assert!(matches!(
            store.create_note(0, res.id, "匿名", None),
            Err(StoreError::Forbidden)
        ));
        assert!(matches!(
            store.create_note(author.id, res.id, "  ", None),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.create_note(author.id, 404, "无处", None),
            Err(StoreError::NotFound {
                entity: "Resource",
                ..
            })
        ));
        assert!(matches!(
            store.create_note(999, res.id, "无人", None),
            Err(StoreError::NotFound { entity: "User", .. })
        ));
    }

    #[test]
    fn test_update_note_by_owner() {
        let store = store();
        let author = user(&store, "author");
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");
        let note = store
            .create_note(author.id, res.id, "初稿", Some("草"))
            .unwrap();

        let updated = store
            .update_note(
                author.id,
                note.id,
                NoteUpdate {
                    content: Some("定稿".to_string()),
                    tags: None,
                },
            )
            .unwrap();

        assert_eq!(updated.content, "定稿");
        assert_eq!(updated.tags.as_deref(), Some("草"));
        assert_eq!(updated.created_at, note.created_at);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn test_update_note_tags_are_trimmed_and_clearable() {
        let store = store();
        let author = user(&store, "author");
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");
        let note = store
            .create_note(author.id, res.id, "初稿", Some("草"))
            .unwrap();

        let tags = |tags: &str| NoteUpdate {
            content: None,
            tags: Some(tags.to_string()),
        };

        let updated = store.update_note(author.id, note.id, tags("  蜀汉 ")).unwrap();
        assert_eq!(updated.tags.as_deref(), Some("蜀汉"));

        let updated = store.update_note(author.id, note.id, tags("   ")).unwrap();
        assert_eq!(updated.tags, None);
        assert_eq!(updated.content, "初稿");

        let stored = store.get_note(note.id).unwrap().unwrap();
        assert_eq!(stored.tags, None);
    }

    #[test]
    fn test_other_users_cannot_touch_note() {
        let store = store();
        let author = user(&store, "author");
        let other = user(&store, "other");
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");
        let note = store.create_note(author.id, res.id, "原文", None).unwrap();

        let err = store
            .update_note(
                other.id,
                note.id,
                NoteUpdate {
                    content: Some("篡改".to_string()),
                    tags: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));
        assert!(matches!(
            store.delete_note(other.id, note.id),
            Err(StoreError::Forbidden)
        ));

        let unchanged = store.get_note(note.id).unwrap().unwrap();
        assert_eq!(unchanged.content, "原文");
    }

    #[test]
    fn test_delete_note() {
        let store = store();
        let author = user(&store, "author");
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");
        let note = store.create_note(author.id, res.id, "删", None).unwrap();

        store.delete_note(author.id, note.id).unwrap();
        assert!(store.get_note(note.id).unwrap().is_none());
        assert!(matches!(
            store.delete_note(author.id, note.id),
            Err(StoreError::NotFound { entity: "Note", .. })
        ));
    }

    #[test]
    fn test_note_document_accessor() {
        let store = store();
        let author = user(&store, "author");
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");
        let note = store.create_note(author.id, res.id, "注", None).unwrap();

        assert_eq!(store.note_document(note.id).unwrap().unwrap().id, doc.id);
        assert!(store.note_document(404).unwrap().is_none());
    }
}
