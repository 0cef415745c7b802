//! Document (文书) operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{exists, required, Store};
use crate::models::{Document, DocumentSummary, DocumentUpdate, NewDocument, UserId};
use crate::storage::{StoreError, StoreResult};

pub(crate) const DOCUMENT_COLUMNS: &str =
    "d.id, d.name, d.region, d.intro, d.cover IS NOT NULL";

pub(crate) fn document_from_row(row: &Row) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        name: row.get(1)?,
        region: row.get(2)?,
        intro: row.get(3)?,
        has_cover: row.get(4)?,
    })
}

pub(crate) fn fetch_document(conn: &Connection, id: i64) -> StoreResult<Option<Document>> {
    let doc = conn
        .query_row(
            &format!("SELECT {} FROM documents d WHERE d.id = ?", DOCUMENT_COLUMNS),
            [id],
            document_from_row,
        )
        .optional()?;
    Ok(doc)
}

fn collect_documents<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<Document>> {
    let mut stmt = conn.prepare(sql)?;
    let docs = stmt
        .query_map(params, document_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(docs)
}

/// Reject a document name already used by another document
fn check_name_free(conn: &Connection, name: &str, except_id: Option<i64>) -> StoreResult<()> {
    let taken = exists(
        conn,
        "SELECT 1 FROM documents WHERE name = ?1 AND (?2 IS NULL OR id != ?2)",
        params![name, except_id],
    )?;
    if taken {
        return Err(StoreError::conflict(format!(
            "document name '{}' already exists",
            name
        )));
    }
    Ok(())
}

/// Distinct non-empty authors of a document's resources, sorted
fn authors_of(conn: &Connection, document_id: i64) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT DISTINCT ri.author
        FROM resource_info ri
        JOIN resources r ON r.id = ri.resource_id
        WHERE r.document_id = ? AND ri.author IS NOT NULL AND ri.author != ''
        ORDER BY ri.author
        "#,
    )?;
    let authors = stmt
        .query_map([document_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(authors)
}

impl Store {
    // ==================== CRUD ====================

    /// Create a document
    pub fn create_document(&self, new: NewDocument) -> StoreResult<Document> {
        let name = required("document name", &new.name)?;

        self.db.write(|tx| {
            check_name_free(tx, &name, None)?;

            tx.execute(
                "INSERT INTO documents (name, region, intro) VALUES (?, ?, ?)",
                params![name, new.region, new.intro],
            )
            .map_err(|e| {
                StoreError::from(e).or_conflict(format!("document name '{}' already exists", name))
            })?;

            let id = tx.last_insert_rowid();
            info!("Created document {} ({})", name, id);
            fetch_document(tx, id)?.ok_or_else(|| StoreError::not_found("Document", id))
        })
    }

    /// Get a document by ID
    pub fn get_document(&self, id: i64) -> StoreResult<Option<Document>> {
        self.db.read(|conn| fetch_document(conn, id))
    }

    /// Update the supplied fields of a document
    pub fn update_document(&self, id: i64, update: DocumentUpdate) -> StoreResult<Document> {
        let name = match update.name {
            Some(ref n) => Some(required("document name", n)?),
            None => None,
        };

        self.db.write(|tx| {
            if fetch_document(tx, id)?.is_none() {
                return Err(StoreError::not_found("Document", id));
            }
            if let Some(ref name) = name {
                check_name_free(tx, name, Some(id))?;
            }

            tx.execute(
                r#"
                UPDATE documents SET
                    name = COALESCE(?1, name),
                    region = COALESCE(?2, region),
                    intro = COALESCE(?3, intro)
                WHERE id = ?4
                "#,
                params![name, update.region, update.intro, id],
            )
            .map_err(|e| StoreError::from(e).or_conflict("document name already exists"))?;

            info!("Updated document {}", id);
            fetch_document(tx, id)?.ok_or_else(|| StoreError::not_found("Document", id))
        })
    }

    /// Delete a document and, by cascade, everything attached to it
    ///
    /// Returns `false` if no such document existed.
    pub fn delete_document(&self, id: i64) -> StoreResult<bool> {
        self.db.write(|tx| {
            let removed = tx.execute("DELETE FROM documents WHERE id = ?", [id])?;
            if removed > 0 {
                info!("Deleted document {}", id);
            }
            Ok(removed > 0)
        })
    }

    // ==================== Cover ====================

    /// Store or clear a document's cover image
    pub fn set_document_cover(&self, id: i64, cover: Option<&[u8]>) -> StoreResult<()> {
        self.db.write(|tx| {
            let changed = tx.execute(
                "UPDATE documents SET cover = ? WHERE id = ?",
                params![cover, id],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("Document", id));
            }
            Ok(())
        })
    }

    /// Get a document's cover image, `None` if it has none
    pub fn get_document_cover(&self, id: i64) -> StoreResult<Option<Vec<u8>>> {
        self.db.read(|conn| {
            let cover: Option<Option<Vec<u8>>> = conn
                .query_row("SELECT cover FROM documents WHERE id = ?", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            cover.ok_or_else(|| StoreError::not_found("Document", id))
        })
    }

    // ==================== Queries ====================

    /// List all documents with their resource counts and authors, ordered by ID
    pub fn list_documents(&self) -> StoreResult<Vec<DocumentSummary>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {}, (SELECT COUNT(*) FROM resources r WHERE r.document_id = d.id)
                FROM documents d
                ORDER BY d.id
                "#,
                DOCUMENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], |row| Ok((document_from_row(row)?, row.get(5)?)))?
                .collect::<Result<Vec<(Document, i64)>, _>>()?;

            rows.into_iter()
                .map(|(document, resource_count)| {
                    Ok(DocumentSummary {
                        authors: authors_of(conn, document.id)?,
                        document,
                        resource_count,
                    })
                })
                .collect()
        })
    }

    /// Documents holding at least one resource by this author
    pub fn documents_by_author(&self, author: &str) -> StoreResult<Vec<Document>> {
        self.db.read(|conn| {
            collect_documents(
                conn,
                &format!(
                    r#"
                    SELECT DISTINCT {}
                    FROM documents d
                    JOIN resources r ON r.document_id = d.id
                    JOIN resource_info ri ON ri.resource_id = r.id
                    WHERE ri.author = ?
                    ORDER BY d.id
                    "#,
                    DOCUMENT_COLUMNS
                ),
                [author.trim()],
            )
        })
    }

    /// Distinct authors across all resources of a document, sorted
    pub fn document_authors(&self, id: i64) -> StoreResult<Vec<String>> {
        self.db.read(|conn| authors_of(conn, id))
    }

    /// Documents containing a resource the user has favorited
    pub fn favorite_documents(&self, user_id: UserId) -> StoreResult<Vec<Document>> {
        self.db.read(|conn| {
            collect_documents(
                conn,
                &format!(
                    r#"
                    SELECT DISTINCT {}
                    FROM documents d
                    JOIN resources r ON r.document_id = d.id
                    JOIN favorites f ON f.resource_id = r.id
                    WHERE f.user_id = ?
                    ORDER BY d.id
                    "#,
                    DOCUMENT_COLUMNS
                ),
                [user_id],
            )
        })
    }

    /// Number of resources in a document
    pub fn count_resources(&self, document_id: i64) -> StoreResult<i64> {
        self.db.read(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM resources WHERE document_id = ?",
                [document_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Number of resources of one type in a document
    pub fn count_resources_by_type(&self, document_id: i64, resource_type: &str) -> StoreResult<i64> {
        self.db.read(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM resources WHERE document_id = ? AND resource_type = ?",
                params![document_id, resource_type],
                |row| row.get(0),
            )?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewResource, ResourceInfo};
    use crate::store::test_support::{document, file_store, race, resource, store, user};
    use tempfile::TempDir;

    #[test]
    fn test_create_then_get_returns_same_fields() {
        let store = store();
        let created = store
            .create_document(NewDocument::new("出师表集").region("蜀汉").intro("诸葛亮奏表"))
            .unwrap();

        let found = store.get_document(created.id).unwrap().unwrap();
        assert_eq!(found.name, "出师表集");
        assert_eq!(found.region.as_deref(), Some("蜀汉"));
        assert_eq!(found.intro.as_deref(), Some("诸葛亮奏表"));
        assert!(!found.has_cover);
        assert_eq!(found, created);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = store();
        assert!(store.get_document(12345).unwrap().is_none());
    }

    #[test]
    fn test_create_duplicate_name_conflicts() {
        let store = store();
        document(&store, "岳阳楼记");

        let err = store
            .create_document(NewDocument::new("岳阳楼记"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_create_blank_name_is_invalid() {
        let store = store();
        let err = store.create_document(NewDocument::new("   ")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_update_is_partial() {
        let store = store();
        let doc = store
            .create_document(NewDocument::new("旧名").region("巴陵").intro("原简介"))
            .unwrap();

        let updated = store
            .update_document(
                doc.id,
                DocumentUpdate {
                    intro: Some("新简介".to_string()),
                    ..DocumentUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "旧名");
        assert_eq!(updated.region.as_deref(), Some("巴陵"));
        assert_eq!(updated.intro.as_deref(), Some("新简介"));
    }

    #[test]
    fn test_update_name_uniqueness_excludes_self() {
        let store = store();
        let a = document(&store, "甲");
        document(&store, "乙");

        // Renaming to its own name is fine
        let same = store
            .update_document(
                a.id,
                DocumentUpdate {
                    name: Some("甲".to_string()),
                    ..DocumentUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(same.name, "甲");

        let err = store
            .update_document(
                a.id,
                DocumentUpdate {
                    name: Some("乙".to_string()),
                    ..DocumentUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = store();
        let err = store
            .update_document(77, DocumentUpdate::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 77, .. }));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = store();
        let doc = document(&store, "待删");

        assert!(store.delete_document(doc.id).unwrap());
        assert!(!store.delete_document(doc.id).unwrap());
        assert!(store.get_document(doc.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_cascades_to_dependents() {
        let store = store();
        let reader = user(&store, "reader");
        let doc = document(&store, "出师表集");
        let res = resource(&store, doc.id, "出师表", "先帝创业未半");

        store
            .set_resource_info(ResourceInfo {
                resource_id: res.id,
                author: Some("诸葛亮".to_string()),
                dynasty: Some("三国".to_string()),
            })
            .unwrap();
        let note = store
            .create_note(reader.id, res.id, "好文", Some("批注"))
            .unwrap();
        store.toggle_favorite(reader.id, res.id, None).unwrap();
        store.record_access(reader.id, res.id, 40).unwrap();

        assert!(store.delete_document(doc.id).unwrap());

        assert!(store.get_resource(res.id).unwrap().is_none());
        assert!(store.get_resource_info(res.id).unwrap().is_none());
        assert!(store.get_note(note.id).unwrap().is_none());
        assert!(!store.is_favorited(Some(reader.id), res.id).unwrap());
        assert!(store
            .get_access_record(reader.id, res.id)
            .unwrap()
            .is_none());
        assert!(store.notes_by_user(reader.id).unwrap().is_empty());
        // The user survives
        assert!(store.get_user(reader.id).unwrap().is_some());
    }

    #[test]
    fn test_cover_round_trip() {
        let store = store();
        let doc = document(&store, "有封面");
        let png: &[u8] = &[0x89, 0x50, 0x4e, 0x47];

        store.set_document_cover(doc.id, Some(png)).unwrap();
        assert!(store.get_document(doc.id).unwrap().unwrap().has_cover);
        assert_eq!(
            store.get_document_cover(doc.id).unwrap(),
            Some(png.to_vec())
        );

        store.set_document_cover(doc.id, None).unwrap();
        assert_eq!(store.get_document_cover(doc.id).unwrap(), None);

        assert!(matches!(
            store.get_document_cover(999),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_documents_with_counts() {
        let store = store();
        let a = document(&store, "甲集");
        let b = document(&store, "乙集");
        resource(&store, a.id, "甲一", "");
        resource(&store, a.id, "甲二", "");

        let list = store.list_documents().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].document.id, a.id);
        assert_eq!(list[0].resource_count, 2);
        assert_eq!(list[1].document.id, b.id);
        assert_eq!(list[1].resource_count, 0);
        assert!(list[1].authors.is_empty());
    }

    #[test]
    fn test_list_documents_with_authors() {
        let store = store();
        let doc = document(&store, "蜀汉文书");
        let first = resource(&store, doc.id, "出师表", "");
        let second = resource(&store, doc.id, "后出师表", "");
        let third = resource(&store, doc.id, "诫子书", "");
        resource(&store, doc.id, "佚名", "");

        for (id, author) in [(first.id, "诸葛亮"), (second.id, "诸葛亮"), (third.id, "")] {
            store
                .set_resource_info(ResourceInfo {
                    resource_id: id,
                    author: Some(author.to_string()),
                    dynasty: None,
                })
                .unwrap();
        }

        let list = store.list_documents().unwrap();
        assert_eq!(list[0].resource_count, 4);
        assert_eq!(list[0].authors, vec!["诸葛亮"]);
    }

    #[test]
    fn test_documents_by_author_and_authors() {
        let store = store();
        let a = document(&store, "蜀汉文书");
        let b = document(&store, "北宋文书");
        let r1 = resource(&store, a.id, "出师表", "");
        let r2 = resource(&store, a.id, "后出师表", "");
        let r3 = resource(&store, b.id, "岳阳楼记", "");

        for (id, author) in [(r1.id, "诸葛亮"), (r2.id, "诸葛亮"), (r3.id, "范仲淹")] {
            store
                .set_resource_info(ResourceInfo {
                    resource_id: id,
                    author: Some(author.to_string()),
                    dynasty: None,
                })
                .unwrap();
        }

        let docs = store.documents_by_author("诸葛亮").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, a.id);
        assert!(store.documents_by_author("李白").unwrap().is_empty());

        assert_eq!(store.document_authors(a.id).unwrap(), vec!["诸葛亮"]);
        assert_eq!(store.document_authors(b.id).unwrap(), vec!["范仲淹"]);
    }

    #[test]
    fn test_favorite_documents_are_distinct() {
        let store = store();
        let reader = user(&store, "reader");
        let a = document(&store, "甲集");
        document(&store, "乙集");
        let r1 = resource(&store, a.id, "甲一", "");
        let r2 = resource(&store, a.id, "甲二", "");

        store.toggle_favorite(reader.id, r1.id, None).unwrap();
        store.toggle_favorite(reader.id, r2.id, None).unwrap();

        let docs = store.favorite_documents(reader.id).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, a.id);
        assert!(store.favorite_documents(0).unwrap().is_empty());
    }

    #[test]
    fn test_count_resources_by_type() {
        let store = store();
        let doc = document(&store, "混合");
        store
            .create_resource(NewResource::new(doc.id, "图一").resource_type("image"))
            .unwrap();
        store
            .create_resource(NewResource::new(doc.id, "文一").resource_type("text"))
            .unwrap();
        store
            .create_resource(NewResource::new(doc.id, "文二").resource_type("text"))
            .unwrap();

        assert_eq!(store.count_resources(doc.id).unwrap(), 3);
        assert_eq!(store.count_resources_by_type(doc.id, "text").unwrap(), 2);
        assert_eq!(store.count_resources_by_type(doc.id, "audio").unwrap(), 0);
    }

    #[test]
    fn test_concurrent_creates_single_winner() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir, 8);

        let results = race(&store, 8, |store, _| {
            store.create_document(NewDocument::new("同名"))
        });

        let created = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::Conflict(_))))
            .count();
        assert_eq!((created, conflicts), (1, 7));
        assert_eq!(store.list_documents().unwrap().len(), 1);
    }
}
