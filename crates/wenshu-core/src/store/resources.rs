//! Resource operations
//!
//! Resources are the text artifacts inside a document. Each may carry one
//! `resource_info` row with its author and period.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::documents::{document_from_row, DOCUMENT_COLUMNS};
use super::{ensure_row, exists, required, Store};
use crate::models::{
    Document, NewResource, Resource, ResourceEntry, ResourceInfo, ResourceUpdate, UserId,
};
use crate::storage::{StoreError, StoreResult};

pub(crate) const RESOURCE_COLUMNS: &str = "r.id, r.document_id, r.name, r.resource_type, \
     r.original_text, r.simplified_text, r.translated_text";

pub(crate) fn resource_from_row(row: &Row) -> rusqlite::Result<Resource> {
    Ok(Resource {
        id: row.get(0)?,
        document_id: row.get(1)?,
        name: row.get(2)?,
        resource_type: row.get(3)?,
        original_text: row.get(4)?,
        simplified_text: row.get(5)?,
        translated_text: row.get(6)?,
    })
}

pub(crate) fn fetch_resource(conn: &Connection, id: i64) -> StoreResult<Option<Resource>> {
    let res = conn
        .query_row(
            &format!("SELECT {} FROM resources r WHERE r.id = ?", RESOURCE_COLUMNS),
            [id],
            resource_from_row,
        )
        .optional()?;
    Ok(res)
}

pub(crate) fn collect_resources<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<Resource>> {
    let mut stmt = conn.prepare(sql)?;
    let resources = stmt
        .query_map(params, resource_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(resources)
}

fn check_name_free(conn: &Connection, name: &str, except_id: Option<i64>) -> StoreResult<()> {
    let taken = exists(
        conn,
        "SELECT 1 FROM resources WHERE name = ?1 AND (?2 IS NULL OR id != ?2)",
        params![name, except_id],
    )?;
    if taken {
        return Err(StoreError::conflict(format!(
            "resource name '{}' already exists",
            name
        )));
    }
    Ok(())
}

impl Store {
    // ==================== CRUD ====================

    /// Create a resource inside an existing document
    pub fn create_resource(&self, new: NewResource) -> StoreResult<Resource> {
        let name = required("resource name", &new.name)?;

        self.db.write(|tx| {
            ensure_row(tx, "documents", "Document", new.document_id)?;
            check_name_free(tx, &name, None)?;

            tx.execute(
                r#"
                INSERT INTO resources
                    (document_id, name, resource_type, original_text, simplified_text, translated_text)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![
                    new.document_id,
                    name,
                    new.resource_type,
                    new.original_text,
                    new.simplified_text,
                    new.translated_text,
                ],
            )
            .map_err(|e| {
                StoreError::from(e).or_conflict(format!("resource name '{}' already exists", name))
            })?;

            let id = tx.last_insert_rowid();
            info!(
                "Created resource {} ({}) in document {}",
                name, id, new.document_id
            );
            fetch_resource(tx, id)?.ok_or_else(|| StoreError::not_found("Resource", id))
        })
    }

    /// Get a resource by ID
    pub fn get_resource(&self, id: i64) -> StoreResult<Option<Resource>> {
        self.db.read(|conn| fetch_resource(conn, id))
    }

    /// Update the supplied fields of a resource
    ///
    /// Moving a resource to another document requires that document to exist.
    pub fn update_resource(&self, id: i64, update: ResourceUpdate) -> StoreResult<Resource> {
        let name = match update.name {
            Some(ref n) => Some(required("resource name", n)?),
            None => None,
        };

        self.db.write(|tx| {
            if fetch_resource(tx, id)?.is_none() {
                return Err(StoreError::not_found("Resource", id));
            }
            if let Some(document_id) = update.document_id {
                ensure_row(tx, "documents", "Document", document_id)?;
            }
            if let Some(ref name) = name {
                check_name_free(tx, name, Some(id))?;
            }

            tx.execute(
                r#"
                UPDATE resources SET
                    document_id = COALESCE(?1, document_id),
                    name = COALESCE(?2, name),
                    resource_type = COALESCE(?3, resource_type),
                    original_text = COALESCE(?4, original_text),
                    simplified_text = COALESCE(?5, simplified_text),
                    translated_text = COALESCE(?6, translated_text)
                WHERE id = ?7
                "#,
                params![
                    update.document_id,
                    name,
                    update.resource_type,
                    update.original_text,
                    update.simplified_text,
                    update.translated_text,
                    id,
                ],
            )
            .map_err(|e| StoreError::from(e).or_conflict("resource name already exists"))?;

            info!("Updated resource {}", id);
            fetch_resource(tx, id)?.ok_or_else(|| StoreError::not_found("Resource", id))
        })
    }

    /// Delete a resource and its notes, favorites and access records
    ///
    /// Returns `false` if no such resource existed.
    pub fn delete_resource(&self, id: i64) -> StoreResult<bool> {
        self.db.write(|tx| {
            let removed = tx.execute("DELETE FROM resources WHERE id = ?", [id])?;
            if removed > 0 {
                info!("Deleted resource {}", id);
            }
            Ok(removed > 0)
        })
    }

    // ==================== Listing ====================

    /// All resources of a document, ordered by ID
    pub fn resources_by_document(&self, document_id: i64) -> StoreResult<Vec<Resource>> {
        self.db.read(|conn| {
            collect_resources(
                conn,
                &format!(
                    "SELECT {} FROM resources r WHERE r.document_id = ? ORDER BY r.id",
                    RESOURCE_COLUMNS
                ),
                [document_id],
            )
        })
    }

    /// Resources of a document with their info and the viewer's favorite flag
    pub fn resource_entries(
        &self,
        document_id: i64,
        viewer: Option<UserId>,
    ) -> StoreResult<Vec<ResourceEntry>> {
        let viewer = viewer.filter(|id| *id > 0);
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {},
                    ri.resource_id, ri.author, ri.dynasty,
                    EXISTS (SELECT 1 FROM favorites f WHERE f.resource_id = r.id AND f.user_id = ?2)
                FROM resources r
                LEFT JOIN resource_info ri ON ri.resource_id = r.id
                WHERE r.document_id = ?1
                ORDER BY r.id
                "#,
                RESOURCE_COLUMNS
            ))?;
            let entries = stmt
                .query_map(params![document_id, viewer], |row| {
                    let info_id: Option<i64> = row.get(7)?;
                    Ok(ResourceEntry {
                        resource: resource_from_row(row)?,
                        info: match info_id {
                            Some(resource_id) => Some(ResourceInfo {
                                resource_id,
                                author: row.get(8)?,
                                dynasty: row.get(9)?,
                            }),
                            None => None,
                        },
                        favorited: row.get(10)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// The document a resource belongs to
    pub fn resource_document(&self, resource_id: i64) -> StoreResult<Option<Document>> {
        self.db.read(|conn| {
            let doc = conn
                .query_row(
                    &format!(
                        r#"
                        SELECT {} FROM documents d
                        JOIN resources r ON r.document_id = d.id
                        WHERE r.id = ?
                        "#,
                        DOCUMENT_COLUMNS
                    ),
                    [resource_id],
                    document_from_row,
                )
                .optional()?;
            Ok(doc)
        })
    }

    // ==================== Resource info ====================

    /// Create or replace the descriptive info of a resource
    pub fn set_resource_info(&self, info: ResourceInfo) -> StoreResult<ResourceInfo> {
        self.db.write(|tx| {
            ensure_row(tx, "resources", "Resource", info.resource_id)?;
            tx.execute(
                r#"
                INSERT INTO resource_info (resource_id, author, dynasty)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(resource_id) DO UPDATE SET
                    author = excluded.author,
                    dynasty = excluded.dynasty
                "#,
                params![info.resource_id, info.author, info.dynasty],
            )?;
            Ok(info.clone())
        })
    }

    /// Get the descriptive info of a resource
    pub fn get_resource_info(&self, resource_id: i64) -> StoreResult<Option<ResourceInfo>> {
        self.db.read(|conn| {
            let info = conn
                .query_row(
                    "SELECT resource_id, author, dynasty FROM resource_info WHERE resource_id = ?",
                    [resource_id],
                    |row| {
                        Ok(ResourceInfo {
                            resource_id: row.get(0)?,
                            author: row.get(1)?,
                            dynasty: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(info)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{document, resource, store, user};

    #[test]
    fn test_create_and_get_resource() {
        let store = store();
        let doc = document(&store, "出师表集");

        let created = store
            .create_resource(
                NewResource::new(doc.id, "出师表")
                    .resource_type("text")
                    .original_text("臣亮言：先帝創業未半")
                    .simplified_text("臣亮言：先帝创业未半")
                    .translated_text("先帝开创大业还未完成一半"),
            )
            .unwrap();

        let found = store.get_resource(created.id).unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.document_id, doc.id);
        assert!(store.get_resource(404).unwrap().is_none());
    }

    #[test]
    fn test_create_requires_existing_document() {
        let store = store();
        let err = store
            .create_resource(NewResource::new(99, "孤儿"))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                entity: "Document",
                id: 99
            }
        ));
    }

    #[test]
    fn test_resource_names_are_globally_unique() {
        let store = store();
        let a = document(&store, "甲集");
        let b = document(&store, "乙集");
        resource(&store, a.id, "同名", "");

        let err = store
            .create_resource(NewResource::new(b.id, "同名"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err = store
            .create_resource(NewResource::new(b.id, " "))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_update_resource_partial_and_move() {
        let store = store();
        let a = document(&store, "甲集");
        let b = document(&store, "乙集");
        let res = resource(&store, a.id, "篇一", "旧文");

        let updated = store
            .update_resource(
                res.id,
                ResourceUpdate {
                    document_id: Some(b.id),
                    translated_text: Some("译文".to_string()),
                    ..ResourceUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.document_id, b.id);
        assert_eq!(updated.name, "篇一");
        assert_eq!(updated.simplified_text.as_deref(), Some("旧文"));
        assert_eq!(updated.translated_text.as_deref(), Some("译文"));

        let err = store
            .update_resource(
                res.id,
                ResourceUpdate {
                    document_id: Some(999),
                    ..ResourceUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "Document", .. }));

        let err = store
            .update_resource(555, ResourceUpdate::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "Resource", .. }));
    }

    #[test]
    fn test_update_resource_rename_conflict() {
        let store = store();
        let doc = document(&store, "集");
        let first = resource(&store, doc.id, "一", "");
        resource(&store, doc.id, "二", "");

        let err = store
            .update_resource(
                first.id,
                ResourceUpdate {
                    name: Some("二".to_string()),
                    ..ResourceUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_resources_ordered_by_id() {
        let store = store();
        let doc = document(&store, "集");
        let ids: Vec<i64> = ["丙", "甲", "乙"]
            .iter()
            .map(|name| resource(&store, doc.id, name, "").id)
            .collect();

        let listed: Vec<i64> = store
            .resources_by_document(doc.id)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, ids);
        assert!(store.resources_by_document(999).unwrap().is_empty());
    }

    #[test]
    fn test_delete_resource() {
        let store = store();
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");

        assert!(store.delete_resource(res.id).unwrap());
        assert!(!store.delete_resource(res.id).unwrap());
        assert!(store.get_document(doc.id).unwrap().is_some());
    }

    #[test]
    fn test_resource_info_upsert() {
        let store = store();
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");

        assert!(store.get_resource_info(res.id).unwrap().is_none());

        store
            .set_resource_info(ResourceInfo {
                resource_id: res.id,
                author: Some("佚名".to_string()),
                dynasty: None,
            })
            .unwrap();
        store
            .set_resource_info(ResourceInfo {
                resource_id: res.id,
                author: Some("范仲淹".to_string()),
                dynasty: Some("北宋".to_string()),
            })
            .unwrap();

        let info = store.get_resource_info(res.id).unwrap().unwrap();
        assert_eq!(info.author.as_deref(), Some("范仲淹"));
        assert_eq!(info.dynasty.as_deref(), Some("北宋"));

        let err = store
            .set_resource_info(ResourceInfo {
                resource_id: 404,
                ..ResourceInfo::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_resource_entries_viewer_flags() {
        let store = store();
        let reader = user(&store, "reader");
        let doc = document(&store, "集");
        let first = resource(&store, doc.id, "一", "");
        let second = resource(&store, doc.id, "二", "");
        store
            .set_resource_info(ResourceInfo {
                resource_id: second.id,
                author: Some("诸葛亮".to_string()),
                dynasty: Some("三国".to_string()),
            })
            .unwrap();
        store.toggle_favorite(reader.id, first.id, None).unwrap();

        let entries = store.resource_entries(doc.id, Some(reader.id)).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].favorited);
        assert!(entries[0].info.is_none());
        assert!(!entries[1].favorited);
        assert_eq!(
            entries[1].info.as_ref().and_then(|i| i.author.as_deref()),
            Some("诸葛亮")
        );

        let anonymous = store.resource_entries(doc.id, None).unwrap();
        assert!(anonymous.iter().all(|e| !e.favorited));
    }

    #[test]
    fn test_resource_document_accessor() {
        let store = store();
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");

        let owner = store.resource_document(res.id).unwrap().unwrap();
        assert_eq!(owner.id, doc.id);
        assert!(store.resource_document(404).unwrap().is_none());
    }
}
