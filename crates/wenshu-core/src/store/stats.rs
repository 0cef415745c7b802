//! Aggregate statistics backed by the `v_document_stats` view

use rusqlite::{OptionalExtension, Row};

use super::Store;
use crate::models::{DocumentStats, Totals};
use crate::storage::StoreResult;

const STATS_COLUMNS: &str = "document_id, document_name, document_region, resource_count, \
     image_count, collection_count, annotation_count";

fn stats_from_row(row: &Row) -> rusqlite::Result<DocumentStats> {
    Ok(DocumentStats {
        document_id: row.get(0)?,
        document_name: row.get(1)?,
        document_region: row.get(2)?,
        resource_count: row.get(3)?,
        image_count: row.get(4)?,
        collection_count: row.get(5)?,
        annotation_count: row.get(6)?,
    })
}

impl Store {
    /// Counts for every document, ordered by document ID
    pub fn document_stats(&self) -> StoreResult<Vec<DocumentStats>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM v_document_stats ORDER BY document_id",
                STATS_COLUMNS
            ))?;
            let stats = stmt
                .query_map([], stats_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(stats)
        })
    }

    /// Counts for one document
    pub fn document_stats_for(&self, document_id: i64) -> StoreResult<Option<DocumentStats>> {
        self.db.read(|conn| {
            let stats = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM v_document_stats WHERE document_id = ?",
                        STATS_COLUMNS
                    ),
                    [document_id],
                    stats_from_row,
                )
                .optional()?;
            Ok(stats)
        })
    }

    /// Archive-wide totals
    pub fn totals(&self) -> StoreResult<Totals> {
        Ok(Totals::from_stats(&self.document_stats()?))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::NewResource;
    use crate::store::test_support::{document, resource, store, user};

    #[test]
    fn test_stats_count_everything() {
        let store = store();
        let reader = user(&store, "reader");
        let other = user(&store, "other");
        let doc = document(&store, "集");
        let empty = document(&store, "空集");
        let text = resource(&store, doc.id, "文", "");
        store
            .create_resource(NewResource::new(doc.id, "图一").resource_type("image"))
            .unwrap();
        store
            .create_resource(NewResource::new(doc.id, "图二").resource_type("图片"))
            .unwrap();

        store.toggle_favorite(reader.id, text.id, None).unwrap();
        store.toggle_favorite(other.id, text.id, None).unwrap();
        store.create_note(reader.id, text.id, "注", None).unwrap();

        let stats = store.document_stats().unwrap();
        assert_eq!(stats.len(), 2);

        let s = &stats[0];
        assert_eq!(s.document_id, doc.id);
        assert_eq!(s.resource_count, 3);
        assert_eq!(s.image_count, 2);
        assert_eq!(s.collection_count, 2);
        assert_eq!(s.annotation_count, 1);

        let blank = store.document_stats_for(empty.id).unwrap().unwrap();
        assert_eq!(blank.resource_count, 0);
        assert_eq!(blank.collection_count, 0);
        assert!(store.document_stats_for(404).unwrap().is_none());

        let totals = store.totals().unwrap();
        assert_eq!(totals.documents, 2);
        assert_eq!(totals.resources, 3);
        assert_eq!(totals.favorites, 2);
        assert_eq!(totals.notes, 1);
    }

    #[test]
    fn test_stats_follow_deletes() {
        let store = store();
        let reader = user(&store, "reader");
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "");
        store.toggle_favorite(reader.id, res.id, None).unwrap();

        store.delete_resource(res.id).unwrap();
        let s = store.document_stats_for(doc.id).unwrap().unwrap();
        assert_eq!(s.resource_count, 0);
        assert_eq!(s.collection_count, 0);
    }
}
