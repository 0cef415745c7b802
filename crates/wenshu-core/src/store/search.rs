//! Text search over resource transcriptions
//!
//! `fulltext_search` uses the trigram FTS index when the keyword is long
//! enough for it (three characters or more). Shorter keywords, which are
//! common for classical Chinese, fall back to a substring scan. Results are
//! ordered by resource ID in both cases.

use rusqlite::params;
use tracing::debug;

use super::escape_like;
use super::resources::{collect_resources, resource_from_row, RESOURCE_COLUMNS};
use super::Store;
use crate::models::{Resource, SearchHit, UserId};
use crate::storage::StoreResult;

/// Minimum keyword length the trigram tokenizer can match
const TRIGRAM_MIN_CHARS: usize = 3;

/// Quote a keyword as an FTS5 phrase so operators in it are taken literally
fn fts_phrase(keyword: &str) -> String {
    format!("\"{}\"", keyword.replace('"', "\"\""))
}

/// WHERE clause over `resources r` and its `?1` argument for a trimmed,
/// non-empty keyword
fn match_clause(keyword: &str, transcriptions_only: bool) -> (&'static str, String) {
    if transcriptions_only {
        (
            r#"r.simplified_text LIKE ?1 ESCAPE '\'
               OR r.translated_text LIKE ?1 ESCAPE '\'"#,
            format!("%{}%", escape_like(keyword)),
        )
    } else if keyword.chars().count() >= TRIGRAM_MIN_CHARS {
        debug!("Full-text search via index: {}", keyword);
        (
            "r.id IN (SELECT rowid FROM resources_fts WHERE resources_fts MATCH ?1)",
            fts_phrase(keyword),
        )
    } else {
        debug!("Full-text search via substring scan: {}", keyword);
        (
            r#"r.original_text LIKE ?1 ESCAPE '\'
               OR r.simplified_text LIKE ?1 ESCAPE '\'
               OR r.translated_text LIKE ?1 ESCAPE '\'"#,
            format!("%{}%", escape_like(keyword)),
        )
    }
}

impl Store {
    /// Resources whose original, simplified or translated text contains `keyword`
    pub fn fulltext_search(&self, keyword: &str) -> StoreResult<Vec<Resource>> {
        self.search_resources(keyword, false)
    }

    /// Resources whose simplified text or translation contains `keyword`
    ///
    /// Matches plain substrings only; the original text is not searched.
    pub fn search_transcriptions(&self, keyword: &str) -> StoreResult<Vec<Resource>> {
        self.search_resources(keyword, true)
    }

    fn search_resources(
        &self,
        keyword: &str,
        transcriptions_only: bool,
    ) -> StoreResult<Vec<Resource>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let (clause, pattern) = match_clause(keyword, transcriptions_only);

        self.db.read(|conn| {
            collect_resources(
                conn,
                &format!(
                    "SELECT {} FROM resources r WHERE ({}) ORDER BY r.id",
                    RESOURCE_COLUMNS, clause
                ),
                [pattern],
            )
        })
    }

    /// Search results with their document names and the viewer's favorite flags
    ///
    /// Matches the same resources as `fulltext_search`, or as
    /// `search_transcriptions` when `transcriptions_only` is set.
    pub fn search_hits(
        &self,
        keyword: &str,
        viewer: Option<UserId>,
        transcriptions_only: bool,
    ) -> StoreResult<Vec<SearchHit>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let viewer = viewer.filter(|id| *id > 0);
        let (clause, pattern) = match_clause(keyword, transcriptions_only);

        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {}, d.name,
                    EXISTS (SELECT 1 FROM favorites f WHERE f.resource_id = r.id AND f.user_id = ?2)
                FROM resources r
                JOIN documents d ON d.id = r.document_id
                WHERE ({})
                ORDER BY r.id
                "#,
                RESOURCE_COLUMNS, clause
            ))?;
            let hits = stmt
                .query_map(params![pattern, viewer], |row| {
                    Ok(SearchHit {
                        resource: resource_from_row(row)?,
                        document_name: row.get(7)?,
                        favorited: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(hits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewResource, ResourceUpdate};
    use crate::store::test_support::{document, resource, store, user};

    #[test]
    fn test_fts_phrase_escapes_quotes() {
        assert_eq!(fts_phrase("先帝创业"), "\"先帝创业\"");
        assert_eq!(fts_phrase("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_chushibiao_scenario() {
        let store = store();
        let reader = user(&store, "reader");
        let doc = document(&store, "出师表集");
        let res = resource(&store, doc.id, "出师表", "先帝创业未半而中道崩殂");
        resource(&store, doc.id, "岳阳楼记", "庆历四年春");

        let hits = store.fulltext_search("先帝").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, res.id);

        assert!(store.toggle_favorite(reader.id, res.id, None).unwrap().favorited);
        assert!(!store.toggle_favorite(reader.id, res.id, None).unwrap().favorited);
    }

    #[test]
    fn test_long_keywords_use_index() {
        let store = store();
        let doc = document(&store, "集");
        let first = store
            .create_resource(
                NewResource::new(doc.id, "甲")
                    .original_text("先帝創業未半")
                    .translated_text("先帝开创大业还未完成一半"),
            )
            .unwrap();
        let second = resource(&store, doc.id, "乙", "先帝创业未半");

        let hits: Vec<i64> = store
            .fulltext_search("先帝开创")
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(hits, vec![first.id]);

        let hits: Vec<i64> = store
            .fulltext_search("未半")
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(hits, vec![first.id, second.id]);
    }

    #[test]
    fn test_index_follows_updates_and_deletes() {
        let store = store();
        let doc = document(&store, "集");
        let res = resource(&store, doc.id, "篇", "庆历四年春");

        assert_eq!(store.fulltext_search("庆历四年").unwrap().len(), 1);

        store
            .update_resource(
                res.id,
                ResourceUpdate {
                    simplified_text: Some("滕子京谪守巴陵郡".to_string()),
                    ..ResourceUpdate::default()
                },
            )
            .unwrap();
        assert!(store.fulltext_search("庆历四年").unwrap().is_empty());
        assert_eq!(store.fulltext_search("巴陵郡").unwrap().len(), 1);

        store.delete_resource(res.id).unwrap();
        assert!(store.fulltext_search("巴陵郡").unwrap().is_empty());
    }

    #[test]
    fn test_missing_and_blank_keywords() {
        let store = store();
        let doc = document(&store, "集");
        resource(&store, doc.id, "篇", "先帝创业");

        assert!(store.fulltext_search("不存在的词").unwrap().is_empty());
        assert!(store.fulltext_search("无").unwrap().is_empty());
        assert!(store.fulltext_search("   ").unwrap().is_empty());
        assert!(store.search_transcriptions("").unwrap().is_empty());
    }

    #[test]
    fn test_wildcards_are_literal() {
        let store = store();
        let doc = document(&store, "集");
        let pct = resource(&store, doc.id, "甲", "完成100%");
        resource(&store, doc.id, "乙", "完成1000");

        let hits = store.fulltext_search("0%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, pct.id);
        assert_eq!(store.search_transcriptions("_").unwrap().len(), 0);
    }

    #[test]
    fn test_search_transcriptions_skips_original() {
        let store = store();
        let doc = document(&store, "集");
        store
            .create_resource(NewResource::new(doc.id, "甲").original_text("創業"))
            .unwrap();
        let simplified = resource(&store, doc.id, "乙", "创业");

        let hits = store.search_transcriptions("创业").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, simplified.id);
        assert!(store.search_transcriptions("創業").unwrap().is_empty());
        assert_eq!(store.fulltext_search("創業").unwrap().len(), 1);
    }

    #[test]
    fn test_search_hits_for_anonymous_viewer() {
        let store = store();
        let reader = user(&store, "reader");
        let doc = document(&store, "出师表集");
        let res = resource(&store, doc.id, "出师表", "先帝创业未半而中道崩殂");
        store.toggle_favorite(reader.id, res.id, None).unwrap();

        for viewer in [None, Some(0), Some(-1)] {
            let hits = store.search_hits("先帝", viewer, false).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].resource.id, res.id);
            assert_eq!(hits[0].document_name, "出师表集");
            assert!(!hits[0].favorited);
        }
    }

    #[test]
    fn test_search_hits_for_signed_in_viewer() {
        let store = store();
        let reader = user(&store, "reader");
        let other = user(&store, "other");
        let shu = document(&store, "蜀汉文书");
        let song = document(&store, "北宋文书");
        let chushi = resource(&store, shu.id, "出师表", "先帝创业未半");
        let yueyang = resource(&store, song.id, "岳阳楼记", "先帝之遗德");
        store.toggle_favorite(reader.id, yueyang.id, None).unwrap();
        store.toggle_favorite(other.id, chushi.id, None).unwrap();

        let hits = store.search_hits("先帝", Some(reader.id), false).unwrap();
        let seen: Vec<(i64, &str, bool)> = hits
            .iter()
            .map(|h| (h.resource.id, h.document_name.as_str(), h.favorited))
            .collect();
        assert_eq!(
            seen,
            vec![(chushi.id, "蜀汉文书", false), (yueyang.id, "北宋文书", true)]
        );

        let hits = store.search_hits("先帝创业", Some(other.id), true).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].favorited);
        assert!(store.search_hits("  ", Some(reader.id), false).unwrap().is_empty());
    }
}
