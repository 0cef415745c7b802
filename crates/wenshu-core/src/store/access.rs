//! Reading progress
//!
//! One access record per (user, resource); each visit overwrites the
//! previous progress and timestamp.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{ensure_row, now_millis, require_actor, to_datetime, Store};
use crate::models::{clamp_progress, AccessRecord, HistoryEntry, UserId};
use crate::storage::{StoreError, StoreResult};

const ACCESS_COLUMNS: &str = "a.id, a.user_id, a.resource_id, a.progress, a.accessed_at";

fn record_from_row(row: &Row) -> rusqlite::Result<AccessRecord> {
    Ok(AccessRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        resource_id: row.get(2)?,
        progress: row.get(3)?,
        accessed_at: to_datetime(row.get(4)?),
    })
}

fn fetch_record(
    conn: &Connection,
    user_id: UserId,
    resource_id: i64,
) -> StoreResult<Option<AccessRecord>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {} FROM access_records a WHERE a.user_id = ? AND a.resource_id = ?",
                ACCESS_COLUMNS
            ),
            params![user_id, resource_id],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

impl Store {
    /// Record that a user read a resource up to `progress` percent
    ///
    /// Out-of-range progress is clamped into 0..=100.
    pub fn record_access(
        &self,
        user_id: UserId,
        resource_id: i64,
        progress: i64,
    ) -> StoreResult<AccessRecord> {
        let user_id = require_actor(user_id)?;
        let progress = clamp_progress(progress);

        self.db.write(|tx| {
            ensure_row(tx, "users", "User", user_id)?;
            ensure_row(tx, "resources", "Resource", resource_id)?;

            tx.execute(
                r#"
                INSERT INTO access_records (user_id, resource_id, progress, accessed_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id, resource_id) DO UPDATE SET
                    progress = excluded.progress,
                    accessed_at = excluded.accessed_at
                "#,
                params![user_id, resource_id, progress, now_millis()],
            )?;

            debug!(
                "User {} read resource {} to {}%",
                user_id, resource_id, progress
            );
            fetch_record(tx, user_id, resource_id)?
                .ok_or_else(|| StoreError::not_found("AccessRecord", resource_id))
        })
    }

    /// A user's progress on one resource, if they have opened it
    pub fn get_access_record(
        &self,
        user_id: UserId,
        resource_id: i64,
    ) -> StoreResult<Option<AccessRecord>> {
        self.db
            .read(|conn| fetch_record(conn, user_id, resource_id))
    }

    /// Everything a user has read, most recent first
    pub fn access_history(&self, user_id: UserId) -> StoreResult<Vec<HistoryEntry>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {}, r.name, d.id, d.name
                FROM access_records a
                JOIN resources r ON r.id = a.resource_id
                JOIN documents d ON d.id = r.document_id
                WHERE a.user_id = ?
                ORDER BY a.accessed_at DESC, a.id DESC
                "#,
                ACCESS_COLUMNS
            ))?;
            let entries = stmt
                .query_map([user_id], |row| {
                    Ok(HistoryEntry {
                        record: record_from_row(row)?,
                        resource_name: row.get(5)?,
                        document_id: row.get(6)?,
                        document_name: row.get(7)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }
}
