//! Favorites
//!
//! A user has at most one favorite per resource. Toggling runs inside a
//! single immediate transaction so concurrent toggles cannot leave a
//! duplicate row behind.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

use super::documents::{document_from_row, DOCUMENT_COLUMNS};
use super::{ensure_row, exists, now_millis, require_actor, to_datetime, Store};
use crate::models::{Document, Favorite, FavoriteEntry, ToggleOutcome, UserId};
use crate::storage::{StoreError, StoreResult};

const FAVORITE_COLUMNS: &str = "f.id, f.user_id, f.resource_id, f.tags, f.created_at";

fn favorite_from_row(row: &Row) -> rusqlite::Result<Favorite> {
    Ok(Favorite {
        id: row.get(0)?,
        user_id: row.get(1)?,
        resource_id: row.get(2)?,
        tags: row.get(3)?,
        created_at: to_datetime(row.get(4)?),
    })
}

fn fetch_favorite(conn: &Connection, id: i64) -> StoreResult<Option<Favorite>> {
    let fav = conn
        .query_row(
            &format!("SELECT {} FROM favorites f WHERE f.id = ?", FAVORITE_COLUMNS),
            [id],
            favorite_from_row,
        )
        .optional()?;
    Ok(fav)
}

fn owned_favorite(conn: &Connection, actor: UserId, id: i64) -> StoreResult<Favorite> {
    let fav = fetch_favorite(conn, id)?.ok_or_else(|| StoreError::not_found("Favorite", id))?;
    if fav.user_id != actor {
        return Err(StoreError::Forbidden);
    }
    Ok(fav)
}

impl Store {
    /// Favorite a resource, or remove the favorite if it already exists
    pub fn toggle_favorite(
        &self,
        user_id: UserId,
        resource_id: i64,
        tags: Option<&str>,
    ) -> StoreResult<ToggleOutcome> {
        let user_id = require_actor(user_id)?;
        let tags = tags.map(str::trim).filter(|t| !t.is_empty());

        self.db.write(|tx| {
            ensure_row(tx, "users", "User", user_id)?;
            ensure_row(tx, "resources", "Resource", resource_id)?;

            let removed = tx.execute(
                "DELETE FROM favorites WHERE user_id = ? AND resource_id = ?",
                params![user_id, resource_id],
            )?;
            if removed > 0 {
                info!("User {} unfavorited resource {}", user_id, resource_id);
                return Ok(ToggleOutcome { favorited: false });
            }

            let inserted = tx.execute(
                r#"
                INSERT INTO favorites (user_id, resource_id, tags, created_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(user_id, resource_id) DO NOTHING
                "#,
                params![user_id, resource_id, tags, now_millis()],
            )?;
            if inserted == 0 {
                warn!(
                    "Favorite for user {} on resource {} appeared mid-toggle",
                    user_id, resource_id
                );
            } else {
                info!("User {} favorited resource {}", user_id, resource_id);
            }
            Ok(ToggleOutcome { favorited: true })
        })
    }

    /// Whether `viewer` has favorited a resource; anonymous viewers never have
    pub fn is_favorited(&self, viewer: Option<UserId>, resource_id: i64) -> StoreResult<bool> {
        let Some(user_id) = viewer.filter(|id| *id > 0) else {
            return Ok(false);
        };
        self.db.read(|conn| {
            exists(
                conn,
                "SELECT 1 FROM favorites WHERE user_id = ? AND resource_id = ?",
                params![user_id, resource_id],
            )
        })
    }

    /// Get a favorite by ID
    pub fn get_favorite(&self, id: i64) -> StoreResult<Option<Favorite>> {
        self.db.read(|conn| fetch_favorite(conn, id))
    }

    /// A user's favorites with resource and document names, newest first
    pub fn favorites_by_user(&self, user_id: UserId) -> StoreResult<Vec<FavoriteEntry>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {}, r.name, d.id, d.name
                FROM favorites f
                JOIN resources r ON r.id = f.resource_id
                JOIN documents d ON d.id = r.document_id
                WHERE f.user_id = ?
                ORDER BY f.created_at DESC, f.id DESC
                "#,
                FAVORITE_COLUMNS
            ))?;
            let entries = stmt
                .query_map([user_id], |row| {
                    Ok(FavoriteEntry {
                        favorite: favorite_from_row(row)?,
                        resource_name: row.get(5)?,
                        document_id: row.get(6)?,
                        document_name: row.get(7)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// Number of users who favorited a resource
    pub fn favorite_count(&self, resource_id: i64) -> StoreResult<i64> {
        self.db.read(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM favorites WHERE resource_id = ?",
                [resource_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Replace the tags on one of `actor`'s favorites
    pub fn update_favorite_tags(
        &self,
        actor: UserId,
        favorite_id: i64,
        tags: Option<&str>,
    ) -> StoreResult<Favorite> {
        let actor = require_actor(actor)?;
        let tags = tags.map(str::trim).filter(|t| !t.is_empty());

        self.db.write(|tx| {
            owned_favorite(tx, actor, favorite_id)?;
            tx.execute(
                "UPDATE favorites SET tags = ? WHERE id = ?",
                params![tags, favorite_id],
            )?;
            fetch_favorite(tx, favorite_id)?
                .ok_or_else(|| StoreError::not_found("Favorite", favorite_id))
        })
    }

    /// Remove one of `actor`'s favorites by its ID
    pub fn delete_favorite(&self, actor: UserId, favorite_id: i64) -> StoreResult<()> {
        let actor = require_actor(actor)?;
        self.db.write(|tx| {
            owned_favorite(tx, actor, favorite_id)?;
            tx.execute("DELETE FROM favorites WHERE id = ?", [favorite_id])?;
            info!("User {} deleted favorite {}", actor, favorite_id);
            Ok(())
        })
    }

    /// The document a favorite's resource belongs to
    pub fn favorite_document(&self, favorite_id: i64) -> StoreResult<Option<Document>> {
        self.db.read(|conn| {
            let doc = conn
                .query_row(
                    &format!(
                        r#"
                        SELECT {} FROM documents d
                        JOIN resources r ON r.document_id = d.id
                        JOIN favorites f ON f.resource_id = r.id
                        WHERE f.id = ?
                        "#,
                        DOCUMENT_COLUMNS
                    ),
                    [favorite_id],
                    document_from_row,
                )
                .optional()?;
            Ok(doc)
        })
    }
}
