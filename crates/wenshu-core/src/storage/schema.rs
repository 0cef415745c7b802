//! SQLite schema for the document archive
//!
//! Tables follow the archive's relational model: users, documents and
//! their resources, per-resource descriptive info, and the per-user
//! notes, favorites and access records hanging off resources. Deleting a
//! document cascades through its resources to everything attached to them.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
///
/// Safe to run repeatedly; every statement is `IF NOT EXISTS`.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            recovery_question TEXT,
            recovery_answer TEXT,
            created_at INTEGER NOT NULL
        );

        -- Document collections
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            region TEXT,
            intro TEXT,
            cover BLOB
        );

        -- Text artifacts within a document
        CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL,
            name TEXT NOT NULL UNIQUE,
            resource_type TEXT,
            original_text TEXT,
            simplified_text TEXT,
            translated_text TEXT,
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        );

        -- Descriptive metadata (1:1 with resources)
        CREATE TABLE IF NOT EXISTS resource_info (
            resource_id INTEGER PRIMARY KEY,
            author TEXT,
            dynasty TEXT,
            FOREIGN KEY (resource_id) REFERENCES resources(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            resource_id INTEGER NOT NULL,
            content TEXT NOT NULL,
            tags TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            CHECK (updated_at >= created_at),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (resource_id) REFERENCES resources(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS favorites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            resource_id INTEGER NOT NULL,
            tags TEXT,
            created_at INTEGER NOT NULL,
            UNIQUE (user_id, resource_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (resource_id) REFERENCES resources(id) ON DELETE CASCADE
        );

        -- Reading progress, one row per (user, resource)
        CREATE TABLE IF NOT EXISTS access_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            resource_id INTEGER NOT NULL,
            progress INTEGER NOT NULL CHECK (progress BETWEEN 0 AND 100),
            accessed_at INTEGER NOT NULL,
            UNIQUE (user_id, resource_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (resource_id) REFERENCES resources(id) ON DELETE CASCADE
        );

        -- Indexes for common query patterns
        CREATE INDEX IF NOT EXISTS idx_resources_document_id ON resources(document_id);
        CREATE INDEX IF NOT EXISTS idx_resources_type ON resources(document_id, resource_type);
        CREATE INDEX IF NOT EXISTS idx_resource_info_author ON resource_info(author);
        CREATE INDEX IF NOT EXISTS idx_notes_resource_id ON notes(resource_id);
        CREATE INDEX IF NOT EXISTS idx_notes_user_id ON notes(user_id);
        CREATE INDEX IF NOT EXISTS idx_favorites_resource_id ON favorites(resource_id);
        CREATE INDEX IF NOT EXISTS idx_access_records_user_id ON access_records(user_id, accessed_at);

        -- Per-document aggregates (read-only)
        CREATE VIEW IF NOT EXISTS v_document_stats AS
        SELECT
            d.id AS document_id,
            d.name AS document_name,
            d.region AS document_region,
            (SELECT COUNT(*) FROM resources r
                WHERE r.document_id = d.id) AS resource_count,
            (SELECT COUNT(*) FROM resources r
                WHERE r.document_id = d.id
                  AND (LOWER(r.resource_type) = 'image' OR r.resource_type = '图片')) AS image_count,
            (SELECT COUNT(*) FROM favorites f
                JOIN resources r ON f.resource_id = r.id
                WHERE r.document_id = d.id) AS collection_count,
            (SELECT COUNT(*) FROM notes n
                JOIN resources r ON n.resource_id = r.id
                WHERE r.document_id = d.id) AS annotation_count
        FROM documents d;

        -- Full-text search over the three text columns. The trigram
        -- tokenizer gives substring matching for CJK text.
        CREATE VIRTUAL TABLE IF NOT EXISTS resources_fts USING fts5(
            original_text,
            simplified_text,
            translated_text,
            content='resources',
            content_rowid='id',
            tokenize='trigram'
        );

        -- Triggers to keep FTS in sync with resources
        CREATE TRIGGER IF NOT EXISTS resources_ai AFTER INSERT ON resources BEGIN
            INSERT INTO resources_fts(rowid, original_text, simplified_text, translated_text)
            VALUES (NEW.id, NEW.original_text, NEW.simplified_text, NEW.translated_text);
        END;

        CREATE TRIGGER IF NOT EXISTS resources_ad AFTER DELETE ON resources BEGIN
            INSERT INTO resources_fts(resources_fts, rowid, original_text, simplified_text, translated_text)
            VALUES ('delete', OLD.id, OLD.original_text, OLD.simplified_text, OLD.translated_text);
        END;

        CREATE TRIGGER IF NOT EXISTS resources_au AFTER UPDATE ON resources BEGIN
            INSERT INTO resources_fts(resources_fts, rowid, original_text, simplified_text, translated_text)
            VALUES ('delete', OLD.id, OLD.original_text, OLD.simplified_text, OLD.translated_text);
            INSERT INTO resources_fts(rowid, original_text, simplified_text, translated_text)
            VALUES (NEW.id, NEW.original_text, NEW.simplified_text, NEW.translated_text);
        END;
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_of(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ? ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables = names_of(&conn, "table");
        for expected in [
            "users",
            "documents",
            "resources",
            "resource_info",
            "notes",
            "favorites",
            "access_records",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version() {
        let conn = Connection::open_in_memory().unwrap();

        assert!(needs_init(&conn));

        init_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
        assert!(!needs_init(&conn));
    }

    #[test]
    fn test_stats_view_and_fts_exist() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        assert!(names_of(&conn, "view").contains(&"v_document_stats".to_string()));
        assert!(names_of(&conn, "table")
            .iter()
            .any(|t| t == "resources_fts"));
    }

    #[test]
    fn test_progress_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO access_records (user_id, resource_id, progress, accessed_at) VALUES (1, 1, 101, 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_indexes_exist() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let indexes = names_of(&conn, "index");
        assert!(indexes.contains(&"idx_resources_document_id".to_string()));
        assert!(indexes.contains(&"idx_notes_user_id".to_string()));
        assert!(indexes.contains(&"idx_resource_info_author".to_string()));
    }
}
