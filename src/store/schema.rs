//! Database schema definitions
//!
//! All SQL schema definitions for the Storyscope database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per source site
CREATE TABLE IF NOT EXISTS platforms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    platform_type TEXT NOT NULL UNIQUE,
    base_url TEXT NOT NULL,
    rate_limit_rps REAL NOT NULL DEFAULT 1.0
);

-- Authors, unique per (platform, platform-native id)
CREATE TABLE IF NOT EXISTS authors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    platform_id INTEGER NOT NULL REFERENCES platforms(id),
    platform_author_id TEXT NOT NULL,
    username TEXT NOT NULL,
    display_name TEXT,
    profile_url TEXT,
    bio TEXT,
    patreon_url TEXT,
    kofi_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(platform_id, platform_author_id)
);

CREATE INDEX IF NOT EXISTS idx_authors_username ON authors(username);

-- Core work entity with a denormalized latest engagement snapshot
CREATE TABLE IF NOT EXISTS works (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    platform_id INTEGER NOT NULL REFERENCES platforms(id),
    platform_work_id TEXT NOT NULL,
    author_id INTEGER REFERENCES authors(id),
    title TEXT NOT NULL,
    summary TEXT,
    url TEXT NOT NULL,
    rating TEXT NOT NULL DEFAULT 'not_rated',
    language TEXT NOT NULL DEFAULT 'English',
    status TEXT NOT NULL DEFAULT 'unknown',
    chapter_count INTEGER NOT NULL DEFAULT 0,
    word_count INTEGER NOT NULL DEFAULT 0,
    published_at TEXT,
    updated_at TEXT,
    scraped_at TEXT NOT NULL,
    latest_views INTEGER NOT NULL DEFAULT 0,
    latest_likes INTEGER NOT NULL DEFAULT 0,
    latest_comments INTEGER NOT NULL DEFAULT 0,
    latest_bookmarks INTEGER NOT NULL DEFAULT 0,
    UNIQUE(platform_id, platform_work_id)
);

CREATE INDEX IF NOT EXISTS idx_works_title ON works(title);
CREATE INDEX IF NOT EXISTS idx_works_views ON works(latest_views);
CREATE INDEX IF NOT EXISTS idx_works_word_count ON works(word_count);

-- Canonical tags, keyed by normalized name plus category so the same
-- text can exist as distinct entities per category
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    category TEXT,
    UNIQUE(normalized_name, category)
);

CREATE INDEX IF NOT EXISTS idx_tags_normalized ON tags(normalized_name);

-- Canonical fandoms
CREATE TABLE IF NOT EXISTS fandoms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    normalized_name TEXT NOT NULL UNIQUE,
    category TEXT,
    estimated_work_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_fandoms_normalized ON fandoms(normalized_name);

-- Canonical character relationships/pairings
CREATE TABLE IF NOT EXISTS relationships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    normalized_name TEXT NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_relationships_normalized ON relationships(normalized_name);

-- Work association rows: append-only under ingestion
CREATE TABLE IF NOT EXISTS work_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    work_id INTEGER NOT NULL REFERENCES works(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id),
    is_primary INTEGER NOT NULL DEFAULT 0,
    UNIQUE(work_id, tag_id)
);

CREATE TABLE IF NOT EXISTS work_fandoms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    work_id INTEGER NOT NULL REFERENCES works(id) ON DELETE CASCADE,
    fandom_id INTEGER NOT NULL REFERENCES fandoms(id),
    is_primary INTEGER NOT NULL DEFAULT 0,
    UNIQUE(work_id, fandom_id)
);

CREATE TABLE IF NOT EXISTS work_relationships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    work_id INTEGER NOT NULL REFERENCES works(id) ON DELETE CASCADE,
    relationship_id INTEGER NOT NULL REFERENCES relationships(id),
    is_primary INTEGER NOT NULL DEFAULT 0,
    UNIQUE(work_id, relationship_id)
);

CREATE INDEX IF NOT EXISTS idx_work_tags_work ON work_tags(work_id);
CREATE INDEX IF NOT EXISTS idx_work_fandoms_work ON work_fandoms(work_id);
CREATE INDEX IF NOT EXISTS idx_work_fandoms_fandom ON work_fandoms(fandom_id);
CREATE INDEX IF NOT EXISTS idx_work_relationships_work ON work_relationships(work_id);

-- Time-series engagement measurements, one row per (work, calendar day)
CREATE TABLE IF NOT EXISTS engagement_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    work_id INTEGER NOT NULL REFERENCES works(id) ON DELETE CASCADE,
    snapshot_date TEXT NOT NULL,
    views INTEGER NOT NULL DEFAULT 0,
    likes INTEGER NOT NULL DEFAULT 0,
    comments INTEGER NOT NULL DEFAULT 0,
    bookmarks INTEGER NOT NULL DEFAULT 0,
    chapter_count INTEGER NOT NULL DEFAULT 0,
    word_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE(work_id, snapshot_date)
);

CREATE INDEX IF NOT EXISTS idx_snapshots_date ON engagement_snapshots(snapshot_date);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = vec![
            "platforms",
            "authors",
            "works",
            "tags",
            "fandoms",
            "relationships",
            "work_tags",
            "work_fandoms",
            "work_relationships",
            "engagement_snapshots",
        ];

        for table in tables {
            let count: Result<i64, _> = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='{}'",
                    table
                ),
                [],
                |row| row.get(0),
            );
            assert!(count.is_ok());
            assert_eq!(count.unwrap(), 1, "Table {} should exist", table);
        }
    }
}
