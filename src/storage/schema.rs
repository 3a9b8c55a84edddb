//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Reef-Crawler state database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- The single crawl cursor
CREATE TABLE IF NOT EXISTS cursor (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    category_index INTEGER NOT NULL,
    index_page INTEGER NOT NULL,
    product_position INTEGER NOT NULL,
    total_pages INTEGER NOT NULL,
    completed INTEGER NOT NULL,
    category_fingerprint TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Raw page bodies keyed by pagination position
CREATE TABLE IF NOT EXISTS page_cache (
    cache_key TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_initialize_schema_twice() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('cursor', 'page_cache')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
