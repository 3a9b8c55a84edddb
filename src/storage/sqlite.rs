//! SQLite storage implementation
//!
//! Holds the crawl cursor and, when configured, the page cache.

use crate::state::Cursor;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    CacheKey, CursorStore, PageCache, PersistedCursor, StorageError, StorageResult,
};
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the state database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Every cursor write must be on disk before the next fetch starts
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Opens an existing state database without writing to it
    ///
    /// No pragmas or schema changes are applied; any save through this handle
    /// fails.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Number of cached page bodies
    pub fn count_cached_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM page_cache", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn to_u32(value: i64, column: &str) -> StorageResult<u32> {
    u32::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("cursor.{} = {}", column, value)))
}

impl CursorStore for SqliteStorage {
    fn load(&self) -> StorageResult<Option<PersistedCursor>> {
        let row = self
            .conn
            .query_row(
                "SELECT category_index, index_page, product_position, total_pages, completed,
                 category_fingerprint, updated_at
                 FROM cursor WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some(raw) = row else {
            return Ok(None);
        };
        let (
            category_index,
            index_page,
            product_position,
            total_pages,
            completed,
            fingerprint,
            updated_at,
        ) = raw;

        let category_index = usize::try_from(category_index).map_err(|_| {
            StorageError::Corrupt(format!("cursor.category_index = {}", category_index))
        })?;

        Ok(Some(PersistedCursor {
            cursor: Cursor {
                category_index,
                index_page: to_u32(index_page, "index_page")?,
                product_position: to_u32(product_position, "product_position")?,
                total_pages: to_u32(total_pages, "total_pages")?,
                completed,
            },
            category_fingerprint: fingerprint,
            updated_at,
        }))
    }

    fn save(&mut self, cursor: &Cursor, category_fingerprint: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO cursor (id, category_index, index_page, product_position, total_pages,
             completed, category_fingerprint, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                category_index = excluded.category_index,
                index_page = excluded.index_page,
                product_position = excluded.product_position,
                total_pages = excluded.total_pages,
                completed = excluded.completed,
                category_fingerprint = excluded.category_fingerprint,
                updated_at = excluded.updated_at",
            params![
                cursor.category_index as i64,
                cursor.index_page as i64,
                cursor.product_position as i64,
                cursor.total_pages as i64,
                cursor.completed,
                category_fingerprint,
                now
            ],
        )?;
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM cursor", [])?;
        Ok(())
    }
}

impl PageCache for SqliteStorage {
    fn get(&self, key: &CacheKey) -> StorageResult<Option<String>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM page_cache WHERE cache_key = ?1",
                params![key.as_key_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn put(&mut self, key: &CacheKey, body: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO page_cache (cache_key, body, fetched_at) VALUES (?1, ?2, ?3)",
            params![key.as_key_string(), body, now],
        )?;
        Ok(())
    }
}
