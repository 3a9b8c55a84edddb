//! Storage traits and error types
//!
//! The engine talks to three independent stores. Each is a trait so the same
//! crawl logic runs against SQLite, plain files, or memory.

use crate::extract::ProductRecord;
use crate::state::Cursor;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl From<tempfile::PersistError> for StorageError {
    fn from(err: tempfile::PersistError) -> Self {
        StorageError::Io(err.error)
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A cursor as read back from stable storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCursor {
    pub cursor: Cursor,
    /// Fingerprint of the category list the cursor was saved against
    pub category_fingerprint: String,
    pub updated_at: String,
}

/// Durable home of the crawl cursor
pub trait CursorStore: Send {
    /// Loads the last saved cursor, if any
    fn load(&self) -> StorageResult<Option<PersistedCursor>>;

    /// Replaces the saved cursor
    ///
    /// Must not return before the new value is durable.
    fn save(&mut self, cursor: &Cursor, category_fingerprint: &str) -> StorageResult<()>;

    /// Forgets the saved cursor
    fn clear(&mut self) -> StorageResult<()>;
}

/// Position-derived key of a cached page body
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Index {
        category: String,
        index_page: u32,
    },
    Product {
        category: String,
        index_page: u32,
        product_position: u32,
    },
}

impl CacheKey {
    pub fn index(category: &str, index_page: u32) -> Self {
        CacheKey::Index {
            category: category.to_string(),
            index_page,
        }
    }

    pub fn product(category: &str, index_page: u32, product_position: u32) -> Self {
        CacheKey::Product {
            category: category.to_string(),
            index_page,
            product_position,
        }
    }

    /// Flat string form used by key-value backends
    pub fn as_key_string(&self) -> String {
        match self {
            CacheKey::Index {
                category,
                index_page,
            } => format!("index/{}/{}", category, index_page),
            CacheKey::Product {
                category,
                index_page,
                product_position,
            } => format!("product/{}/i{}p{}", category, index_page, product_position),
        }
    }
}

/// Write-once store of raw page bodies
pub trait PageCache: Send {
    fn get(&self, key: &CacheKey) -> StorageResult<Option<String>>;

    /// Stores a body; an existing entry for the key is left untouched
    fn put(&mut self, key: &CacheKey, body: &str) -> StorageResult<()>;
}

/// Append-only mapping from product URL to its extracted record
///
/// Membership doubles as the "already done" ledger of the crawl.
pub trait ResultStore: Send {
    fn contains(&self, url: &str) -> bool;

    /// Inserts a record and flushes the whole store before returning
    ///
    /// Returns `Ok(false)` without touching storage when the URL is already
    /// present.
    fn append(&mut self, url: &str, record: ProductRecord) -> StorageResult<bool>;

    fn get(&self, url: &str) -> Option<ProductRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, ordered by URL
    fn records(&self) -> Vec<(String, ProductRecord)>;
}
