//! Storage module for persisting crawl progress
//!
//! This module handles everything that must survive a restart:
//! - The crawl cursor (SQLite)
//! - Raw page bodies (filesystem or SQLite)
//! - Extracted product records (JSON file)
//!
//! An in-memory backend implementing all three traits is provided for tests.

mod fs_cache;
mod json_results;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use fs_cache::FsPageCache;
pub use json_results::JsonResultStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStorage;
pub use traits::{
    CacheKey, CursorStore, PageCache, PersistedCursor, ResultStore, StorageError, StorageResult,
};

use crate::config::{CacheBackend, OutputConfig};
use crate::CrawlError;
use std::future::Future;
use std::path::Path;

/// The three stores a crawl engine writes to
pub struct Stores {
    pub cursor: Box<dyn CursorStore>,
    pub cache: Box<dyn PageCache>,
    pub results: Box<dyn ResultStore>,
}

impl Stores {
    /// Uses one in-memory store for all three roles
    pub fn in_memory(store: &MemoryStore) -> Self {
        Self {
            cursor: Box::new(store.clone()),
            cache: Box::new(store.clone()),
            results: Box::new(store.clone()),
        }
    }
}

/// Opens the durable stores named by the output configuration
///
/// # Returns
///
/// * `Ok(Stores)` - All stores opened, previous state loaded
/// * `Err(StorageError)` - A store could not be opened or read
pub fn open_stores(output: &OutputConfig) -> StorageResult<Stores> {
    let state_path = Path::new(&output.state_path);

    let cursor = Box::new(SqliteStorage::new(state_path)?);

    let cache: Box<dyn PageCache> = match output.cache_backend {
        CacheBackend::Filesystem => Box::new(FsPageCache::new(Path::new(&output.cache_dir))?),
        CacheBackend::Sqlite => Box::new(SqliteStorage::new(state_path)?),
    };

    let results = Box::new(JsonResultStore::open(Path::new(&output.result_path))?);

    Ok(Stores {
        cursor,
        cache,
        results,
    })
}

/// Returns the cached body for `key`, fetching and caching it on a miss
///
/// `fetch` is only invoked when nothing is cached. A failed fetch caches
/// nothing and its error is returned unchanged.
pub async fn get_or_fetch<F, Fut>(
    cache: &mut dyn PageCache,
    key: &CacheKey,
    fetch: F,
) -> Result<String, CrawlError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, CrawlError>>,
{
    let (body, ()) = get_or_fetch_checked(cache, key, fetch, |_| Ok(())).await?;
    Ok(body)
}

/// Like [`get_or_fetch`], but runs `check` on the body before using it
///
/// `check` sees cached and fetched bodies alike. A fetched body that fails
/// the check is not cached, so a later attempt fetches it again.
pub async fn get_or_fetch_checked<F, Fut, C, T>(
    cache: &mut dyn PageCache,
    key: &CacheKey,
    fetch: F,
    check: C,
) -> Result<(String, T), CrawlError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, CrawlError>>,
    C: FnOnce(&str) -> Result<T, CrawlError>,
{
    if let Some(body) = cache.get(key)? {
        tracing::debug!("Cache hit: {}", key.as_key_string());
        let checked = check(&body)?;
        return Ok((body, checked));
    }

    tracing::debug!("Cache miss: {}", key.as_key_string());
    let body = fetch().await?;
    let checked = check(&body)?;
    cache.put(key, &body)?;
    Ok((body, checked))
}
