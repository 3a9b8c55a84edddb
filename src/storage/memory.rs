//! In-memory storage
//!
//! Clones share the same underlying state, which lets tests hand one copy to
//! an engine, drop the engine to simulate a process kill, and build a new
//! engine on the surviving state.

use crate::extract::ProductRecord;
use crate::state::Cursor;
use crate::storage::traits::{
    CacheKey, CursorStore, PageCache, PersistedCursor, ResultStore, StorageResult,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryInner {
    cursor: Option<PersistedCursor>,
    cursor_history: Vec<Cursor>,
    pages: HashMap<CacheKey, String>,
    results: BTreeMap<String, ProductRecord>,
}

/// Cursor store, page cache and result store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every cursor value ever saved, oldest first
    pub fn cursor_history(&self) -> Vec<Cursor> {
        self.lock().cursor_history.clone()
    }

    pub fn cached_pages(&self) -> usize {
        self.lock().pages.len()
    }
}

impl CursorStore for MemoryStore {
    fn load(&self) -> StorageResult<Option<PersistedCursor>> {
        Ok(self.lock().cursor.clone())
    }

    fn save(&mut self, cursor: &Cursor, category_fingerprint: &str) -> StorageResult<()> {
        let mut inner = self.lock();
        inner.cursor = Some(PersistedCursor {
            cursor: *cursor,
            category_fingerprint: category_fingerprint.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        });
        inner.cursor_history.push(*cursor);
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.lock().cursor = None;
        Ok(())
    }
}

impl PageCache for MemoryStore {
    fn get(&self, key: &CacheKey) -> StorageResult<Option<String>> {
        Ok(self.lock().pages.get(key).cloned())
    }

    fn put(&mut self, key: &CacheKey, body: &str) -> StorageResult<()> {
        self.lock()
            .pages
            .entry(key.clone())
            .or_insert_with(|| body.to_string());
        Ok(())
    }
}

impl ResultStore for MemoryStore {
    fn contains(&self, url: &str) -> bool {
        self.lock().results.contains_key(url)
    }

    fn append(&mut self, url: &str, record: ProductRecord) -> StorageResult<bool> {
        let mut inner = self.lock();
        if inner.results.contains_key(url) {
            return Ok(false);
        }
        inner.results.insert(url.to_string(), record);
        Ok(true)
    }

    fn get(&self, url: &str) -> Option<ProductRecord> {
        self.lock().results.get(url).cloned()
    }

    fn len(&self) -> usize {
        self.lock().results.len()
    }

    fn records(&self) -> Vec<(String, ProductRecord)> {
        self.lock()
            .results
            .iter()
            .map(|(url, record)| (url.clone(), record.clone()))
            .collect()
    }
}
