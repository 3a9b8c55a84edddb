//! File-per-page cache
//!
//! Layout under the cache root:
//!
//! ```text
//! index/<category dir>/<page>.html
//! product/<category dir>/i<page>p<position>.html
//! ```
//!
//! The category directory is a sanitized, human-readable form of the category
//! followed by a digest of the exact category string, e.g.
//! `corals_sps-1f0c5d2e9a7b4c38`. Sanitizing alone is lossy (`corals//sps`
//! and `corals/sps` read the same); the digest keeps distinct categories apart.

use crate::storage::traits::{CacheKey, PageCache, StorageResult};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Hex digits of the category digest kept in the directory name
const DIGEST_LEN: usize = 16;

/// Directory name for a category, distinct for distinct category strings
fn category_dir(category: &str) -> String {
    let readable = category
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(sanitize_filename::sanitize)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let digest = hex::encode(Sha256::digest(category.as_bytes()));
    format!("{}-{}", readable, &digest[..DIGEST_LEN])
}

/// Page cache backed by one file per page
pub struct FsPageCache {
    root: PathBuf,
}

impl FsPageCache {
    pub fn new(root: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// File that holds the body for `key`
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        let (kind, category, file_name) = match key {
            CacheKey::Index {
                category,
                index_page,
            } => ("index", category, format!("{}.html", index_page)),
            CacheKey::Product {
                category,
                index_page,
                product_position,
            } => (
                "product",
                category,
                format!("i{}p{}.html", index_page, product_position),
            ),
        };

        let mut path = self.root.join(kind);
        path.push(category_dir(category));
        path.push(file_name);
        path
    }
}

impl PageCache for FsPageCache {
    fn get(&self, key: &CacheKey) -> StorageResult<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &CacheKey, body: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        if path.exists() {
            return Ok(());
        }

        let dir = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir)?;

        // Never expose a partial body under the final name
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)?;

        tracing::trace!("Cached {} ({} bytes)", path.display(), body.len());
        Ok(())
    }
}
