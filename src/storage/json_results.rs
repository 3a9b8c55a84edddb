//! JSON file result store
//!
//! The whole map is rewritten on every append. The new content goes to a
//! temporary file in the same directory, is synced, then renamed over the old
//! file, so the file on disk is always a complete snapshot.

use crate::extract::ProductRecord;
use crate::storage::traits::{ResultStore, StorageResult};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Result store persisted as a single JSON object keyed by product URL
pub struct JsonResultStore {
    path: PathBuf,
    records: BTreeMap<String, ProductRecord>,
}

impl JsonResultStore {
    /// Opens the store, loading any records written by earlier runs
    pub fn open(path: &Path) -> StorageResult<Self> {
        let records = match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Loaded {} records from {}", records.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    fn flush(&self) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.records)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

impl ResultStore for JsonResultStore {
    fn contains(&self, url: &str) -> bool {
        self.records.contains_key(url)
    }

    fn append(&mut self, url: &str, record: ProductRecord) -> StorageResult<bool> {
        if self.records.contains_key(url) {
            return Ok(false);
        }

        self.records.insert(url.to_string(), record);
        if let Err(e) = self.flush() {
            // memory must not claim a record the file does not have
            self.records.remove(url);
            return Err(e);
        }

        Ok(true)
    }

    fn get(&self, url: &str) -> Option<ProductRecord> {
        self.records.get(url).cloned()
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn records(&self) -> Vec<(String, ProductRecord)> {
        self.records
            .iter()
            .map(|(url, record)| (url.clone(), record.clone()))
            .collect()
    }
}
