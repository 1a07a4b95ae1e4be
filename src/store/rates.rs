use super::{read_document, write_document};
use crate::core::error::Result;
use crate::core::rates::{RateCacheDocument, RateEntry, RatePair};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RATES_FILE: &str = "rates.json";

/// Owns the rate cache document. Every mutation is a read-merge-write of the
/// whole document.
#[derive(Debug, Clone)]
pub struct RateCacheStore {
    path: PathBuf,
}

impl RateCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(RATES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole cache, empty when the document does not exist.
    pub fn load(&self) -> Result<RateCacheDocument> {
        Ok(read_document(&self.path)?.unwrap_or_default())
    }

    pub fn get(&self, pair: &RatePair) -> Result<Option<RateEntry>> {
        let entry = self.load()?.get(pair).cloned();
        if entry.is_some() {
            debug!(pair = %pair, "Rate cache HIT");
        } else {
            debug!(pair = %pair, "Rate cache MISS");
        }
        Ok(entry)
    }

    /// Inserts or replaces one pair and stamps the cache metadata with the
    /// entry's timestamp and source.
    pub fn upsert(&self, pair: &RatePair, entry: RateEntry) -> Result<()> {
        let mut doc = self.load()?;
        doc.mark_refreshed(entry.updated_at, &entry.source);
        doc.insert(pair, entry);
        self.replace_all(&doc)
    }

    /// Merges `entries` into the existing cache, leaving unrelated pairs
    /// untouched, and records the refresh.
    pub fn merge<I>(&self, entries: I, refreshed_at: DateTime<Utc>, source: &str) -> Result<usize>
    where
        I: IntoIterator<Item = (RatePair, RateEntry)>,
    {
        let mut doc = self.load()?;
        let mut count = 0;
        for (pair, entry) in entries {
            doc.insert(&pair, entry);
            count += 1;
        }
        doc.mark_refreshed(refreshed_at, source);
        self.replace_all(&doc)?;
        Ok(count)
    }

    /// Atomically replaces the document on disk.
    pub fn replace_all(&self, doc: &RateCacheDocument) -> Result<()> {
        write_document(&self.path, doc)
    }
}
