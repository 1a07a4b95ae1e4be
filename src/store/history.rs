use super::{read_bytes, write_document};
use crate::core::error::{RateError, Result};
use crate::core::rates::HistoryEntry;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const HISTORY_FILE: &str = "exchange_rates.json";

/// Append-only log of fetched rate observations.
#[derive(Debug, Clone)]
pub struct RateHistoryLog {
    path: PathBuf,
}

impl RateHistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw elements of the on-disk list. A document that is not a JSON list
    /// is treated as an empty history.
    fn load_raw(&self) -> Result<Vec<Value>> {
        let Some(bytes) = read_bytes(&self.path)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(_) => {
                warn!(
                    path = %self.path.display(),
                    "Rate history is not a list, starting a new one"
                );
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Malformed rate history, starting a new one"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Loads all entries in append order. Elements that do not parse as an
    /// entry are skipped, but stay on disk.
    pub fn load(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self
            .load_raw()?
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(index, error = %e, "Skipping unreadable history entry");
                    None
                }
            })
            .collect();
        Ok(entries)
    }

    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        self.append_all(std::iter::once(entry))
    }

    /// Appends entries in the given order with a single rewrite. Existing
    /// elements are written back unchanged.
    pub fn append_all<I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = HistoryEntry>,
    {
        let mut history = self.load_raw()?;
        let before = history.len();
        for entry in entries {
            let value =
                serde_json::to_value(&entry).map_err(|source| RateError::Serialization {
                    path: self.path.display().to_string(),
                    source,
                })?;
            history.push(value);
        }
        write_document(&self.path, &history)?;
        debug!(
            appended = history.len() - before,
            total = history.len(),
            "History updated"
        );
        Ok(())
    }
}
