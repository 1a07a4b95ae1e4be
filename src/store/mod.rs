//! JSON documents persisted under the data directory.
//!
//! Every write replaces the whole document: it is serialized into a temporary
//! file next to the target and then renamed over it, so readers observe either
//! the previous or the new document, never a truncated one. Concurrent writers
//! from different processes are not coordinated; the last rename wins.

pub mod history;
pub mod portfolio;
pub mod rates;
pub mod session;

use crate::core::error::{RateError, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

fn storage_error(path: &Path, source: std::io::Error) -> RateError {
    RateError::Storage {
        path: path.display().to_string(),
        source,
    }
}

/// Reads the raw bytes of a document, `None` when it does not exist yet.
pub fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(storage_error(path, e)),
    }
}

/// Reads and parses a document, `None` when it does not exist yet.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(bytes) = read_bytes(path)? else {
        debug!(path = %path.display(), "Document not found");
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| RateError::Serialization {
            path: path.display().to_string(),
            source,
        })
}

/// Atomically replaces the document at `path` with `value`.
pub fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| storage_error(dir, e))?;

    let json = serde_json::to_vec_pretty(value).map_err(|source| RateError::Serialization {
        path: path.display().to_string(),
        source,
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| storage_error(dir, e))?;
    tmp.write_all(&json).map_err(|e| storage_error(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| storage_error(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| storage_error(path, e.error))?;

    debug!(path = %path.display(), bytes = json.len(), "Document written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_document_reads_as_none() {
        let dir = tempdir().unwrap();
        let doc: Option<BTreeMap<String, f64>> =
            read_document(&dir.path().join("missing.json")).unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn test_write_replaces_document_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        let mut first = BTreeMap::new();
        first.insert("a".to_string(), 1.0);
        write_document(&path, &first).unwrap();

        let mut second = BTreeMap::new();
        second.insert("b".to_string(), 2.0);
        write_document(&path, &second).unwrap();

        let read: BTreeMap<String, f64> = read_document(&path).unwrap().unwrap();
        assert_eq!(read, second);

        let files: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("doc.json")]);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "{not json").unwrap();
        let result: Result<Option<BTreeMap<String, f64>>> = read_document(&path);
        assert!(matches!(result, Err(RateError::Serialization { .. })));
    }
}
