//! Whole-document JSON persistence.
//!
//! A document is always rewritten in full: serialized into a temporary
//! sibling file, then renamed over the original. Readers therefore see
//! either the previous document or the new one, never a torn write.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub(crate) struct JsonDocument {
    path: PathBuf,
    /// Serializes writers so whole-document writes never interleave.
    writer: Mutex<()>,
}

impl JsonDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. A missing or unparsable file yields `None`, which
    /// callers treat as "start empty".
    pub async fn load<T: DeserializeOwned>(&self) -> Option<T> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No persisted document; starting empty");
                return None;
            },
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable document; starting empty");
                return None;
            },
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unparsable document; starting empty");
                None
            },
        }
    }

    /// Takes the writer lock. Snapshot the in-memory state only after this
    /// returns, so the last writer always persists the latest state.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Replaces the document on disk. The caller must hold the writer lock.
    pub async fn store<T: Serialize + ?Sized>(&self, _guard: &MutexGuard<'_, ()>, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).or_raise(|| ErrorKind::InvalidData)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Persist(self.path.clone()))?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await.or_raise(|| ErrorKind::Persist(temp.clone()))?;
        tokio::fs::rename(&temp, &self.path).await.or_raise(|| ErrorKind::Persist(self.path.clone()))?;
        tracing::trace!(path = %self.path.display(), bytes = bytes.len(), "Persisted document");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let doc = JsonDocument::new(dir.path().join("absent.json"));
        assert!(doc.load::<BTreeMap<String, String>>().await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let doc = JsonDocument::new(path);
        assert!(doc.load::<BTreeMap<String, String>>().await.is_none());
    }

    #[tokio::test]
    async fn test_store_replaces_atomically_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        let doc = JsonDocument::new(&path);
        let value = BTreeMap::from([("a".to_string(), "1".to_string())]);
        {
            let guard = doc.lock().await;
            doc.store(&guard, &value).await.unwrap();
        }
        assert_eq!(doc.load::<BTreeMap<String, String>>().await.unwrap(), value);
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }
}
