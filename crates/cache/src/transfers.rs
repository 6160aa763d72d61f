//! Persisted transfer results.
//!
//! Maps a source file id to the handle the sink assigned when the file was
//! uploaded. A present entry means the sink most likely still holds that
//! object. Entries are only ever inserted or overwritten after a successful
//! upload; a failed redelivery leaves them in place.

use crate::document::JsonDocument;
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::instrument;

#[derive(Debug)]
pub struct TransferCache {
    entries: RwLock<BTreeMap<String, String>>,
    document: JsonDocument,
}

impl TransferCache {
    /// Loads the cache from `path`. A missing or corrupt file starts empty.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let document = JsonDocument::new(path);
        let entries: BTreeMap<String, String> = document.load().await.unwrap_or_default();
        tracing::info!(path = %document.path().display(), entries = entries.len(), "Loaded transfer cache");
        Self {
            entries: RwLock::new(entries),
            document,
        }
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub fn get(&self, source_id: &str) -> Option<String> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(source_id).cloned()
    }

    /// Records (or overwrites) the sink handle for `source_id` and persists
    /// the whole document before returning.
    ///
    /// The in-memory entry is updated even when persisting fails, so the
    /// current process can still reuse the handle.
    #[instrument(skip(self, handle))]
    pub async fn insert(&self, source_id: &str, handle: &str) -> Result<()> {
        let guard = self.document.lock().await;
        let snapshot = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.insert(source_id.to_string(), handle.to_string());
            entries.clone()
        };
        self.document.store(&guard, &snapshot).await
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
