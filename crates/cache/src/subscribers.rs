//! Persisted set of everyone who has talked to the bot.

use crate::document::JsonDocument;
use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

/// Older documents stored some ids as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredId {
    Number(i64),
    Text(String),
}
impl StoredId {
    fn into_id(self) -> Option<i64> {
        match self {
            Self::Number(id) => Some(id),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug)]
pub struct SubscriberSet {
    ids: RwLock<BTreeSet<i64>>,
    document: JsonDocument,
}

impl SubscriberSet {
    /// Loads the set from `path`. A missing or corrupt file starts empty;
    /// individual entries that are not integers are skipped.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let document = JsonDocument::new(path);
        let stored: Vec<StoredId> = document.load().await.unwrap_or_default();
        let ids: BTreeSet<i64> = stored.into_iter().filter_map(StoredId::into_id).collect();
        tracing::info!(path = %document.path().display(), subscribers = ids.len(), "Loaded subscribers");
        Self {
            ids: RwLock::new(ids),
            document,
        }
    }

    /// Adds `id`, persisting the set if it was not already present. Returns
    /// whether the id was new.
    pub async fn register(&self, id: i64) -> Result<bool> {
        if self.contains(id) {
            return Ok(false);
        }
        let guard = self.document.lock().await;
        let snapshot = {
            let mut ids = self.ids.write().unwrap_or_else(PoisonError::into_inner);
            if !ids.insert(id) {
                // Registered by a concurrent caller while waiting for the lock.
                return Ok(false);
            }
            ids.iter().copied().collect::<Vec<_>>()
        };
        self.document.store(&guard, &snapshot).await?;
        tracing::debug!(id, "Registered subscriber");
        Ok(true)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).contains(&id)
    }

    /// All ids, ascending.
    pub fn snapshot(&self) -> Vec<i64> {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_only_persists_new_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let set = SubscriberSet::load(&path).await;
        assert!(set.register(42).await.unwrap());
        assert!(!set.register(42).await.unwrap());
        assert!(set.register(7).await.unwrap());

        let reloaded = SubscriberSet::load(&path).await;
        assert_eq!(reloaded.snapshot(), vec![7, 42]);
    }

    #[tokio::test]
    async fn test_accepts_mixed_integer_and_string_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, br#"[123, "456", "not-a-number", 123]"#).unwrap();
        let set = SubscriberSet::load(&path).await;
        assert_eq!(set.snapshot(), vec![123, 456]);
    }

    #[tokio::test]
    async fn test_object_instead_of_array_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, br#"{"123": true}"#).unwrap();
        assert!(SubscriberSet::load(&path).await.is_empty());
    }
}
