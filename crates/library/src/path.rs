//! Breadcrumbs from the root folder down to a given folder.

use drivebot_cache::{ROOT_NAME, SessionStore};
use drivebot_drive::ProviderHandle;
use std::sync::Arc;
use tracing::instrument;

/// Maximum number of folders walked upwards before giving up.
pub const MAX_PATH_DEPTH: usize = 10;
pub const PATH_SEPARATOR: &str = " » ";
pub const UNKNOWN_SEGMENT: &str = "Unknown";

#[derive(Clone)]
pub struct PathResolver {
    provider: ProviderHandle,
    store: Arc<SessionStore>,
}

impl PathResolver {
    pub fn new(provider: ProviderHandle, store: Arc<SessionStore>) -> Self {
        Self { provider, store }
    }

    /// Walks parent links up from `folder_id`, fetching and caching whatever
    /// is not yet known. Never fails: unresolvable folders show as
    /// [`UNKNOWN_SEGMENT`] and the walk stops where no parent is known.
    #[instrument(skip(self))]
    pub async fn resolve(&self, folder_id: &str) -> String {
        if self.store.is_root(folder_id) {
            return ROOT_NAME.to_string();
        }
        let mut segments = Vec::new();
        let mut current = folder_id.to_string();
        for _ in 0..MAX_PATH_DEPTH {
            segments.push(self.name_of(&current).await);
            if self.store.is_root(&current) {
                break;
            }
            match self.store.parents.get(&current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        segments.reverse();
        segments.join(PATH_SEPARATOR)
    }

    async fn name_of(&self, folder_id: &str) -> String {
        if let Some(name) = self.store.names.get(folder_id) {
            return name;
        }
        match self.provider.metadata(folder_id).await {
            Ok(metadata) => {
                self.store.names.insert(folder_id, metadata.name.clone());
                if let Some(parent) = metadata.parents.first() {
                    self.store.parents.insert(folder_id, parent.clone());
                }
                metadata.name
            },
            Err(err) => {
                tracing::warn!(folder_id, error = %err, "Failed to resolve folder name");
                UNKNOWN_SEGMENT.to_string()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivebot_drive::backend::MockProvider;

    async fn store(dir: &tempfile::TempDir) -> Arc<SessionStore> {
        Arc::new(SessionStore::open("root", dir.path().join("file_ids.json"), dir.path().join("users.json")).await)
    }

    #[tokio::test]
    async fn test_root_resolves_without_provider_calls() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::default());
        let resolver = PathResolver::new(provider.clone(), store(&dir).await);
        assert_eq!(resolver.resolve("root").await, "Root");
        assert_eq!(provider.metadata_calls(), 0);
    }

    #[tokio::test]
    async fn test_fetches_and_caches_missing_links() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            MockProvider::default()
                .with_folder("unit", "Unit 1", "root")
                .with_folder("week", "Week 3", "unit"),
        );
        let store = store(&dir).await;
        let resolver = PathResolver::new(provider.clone(), store.clone());
        assert_eq!(resolver.resolve("week").await, "Root » Unit 1 » Week 3");
        assert_eq!(provider.metadata_calls(), 2);
        assert_eq!(store.parents.get("week").as_deref(), Some("unit"));

        assert_eq!(resolver.resolve("week").await, "Root » Unit 1 » Week 3");
        assert_eq!(provider.metadata_calls(), 2);
    }

    #[tokio::test]
    async fn test_deep_chain_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        for depth in 1..=50 {
            let id = format!("d{depth}");
            store.names.insert(id.clone(), format!("Level {depth}"));
            let parent = if depth == 1 { "root".to_string() } else { format!("d{}", depth - 1) };
            store.parents.insert(id, parent);
        }
        let provider = Arc::new(MockProvider::default());
        let path = PathResolver::new(provider.clone(), store).resolve("d50").await;
        let segments: Vec<_> = path.split(PATH_SEPARATOR).collect();
        assert_eq!(segments.len(), MAX_PATH_DEPTH);
        assert_eq!(segments.first(), Some(&"Level 41"));
        assert_eq!(segments.last(), Some(&"Level 50"));
        assert_eq!(provider.metadata_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_segment_continues_through_cached_parent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.parents.insert("lost", "root".to_string());
        let provider = Arc::new(MockProvider::default());
        let resolver = PathResolver::new(provider, store);
        assert_eq!(resolver.resolve("lost").await, "Root » Unknown");
        assert_eq!(resolver.resolve("orphan").await, "Unknown");
    }
}
