//! Folder listings.

use crate::error::{ErrorKind, Result};
use crate::sort::sort_entries;
use drivebot_cache::SessionStore;
use drivebot_drive::{ProviderHandle, RemoteEntry};
use tracing::instrument;

/// Read-only view of the provider's folders.
#[derive(Clone)]
pub struct RemoteDirectory {
    provider: ProviderHandle,
}

impl RemoteDirectory {
    pub fn new(provider: ProviderHandle) -> Self {
        Self { provider }
    }

    /// Direct children of `folder_id`: folders first, then files, each in
    /// natural name order.
    ///
    /// One provider request; folders larger than a single listing page are
    /// truncated by the provider.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteEntry>> {
        let mut entries = self.provider.list_children(folder_id).await.map_err(ErrorKind::provider)?;
        sort_entries(&mut entries);
        tracing::debug!(entries = entries.len(), "Listed folder");
        Ok(entries)
    }
}

/// Records what a listing revealed: every entry's name, and the parent of
/// every child folder.
pub fn remember(store: &SessionStore, parent_id: &str, entries: &[RemoteEntry]) {
    for entry in entries {
        store.names.insert(entry.id.clone(), entry.name.clone());
        if entry.is_folder() {
            store.parents.insert(entry.id.clone(), parent_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivebot_drive::backend::{MockProvider, UnavailableBackend};
    use std::sync::Arc;

    fn provider() -> Arc<MockProvider> {
        Arc::new(
            MockProvider::default()
                .with_folder("u10", "Unit 10", "root")
                .with_file("f2", "Sheet 2.pdf", "root", b"two")
                .with_folder("u2", "Unit 2", "root")
                .with_file("f1", "sheet 1.pdf", "root", b"one")
                .with_file("nested", "Nested.pdf", "u2", b"n"),
        )
    }

    #[tokio::test]
    async fn test_lists_folders_first_in_natural_order() {
        let provider = provider();
        let directory = RemoteDirectory::new(provider.clone());
        let entries = directory.list_children("root").await.unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u10", "f1", "f2"]);
        assert_eq!(provider.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_an_error() {
        let provider = provider();
        provider.set_fail_list(true);
        let err = RemoteDirectory::new(provider).list_children("root").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Provider));
    }

    #[tokio::test]
    async fn test_unavailable_provider() {
        let directory = RemoteDirectory::new(Arc::new(UnavailableBackend::new("no credentials")));
        let err = directory.list_children("root").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable));
    }

    #[tokio::test]
    async fn test_remember_links_child_folders() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            SessionStore::open("root", dir.path().join("file_ids.json"), dir.path().join("users.json")).await;
        let entries = RemoteDirectory::new(provider()).list_children("root").await.unwrap();
        remember(&store, "root", &entries);
        assert_eq!(store.names.get("u10").as_deref(), Some("Unit 10"));
        assert_eq!(store.names.get("f1").as_deref(), Some("sheet 1.pdf"));
        assert_eq!(store.parents.get("u2").as_deref(), Some("root"));
        assert!(!store.parents.contains("f1"));
    }
}
