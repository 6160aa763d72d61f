//! Name search across the whole tree.

use drivebot_cache::{SearchResults, SessionStore};
use drivebot_drive::{ProviderHandle, RemoteEntry};
use drivebot_render::search_token;
use std::sync::Arc;
use tracing::instrument;

/// Most results a single search returns.
pub const SEARCH_LIMIT: usize = 50;

#[derive(Clone)]
pub struct SearchIndex {
    provider: ProviderHandle,
    store: Arc<SessionStore>,
}

impl SearchIndex {
    pub fn new(provider: ProviderHandle, store: Arc<SessionStore>) -> Self {
        Self { provider, store }
    }

    /// Entries whose name contains `query`, ordered by name. Provider errors
    /// are logged and produce no results. Non-empty results are kept under
    /// the query's [`search_token`] so later pages can be shown without
    /// searching again.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn search(&self, query: &str) -> Vec<RemoteEntry> {
        let results = match self.provider.search(query, SEARCH_LIMIT).await {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(error = %err, "Search failed");
                return Vec::new();
            },
        };
        if !results.is_empty() {
            let remembered = SearchResults {
                query: query.to_string(),
                entries: results.clone(),
            };
            self.store.searches.insert(search_token(query), remembered);
        }
        tracing::debug!(results = results.len(), "Searched");
        results
    }

    /// An earlier non-empty search, by the token its page buttons carry.
    pub fn cached(&self, token: &str) -> Option<SearchResults> {
        self.store.searches.get(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivebot_drive::backend::MockProvider;

    async fn index(provider: Arc<MockProvider>, dir: &tempfile::TempDir) -> SearchIndex {
        let store = SessionStore::open("root", dir.path().join("file_ids.json"), dir.path().join("users.json")).await;
        SearchIndex::new(provider, Arc::new(store))
    }

    #[tokio::test]
    async fn test_caches_non_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            MockProvider::default()
                .with_file("b", "Chapter 2.pdf", "root", b"b")
                .with_file("a", "chapter 1.pdf", "root", b"a")
                .with_file("c", "Notes.pdf", "root", b"c"),
        );
        let index = index(provider.clone(), &dir).await;
        let results = index.search("chapter").await;
        assert_eq!(results.len(), 2);
        let cached = index.cached(&search_token("chapter")).unwrap();
        assert_eq!(cached.query, "chapter");
        assert_eq!(cached.entries, results);
        assert!(index.search("missing").await.is_empty());
        assert!(index.cached(&search_token("missing")).is_none());
        assert_eq!(provider.search_calls(), 2);
    }

    #[tokio::test]
    async fn test_results_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let provider = (0..60).fold(MockProvider::default(), |provider, i| {
            provider.with_file(&format!("f{i}"), &format!("Sheet {i:02}.pdf"), "root", b"x")
        });
        let index = index(Arc::new(provider), &dir).await;
        assert_eq!(index.search("sheet").await.len(), SEARCH_LIMIT);
    }

    #[tokio::test]
    async fn test_provider_error_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::default().with_file("a", "quote's.pdf", "root", b"a"));
        provider.set_fail_search(true);
        let index = index(provider, &dir).await;
        assert!(index.search("quote's").await.is_empty());
        assert!(index.cached(&search_token("quote's")).is_none());
    }

    #[tokio::test]
    async fn test_long_queries_are_cached_by_token() {
        let dir = tempfile::tempdir().unwrap();
        let query = "الفصل الأول الميكانيكا الكلاسيكية";
        let provider = Arc::new(MockProvider::default().with_file("a", &format!("{query}.pdf"), "root", b"a"));
        let index = index(provider, &dir).await;
        assert_eq!(index.search(query).await.len(), 1);
        let token = search_token(query);
        assert_eq!(token.len(), 16);
        assert_eq!(index.cached(&token).map(|cached| cached.query).as_deref(), Some(query));
        assert!(index.cached(query).is_none());
    }
}
