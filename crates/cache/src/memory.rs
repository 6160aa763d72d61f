//! Process-lifetime lookup maps.
//!
//! Unbounded and never evicted; the folder universe a bot serves is small.
//! Each operation takes the lock once and releases it before returning, so
//! no lock is ever held across an await point.

use drivebot_drive::RemoteEntry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A string-keyed map safe to share between concurrent handlers.
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> MemoryCache<V> {
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    /// Inserts or overwrites; last write wins.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Folder id to display name.
pub type NameCache = MemoryCache<String>;
/// Folder id to the id of its parent folder.
pub type ParentLinkCache = MemoryCache<String>;
/// Search token to the search it was derived from.
pub type SearchCache = MemoryCache<SearchResults>;

/// A remembered search: the query as the user typed it and its non-empty
/// results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub query: String,
    pub entries: Vec<RemoteEntry>,
}
