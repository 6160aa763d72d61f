//! The store bundle handed to every component.

use crate::memory::{NameCache, ParentLinkCache, SearchCache};
use crate::subscribers::SubscriberSet;
use crate::transfers::TransferCache;
use std::path::PathBuf;

/// Display name of the configured root folder.
pub const ROOT_NAME: &str = "Root";

/// Every cache the bot keeps, injected into the components that need them.
#[derive(Debug)]
pub struct SessionStore {
    root_id: String,
    pub names: NameCache,
    pub parents: ParentLinkCache,
    pub searches: SearchCache,
    pub transfers: TransferCache,
    pub subscribers: SubscriberSet,
}

impl SessionStore {
    /// Loads the persisted stores and seeds the name cache with the root.
    pub async fn open(
        root_id: impl Into<String>,
        transfer_cache: impl Into<PathBuf>,
        subscribers: impl Into<PathBuf>,
    ) -> Self {
        let root_id = root_id.into();
        let names = NameCache::default();
        names.insert(root_id.clone(), ROOT_NAME.to_string());
        Self {
            root_id,
            names,
            parents: ParentLinkCache::default(),
            searches: SearchCache::default(),
            transfers: TransferCache::load(transfer_cache).await,
            subscribers: SubscriberSet::load(subscribers).await,
        }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn is_root(&self, folder_id: &str) -> bool {
        folder_id == self.root_id
    }
}
