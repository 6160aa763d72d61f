//! Session stores for drivebot.
//!
//! Two kinds of store live here:
//! - **In-memory** lookup maps ([`NameCache`], [`ParentLinkCache`],
//!   [`SearchCache`]) that last for the process lifetime and are rebuilt
//!   lazily from the provider.
//! - **Persisted** documents ([`TransferCache`], [`SubscriberSet`]) that are
//!   rewritten in full, atomically, on every mutation. Losing or corrupting
//!   either file only means starting empty.
//!
//! [`SessionStore`] bundles them so components receive their caches
//! explicitly instead of reaching for globals.

mod document;
pub mod error;
mod memory;
mod session;
mod subscribers;
mod transfers;

pub use crate::memory::{MemoryCache, NameCache, ParentLinkCache, SearchCache, SearchResults};
pub use crate::session::{ROOT_NAME, SessionStore};
pub use crate::subscribers::SubscriberSet;
pub use crate::transfers::TransferCache;
