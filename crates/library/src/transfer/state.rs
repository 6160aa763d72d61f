//! Lifecycle of a single transfer job.
//!
//! ```text
//! Requested → MetadataFetched ┬→ CacheHit → Delivered
//!                             ├→ SizeRejected
//!                             └→ Downloading → Uploading → Delivered
//! any non-terminal state → Failed
//! ```

use crate::error::{ErrorKind, Result};
use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    #[display("requested")]
    Requested,
    #[display("metadata fetched")]
    MetadataFetched,
    #[display("cache hit")]
    CacheHit,
    #[display("size rejected")]
    SizeRejected,
    #[display("downloading")]
    Downloading,
    #[display("uploading")]
    Uploading,
    #[display("delivered")]
    Delivered,
    #[display("failed")]
    Failed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::SizeRejected | Self::Failed)
    }

    /// Whether the graph has an edge from `self` to `next`.
    pub fn can_advance_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        match (*self, next) {
            (from, Failed) => !from.is_terminal(),
            (Requested, MetadataFetched)
            | (MetadataFetched, CacheHit | SizeRejected | Downloading)
            | (CacheHit, Delivered)
            | (Downloading, Uploading)
            | (Uploading, Delivered) => true,
            _ => false,
        }
    }
}

/// Bookkeeping for one download request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub source_id: String,
    /// Sink handle, once one is known (from the cache or a fresh upload).
    pub sink_cache_key: Option<String>,
    pub size_bytes: Option<u64>,
    pub display_name: String,
    state: TransferState,
}

impl TransferJob {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            sink_cache_key: None,
            size_bytes: None,
            display_name: String::new(),
            state: TransferState::Requested,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Moves to `next`, refusing any move the graph does not contain.
    pub fn advance(&mut self, next: TransferState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            exn::bail!(ErrorKind::InvalidTransition { from: self.state, to: next });
        }
        tracing::trace!(source_id = %self.source_id, from = %self.state, to = %next, "Transfer state changed");
        self.state = next;
        Ok(())
    }
}
