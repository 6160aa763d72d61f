//! Source provider for drivebot: a read-only view over a Google Drive folder
//! tree.
//!
//! The [`SourceProvider`] trait is the seam the rest of the workspace talks
//! to. [`DriveBackend`](backend::DriveBackend) implements it against the
//! Drive v3 REST API, [`UnavailableBackend`](backend::UnavailableBackend)
//! stands in when no usable credential was found, and `MockProvider` (feature
//! `mock`) backs the tests of downstream crates.

pub mod auth;
pub mod backend;
pub mod error;
mod models;
pub mod query;

pub use crate::backend::SourceProvider;
pub use crate::models::{DownloadChunk, DownloadFormat, EntryKind, FileMetadata, RemoteEntry, mime};
use std::sync::Arc;

pub type ProviderHandle = Arc<dyn SourceProvider + Send + Sync>;
