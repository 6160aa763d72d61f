//! Source provider trait and implementations.
//!
//! [`SourceProvider`] is the read-only surface the bot needs from the remote
//! file store: list a folder, fetch one file's metadata, search by name, and
//! download contents in chunks.

mod drive;
#[cfg(feature = "mock")]
mod mock;
mod unavailable;

pub use self::drive::DriveBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockProvider;
pub use self::unavailable::UnavailableBackend;
use crate::error::Result;
use crate::models::{DownloadChunk, DownloadFormat, FileMetadata, RemoteEntry};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<DownloadChunk>> + Send + 'a>>;

/// Largest page the provider will return for a folder listing. Folders with
/// more children than this are truncated.
pub const LIST_PAGE_SIZE: u32 = 1000;

/// Unified interface for the remote file store.
///
/// # Examples
///
/// ```
/// use drivebot_drive::{SourceProvider, error::Result};
///
/// async fn file_names(provider: &dyn SourceProvider, folder: &str) -> Result<Vec<String>> {
///     Ok(provider.list_children(folder).await?.into_iter().filter(|e| !e.is_folder()).map(|e| e.name).collect())
/// }
/// ```
///
/// # Streaming
/// Collect a download into memory while watching the provider's progress:
///
/// ```
/// use drivebot_drive::{DownloadFormat, SourceProvider, error::Result};
/// use futures::TryStreamExt;
///
/// async fn fetch(provider: &dyn SourceProvider, id: &str) -> Result<Vec<u8>> {
///     let mut buffer = Vec::new();
///     let mut chunks = provider.download(id, DownloadFormat::Raw, 5 * 1024 * 1024);
///     while let Some(chunk) = chunks.try_next().await? {
///         if let Some(percent) = chunk.percent() {
///             println!("{percent}%");
///         }
///         buffer.extend_from_slice(&chunk.data);
///     }
///     Ok(buffer)
/// }
/// ```
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Name of the provider, used for logging only.
    fn name(&self) -> &str;

    /// Direct, non-trashed children of a folder, in provider order.
    ///
    /// A single request of up to [`LIST_PAGE_SIZE`] entries; no
    /// continuation pages are fetched.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteEntry>>;

    /// Metadata of a single file or folder.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if it does not
    /// exist or is not visible to the credential.
    async fn metadata(&self, file_id: &str) -> Result<FileMetadata>;

    /// Non-trashed entries anywhere in the tree whose name contains `needle`,
    /// ordered by name, at most `limit` of them. `needle` is the raw user
    /// text; implementations escape it for their query language.
    async fn search(&self, needle: &str, limit: usize) -> Result<Vec<RemoteEntry>>;

    /// Stream file contents as chunks of at most `chunk_size` bytes.
    ///
    /// Every chunk carries the running byte count and, where known, the
    /// total size. An error item ends the stream.
    fn download<'a>(&'a self, file_id: &'a str, format: DownloadFormat, chunk_size: u64) -> ChunkStream<'a>;
}
