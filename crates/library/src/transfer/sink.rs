//! Where a transfer delivers to.

use crate::error::Result;
use async_trait::async_trait;
use futures::io::AsyncRead;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

/// File contents handed to the sink, read to the end exactly once.
pub type UploadBody = Pin<Box<dyn AsyncRead + Send + Sync>>;

pub struct Upload {
    pub file_name: String,
    /// Exact length of `body`, in bytes.
    pub length: u64,
    /// Markdown caption shown with the file.
    pub caption: String,
    pub body: UploadBody,
}
impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// The conversation a transfer job reports into and delivers to.
///
/// A sink owns at most one status message at a time. Status calls are best
/// effort: the engine ignores their errors.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Posts a fresh status message.
    async fn open_status(&self, text: &str) -> Result<()>;

    /// Replaces the text of the status message. Markdown.
    async fn update_status(&self, text: &str) -> Result<()>;

    /// Removes the status message.
    async fn close_status(&self) -> Result<()>;

    /// Re-sends a previously uploaded file by its sink handle.
    async fn send_cached(&self, handle: &str, caption: &str) -> Result<()>;

    /// Uploads a new file, returning the handle the sink assigned to it, if
    /// it reported one.
    async fn upload(&self, upload: Upload) -> Result<Option<String>>;
}

pub type SinkHandle = Arc<dyn DeliverySink + Send + Sync>;
