//! Stand-in provider for when no usable credential was found.
//!
//! The bot still starts and answers messages; every provider operation fails
//! with [`ErrorKind::Unavailable`] and the user sees the generic error text.

use crate::backend::{ChunkStream, SourceProvider};
use crate::error::{ErrorKind, Result};
use crate::models::{DownloadFormat, FileMetadata, RemoteEntry};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}
impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn error(&self) -> crate::error::Error {
        exn::Exn::from(ErrorKind::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl SourceProvider for UnavailableBackend {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn list_children(&self, _folder_id: &str) -> Result<Vec<RemoteEntry>> {
        Err(self.error())
    }

    async fn metadata(&self, _file_id: &str) -> Result<FileMetadata> {
        Err(self.error())
    }

    async fn search(&self, _needle: &str, _limit: usize) -> Result<Vec<RemoteEntry>> {
        Err(self.error())
    }

    fn download<'a>(&'a self, file_id: &'a str, _format: DownloadFormat, _chunk_size: u64) -> ChunkStream<'a> {
        tracing::debug!(file_id, "Download requested without a provider");
        let err = self.error();
        Box::pin(futures::stream::once(async move { Err(err) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_every_operation_is_unavailable() {
        let backend = UnavailableBackend::new("no credentials");
        let err = backend.list_children("root").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable(_)));
        let err = backend.metadata("f").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable(_)));
        let err = backend.search("x", 50).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable(_)));

        let items: Vec<_> = backend.download("f", DownloadFormat::Raw, 1024).collect().await;
        assert_eq!(items.len(), 1);
        let err = items[0].as_ref().unwrap_err();
        assert!(matches!(&**err, ErrorKind::Unavailable(_)));
    }
}
