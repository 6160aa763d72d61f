//! In-memory source provider for testing.

use crate::backend::{ChunkStream, SourceProvider};
use crate::error::{ErrorKind, Result};
use crate::models::{DownloadChunk, DownloadFormat, EntryKind, FileMetadata, RemoteEntry, mime};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MockItem {
    entry: RemoteEntry,
    /// Overrides the size reported by metadata, for exercising size limits
    /// without allocating the bytes.
    declared_size: Option<u64>,
    contents: Vec<u8>,
    modified_time: Option<String>,
}
impl MockItem {
    fn metadata(&self) -> FileMetadata {
        let size = match self.entry.kind {
            EntryKind::Folder => None,
            EntryKind::File if mime::is_native_document(&self.entry.mime_type) => None,
            EntryKind::File => Some(self.declared_size.unwrap_or(self.contents.len() as u64)),
        };
        FileMetadata {
            name: self.entry.name.clone(),
            size,
            mime_type: self.entry.mime_type.clone(),
            view_link: Some(format!("https://drive.example/file/{}/view", self.entry.id)),
            modified_time: self.modified_time.clone(),
            parents: self.entry.parent_id.iter().cloned().collect(),
        }
    }
}

/// In-memory source provider for testing.
///
/// Holds a folder tree in a `HashMap` behind a [`RwLock`]. Every operation is
/// counted, and individual operations can be made to fail, so tests can
/// assert both on results and on how often the provider was consulted.
///
/// # Examples
///
/// ```
/// use drivebot_drive::backend::MockProvider;
/// use drivebot_drive::SourceProvider;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = MockProvider::default()
///     .with_folder("unit1", "Unit 1", "root")
///     .with_file("f1", "Lecture 1.pdf", "unit1", b"%PDF-1.7");
/// let children = provider.list_children("root").await?;
/// assert_eq!(children.len(), 1);
/// assert_eq!(provider.metadata("f1").await?.size, Some(8));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockProvider {
    items: RwLock<HashMap<String, MockItem>>,
    /// Insertion order, so listings are deterministic but unsorted.
    order: RwLock<Vec<String>>,
    list_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
    search_calls: AtomicUsize,
    download_calls: AtomicUsize,
    fail_list: AtomicBool,
    fail_metadata: AtomicBool,
    fail_search: AtomicBool,
    /// Fail downloads after this many chunks have been yielded.
    fail_download_after: RwLock<Option<usize>>,
}

impl MockProvider {
    fn insert(mut self, item: MockItem) -> Self {
        let id = item.entry.id.clone();
        self.items.get_mut().insert(id.clone(), item);
        self.order.get_mut().push(id);
        self
    }

    fn item(id: &str, name: &str, parent: &str, mime_type: &str, contents: Vec<u8>) -> MockItem {
        MockItem {
            entry: RemoteEntry {
                id: id.to_string(),
                name: name.to_string(),
                kind: EntryKind::from_mime(mime_type),
                mime_type: mime_type.to_string(),
                size: None,
                parent_id: (!parent.is_empty()).then(|| parent.to_string()),
            },
            declared_size: None,
            contents,
            modified_time: None,
        }
    }

    /// Add a folder under `parent`. An empty parent makes a top-level folder
    /// with no parent at all.
    pub fn with_folder(self, id: &str, name: &str, parent: &str) -> Self {
        self.insert(Self::item(id, name, parent, mime::FOLDER, Vec::new()))
    }

    /// Add a regular (binary) file with a guessed mime type.
    pub fn with_file(self, id: &str, name: &str, parent: &str, contents: impl Into<Vec<u8>>) -> Self {
        let mime_type = if name.ends_with(".pdf") { mime::PDF } else { "application/octet-stream" };
        self.insert(Self::item(id, name, parent, mime_type, contents.into()))
    }

    /// Add a provider-native document whose PDF export is `exported`.
    pub fn with_native_document(self, id: &str, name: &str, parent: &str, exported: impl Into<Vec<u8>>) -> Self {
        let item = Self::item(id, name, parent, "application/vnd.google-apps.document", exported.into());
        self.insert(item)
    }

    /// Report `size` bytes in metadata regardless of the stored contents.
    ///
    /// Panics if `id` was never added. If test setup is wrong, then test
    /// should not pass.
    pub fn with_declared_size(mut self, id: &str, size: u64) -> Self {
        let Some(item) = self.items.get_mut().get_mut(id) else {
            panic!("MockProvider::with_declared_size: unknown id {id}");
        };
        item.declared_size = Some(size);
        item.entry.size = Some(size);
        self
    }

    pub fn with_modified_time(mut self, id: &str, timestamp: &str) -> Self {
        let Some(item) = self.items.get_mut().get_mut(id) else {
            panic!("MockProvider::with_modified_time: unknown id {id}");
        };
        item.modified_time = Some(timestamp.to_string());
        self
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    /// Make downloads fail once `chunks` chunks have been yielded; `None`
    /// restores normal behaviour.
    pub async fn set_fail_download_after(&self, chunks: Option<usize>) {
        *self.fail_download_after.write().await = chunks;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    fn injected(&self, flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Api {
                status: 500,
                message: format!("injected {what} failure"),
            });
        }
        Ok(())
    }

    async fn entries(&self) -> Vec<MockItem> {
        let items = self.items.read().await;
        let order = self.order.read().await;
        order.iter().filter_map(|id| items.get(id).cloned()).collect()
    }
}

#[async_trait]
impl SourceProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(&self.fail_list, "list")?;
        Ok(self
            .entries()
            .await
            .into_iter()
            .filter(|item| item.entry.parent_id.as_deref() == Some(folder_id))
            .map(|item| item.entry)
            .collect())
    }

    async fn metadata(&self, file_id: &str) -> Result<FileMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(&self.fail_metadata, "metadata")?;
        let items = self.items.read().await;
        let item = items
            .get(file_id)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(file_id.to_string())))?;
        Ok(item.metadata())
    }

    async fn search(&self, needle: &str, limit: usize) -> Result<Vec<RemoteEntry>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(&self.fail_search, "search")?;
        let needle = needle.to_lowercase();
        let mut found: Vec<RemoteEntry> = self
            .entries()
            .await
            .into_iter()
            .filter(|item| item.entry.name.to_lowercase().contains(&needle))
            .map(|item| item.entry)
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found.truncate(limit);
        Ok(found)
    }

    fn download<'a>(&'a self, file_id: &'a str, format: DownloadFormat, chunk_size: u64) -> ChunkStream<'a> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let chunk_size = usize::try_from(chunk_size.max(1)).unwrap_or(usize::MAX);
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding.
            let contents = {
                let items = self.items.read().await;
                items.get(file_id).map(|item| item.contents.clone())
            };
            let fail_after = *self.fail_download_after.read().await;
            let Some(contents) = contents else {
                yield Err(exn::Exn::from(ErrorKind::NotFound(file_id.to_string())));
                return;
            };
            let total = contents.len() as u64;
            let pieces: Vec<Vec<u8>> = match format {
                DownloadFormat::Export(_) => vec![contents],
                DownloadFormat::Raw if contents.is_empty() => vec![Vec::new()],
                DownloadFormat::Raw => contents.chunks(chunk_size).map(<[u8]>::to_vec).collect(),
            };
            let mut received = 0u64;
            for (index, data) in pieces.into_iter().enumerate() {
                if fail_after.is_some_and(|limit| index >= limit) {
                    yield Err(exn::Exn::from(ErrorKind::Network("injected download failure".to_string())));
                    return;
                }
                received += data.len() as u64;
                yield Ok(DownloadChunk { data, received, total: Some(total) });
            }
        })
    }
}
