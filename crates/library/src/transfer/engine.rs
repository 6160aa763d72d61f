//! Moves one file from the source provider to a delivery sink.
//!
//! The pipeline is: metadata, cache probe, size gate, chunked download into
//! memory, progress-tracked upload, cache write. Each step that talks to the
//! outside world converts its failure into a terminal [`DeliveryOutcome`];
//! nothing propagates out of [`TransferEngine::execute`].
//!
//! Progress never touches the sink from inside the download or upload loop.
//! Percentages are posted into bounded mailboxes without waiting, and a
//! reporter task owned by the job turns them into status edits. The reporter
//! is drained and stopped before the terminal status is written.

use crate::error::Result;
use crate::transfer::outcome::{DeliveryOutcome, TransferFailure};
use crate::transfer::sink::{SinkHandle, Upload};
use crate::transfer::state::{TransferJob, TransferState};
use drivebot_asyncutils::{Clock, ProgressTracker, Throttle, system_clock};
use drivebot_cache::SessionStore;
use drivebot_drive::error::Result as ProviderResult;
use drivebot_drive::{DownloadFormat, FileMetadata, ProviderHandle};
use drivebot_render::{Language, Localizer, MessageKey, format_date, format_size, progress_bar};
use futures::channel::mpsc;
use futures::io::Cursor;
use futures::{Stream, StreamExt, TryStreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::instrument;

/// Largest file that will be re-uploaded (99 MiB, inclusive).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 99 * 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(4);
/// Progress updates buffered per phase before new ones are dropped.
const PROGRESS_MAILBOX: usize = 8;
/// How long the reporter may take to flush its last edits.
const REPORTER_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TransferSettings {
    pub max_upload_bytes: u64,
    pub chunk_size: u64,
    pub progress_interval: Duration,
    pub clock: Clock,
}
impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            clock: system_clock(),
        }
    }
}
impl fmt::Debug for TransferSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferSettings")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("chunk_size", &self.chunk_size)
            .field("progress_interval", &self.progress_interval)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Download(u8),
    Upload(u8),
}

/// Status-edit task for a single job. Aborted if dropped unfinished.
struct Reporter {
    handle: Option<JoinHandle<()>>,
}

impl Reporter {
    fn spawn<S>(sink: SinkHandle, localizer: Arc<Localizer>, language: Language, name: String, updates: S) -> Self
    where
        S: Stream<Item = Progress> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut updates = std::pin::pin!(updates);
            let mut last = String::new();
            while let Some(progress) = updates.next().await {
                let (key, percent) = match progress {
                    Progress::Download(percent) => (MessageKey::Downloading, percent),
                    Progress::Upload(percent) => (MessageKey::Uploading, percent),
                };
                let text = localizer.text(
                    language,
                    key,
                    upon::value! { name: name.as_str(), bar: progress_bar(percent), percent: u64::from(percent) },
                );
                // Re-sending identical text is rejected by most chat platforms.
                if text == last {
                    continue;
                }
                if let Err(err) = sink.update_status(&text).await {
                    tracing::debug!(error = %err, "Progress edit failed");
                }
                last = text;
            }
        });
        Self { handle: Some(handle) }
    }

    /// Waits for queued edits once every sender is gone.
    async fn finish(mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        if tokio::time::timeout(REPORTER_GRACE, &mut handle).await.is_err() {
            tracing::warn!("Progress reporter did not finish in time");
            handle.abort();
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub struct TransferEngine {
    provider: ProviderHandle,
    store: Arc<SessionStore>,
    localizer: Arc<Localizer>,
    settings: TransferSettings,
}

impl TransferEngine {
    pub fn new(
        provider: ProviderHandle,
        store: Arc<SessionStore>,
        localizer: Arc<Localizer>,
        settings: TransferSettings,
    ) -> Self {
        Self {
            provider,
            store,
            localizer,
            settings,
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Delivers `source_id` to `sink`, reporting progress in `language`.
    #[instrument(skip(self, sink), fields(provider = self.provider.name()))]
    pub async fn execute(&self, source_id: &str, sink: SinkHandle, language: Language) -> DeliveryOutcome {
        let mut job = TransferJob::new(source_id);
        let outcome = match self.run(&mut job, &sink, language).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = ?err, state = %job.state(), "Transfer aborted");
                DeliveryOutcome::Failed(TransferFailure::Init(err.to_string()))
            },
        };
        tracing::info!(%outcome, name = %job.display_name, state = %job.state(), "Transfer finished");
        outcome
    }

    async fn run(&self, job: &mut TransferJob, sink: &SinkHandle, language: Language) -> Result<DeliveryOutcome> {
        let status = |key, vars| self.localizer.text(language, key, vars);
        quietly(sink.open_status(&self.localizer.get(language, MessageKey::Fetching)).await);

        let metadata = match self.provider.metadata(&job.source_id).await {
            Ok(metadata) => metadata,
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(error = %message, "Failed to fetch metadata");
                job.advance(TransferState::Failed)?;
                let text = status(MessageKey::ErrorFetch, upon::value! { message: message.as_str() });
                quietly(sink.update_status(&text).await);
                return Ok(DeliveryOutcome::Failed(TransferFailure::Fetch(message)));
            },
        };
        job.advance(TransferState::MetadataFetched)?;
        job.display_name = metadata.display_name();
        job.size_bytes = metadata.size;
        let caption = self.caption(&metadata, &job.display_name, language);
        let view_link = metadata.view_link.clone();

        if let Some(handle) = self.store.transfers.get(&job.source_id) {
            match sink.send_cached(&handle, &caption).await {
                Ok(()) => {
                    job.sink_cache_key = Some(handle);
                    job.advance(TransferState::CacheHit)?;
                    job.advance(TransferState::Delivered)?;
                    quietly(sink.close_status().await);
                    return Ok(DeliveryOutcome::Delivered { from_cache: true });
                },
                // Soft miss: the entry stays until a fresh upload replaces it.
                Err(err) => tracing::warn!(error = %err, "Cached handle rejected, transferring again"),
            }
        }

        let size = metadata.size.unwrap_or(0);
        if size > self.settings.max_upload_bytes {
            job.advance(TransferState::SizeRejected)?;
            let link = view_link.as_deref().unwrap_or_default();
            quietly(sink.update_status(&status(MessageKey::FileTooLarge, upon::value! { link: link })).await);
            return Ok(DeliveryOutcome::SizeRejected { size, view_link });
        }

        job.advance(TransferState::Downloading)?;
        let (download_tx, download_rx) = mpsc::channel(PROGRESS_MAILBOX);
        let (mut upload_tx, upload_rx) = mpsc::channel(PROGRESS_MAILBOX);
        // Upload updates queue behind the download ones until the download
        // mailbox closes, so edits never go backwards.
        let updates = download_rx.map(Progress::Download).chain(upload_rx.map(Progress::Upload));
        let reporter =
            Reporter::spawn(sink.clone(), self.localizer.clone(), language, job.display_name.clone(), updates);

        let buffer = match self.download(&job.source_id, metadata.download_format(), download_tx).await {
            Ok(buffer) => buffer,
            Err(err) => {
                drop(upload_tx);
                reporter.finish().await;
                let message = err.to_string();
                tracing::warn!(error = %message, "Download failed");
                job.advance(TransferState::Failed)?;
                let text = status(MessageKey::ErrorInit, upon::value! { message: message.as_str() });
                quietly(sink.update_status(&text).await);
                return Ok(DeliveryOutcome::Failed(TransferFailure::Init(message)));
            },
        };

        job.advance(TransferState::Uploading)?;
        let length = buffer.len() as u64;
        let _ = upload_tx.try_send(0);
        let body = ProgressTracker::with_clock(
            Cursor::new(buffer),
            length,
            self.settings.progress_interval,
            upload_tx,
            self.settings.clock.clone(),
        );
        let upload = Upload {
            file_name: job.display_name.clone(),
            length,
            caption,
            body: Box::pin(body),
        };
        let result = sink.upload(upload).await;
        reporter.finish().await;

        match result {
            Ok(handle) => {
                job.advance(TransferState::Delivered)?;
                if let Some(handle) = handle {
                    // The user already has the file; a lost cache entry only
                    // costs a repeat transfer next time.
                    if let Err(err) = self.store.transfers.insert(&job.source_id, &handle).await {
                        tracing::warn!(error = ?err, "Failed to persist transfer result");
                    }
                    job.sink_cache_key = Some(handle);
                }
                quietly(sink.close_status().await);
                Ok(DeliveryOutcome::Delivered { from_cache: false })
            },
            Err(err) => {
                tracing::warn!(error = %err, bytes = length, "Upload failed");
                job.advance(TransferState::Failed)?;
                let link = view_link.as_deref().unwrap_or_default();
                quietly(sink.update_status(&status(MessageKey::UploadFailed, upon::value! { link: link })).await);
                Ok(DeliveryOutcome::Failed(TransferFailure::Upload { view_link }))
            },
        }
    }

    /// Collects the whole file into memory, posting throttled percentages
    /// when the provider reports a total.
    async fn download(
        &self,
        source_id: &str,
        format: DownloadFormat,
        mut progress: mpsc::Sender<u8>,
    ) -> ProviderResult<Vec<u8>> {
        let _ = progress.try_send(0);
        let mut throttle = Throttle::new(self.settings.progress_interval, (self.settings.clock)());
        let mut chunks = self.provider.download(source_id, format, self.settings.chunk_size);
        let mut buffer = Vec::new();
        while let Some(chunk) = chunks.try_next().await? {
            buffer.extend_from_slice(&chunk.data);
            if let Some(percent) = chunk.percent()
                && throttle.ready((self.settings.clock)())
            {
                let _ = progress.try_send(percent);
            }
        }
        tracing::debug!(bytes = buffer.len(), "Downloaded");
        Ok(buffer)
    }

    fn caption(&self, metadata: &FileMetadata, name: &str, language: Language) -> String {
        self.localizer.text(
            language,
            MessageKey::Caption,
            upon::value! {
                name: name,
                size: format_size(metadata.size),
                date: format_date(metadata.modified_time.as_deref()),
            },
        )
    }
}

/// Status messages are cosmetic; their failures are only worth a debug line.
fn quietly(result: Result<()>) {
    if let Err(err) = result {
        tracing::debug!(error = %err, "Status message update failed");
    }
}
