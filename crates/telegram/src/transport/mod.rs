//! Sink transport trait and implementations.

mod client;
#[cfg(feature = "mock")]
mod mock;

pub use self::client::{ClientSettings, DEFAULT_API_URL, TelegramClient};
#[cfg(feature = "mock")]
pub use self::mock::{MockTransport, Recorded};
use crate::error::Result;
use crate::models::{BotCommand, ChatId, Message, MessageRef, OutgoingText, Update};
use async_trait::async_trait;
use futures::io::AsyncRead;
use std::fmt;
use std::pin::Pin;

/// Streamed document contents. The transport reads it to the end exactly
/// once while sending.
pub type UploadBody = Pin<Box<dyn AsyncRead + Send + Sync>>;

/// A new document to be sent to a chat.
pub struct DocumentUpload {
    pub file_name: String,
    /// Exact length of `body`, in bytes.
    pub length: u64,
    pub caption: OutgoingText,
    pub body: UploadBody,
}
impl fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("file_name", &self.file_name)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Unified interface for the messaging platform.
///
/// # Examples
///
/// ```
/// use drivebot_telegram::{OutgoingText, Transport, error::Result};
///
/// async fn greet(transport: &dyn Transport, chat_id: i64) -> Result<()> {
///     let status = transport.send_message(chat_id, &OutgoingText::plain("⏳ Working...")).await?;
///     transport.edit_message(status.reference(), &OutgoingText::plain("✅ Done")).await
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Long-poll for updates after `offset`, waiting up to `timeout_secs`.
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>>;

    async fn send_message(&self, chat_id: ChatId, text: &OutgoingText) -> Result<Message>;

    async fn edit_message(&self, message: MessageRef, text: &OutgoingText) -> Result<()>;

    async fn delete_message(&self, message: MessageRef) -> Result<()>;

    /// Re-send a previously uploaded document by its handle. Fails when the
    /// platform no longer recognises the handle.
    async fn send_cached_document(&self, chat_id: ChatId, handle: &str, caption: &OutgoingText) -> Result<Message>;

    /// Upload a new document. The returned message carries the handle the
    /// platform assigned to it.
    async fn upload_document(&self, chat_id: ChatId, upload: DocumentUpload) -> Result<Message>;

    /// Acknowledge a button press, optionally with a short toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    async fn set_commands(&self, commands: &[BotCommand]) -> Result<()>;

    /// Discard updates that queued up while the bot was offline.
    async fn drop_pending_updates(&self) -> Result<()>;
}
