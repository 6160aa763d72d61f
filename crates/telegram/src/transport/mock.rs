//! Recording transport for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{BotCommand, Chat, ChatId, Document, Message, MessageRef, OutgoingText, Update};
use crate::transport::{DocumentUpload, Transport};
use async_trait::async_trait;
use exn::ResultExt;
use futures::io::AsyncReadExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::Mutex;

/// Everything the bot asked the transport to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Sent { chat_id: ChatId, message_id: i64, text: OutgoingText },
    Edited { message: MessageRef, text: OutgoingText },
    Deleted(MessageRef),
    CachedDocument { chat_id: ChatId, handle: String, caption: OutgoingText },
    Uploaded { chat_id: ChatId, file_name: String, contents: Vec<u8>, handle: String },
    Answered { callback_id: String, text: Option<String> },
    CommandsSet(Vec<String>),
    PendingDropped,
}

/// Recording transport for testing.
///
/// Every call is appended to an in-memory log. Uploads read their body to the
/// end, so progress adapters wrapped around the body observe a full read.
/// Each failure switch makes the matching operation return an API error.
///
/// # Examples
///
/// ```
/// use drivebot_telegram::{MockTransport, OutgoingText, Recorded, Transport};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = MockTransport::default();
/// transport.send_message(7, &OutgoingText::plain("hello")).await?;
/// assert!(matches!(&transport.recorded().await[0], Recorded::Sent { chat_id: 7, .. }));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockTransport {
    log: Mutex<Vec<Recorded>>,
    updates: Mutex<VecDeque<Vec<Update>>>,
    next_id: AtomicI64,
    fail_cached_documents: AtomicBool,
    fail_uploads: AtomicBool,
    fail_edits: AtomicBool,
    fail_sends: AtomicBool,
}

impl MockTransport {
    /// Queue a batch to be returned by the next `get_updates` call.
    pub async fn push_updates(&self, batch: Vec<Update>) {
        self.updates.lock().await.push_back(batch);
    }

    pub async fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().await.clone()
    }

    /// Texts of sent messages and edits, in order.
    pub async fn texts(&self) -> Vec<String> {
        self.log
            .lock()
            .await
            .iter()
            .filter_map(|r| match r {
                Recorded::Sent { text, .. } | Recorded::Edited { text, .. } => Some(text.text.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn uploads(&self) -> usize {
        self.log.lock().await.iter().filter(|r| matches!(r, Recorded::Uploaded { .. })).count()
    }

    pub fn set_fail_cached_documents(&self, fail: bool) {
        self.fail_cached_documents.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, description: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Api {
                code: 400,
                description: description.to_string(),
            });
        }
        Ok(())
    }

    fn message(&self, chat_id: ChatId, document: Option<Document>) -> Message {
        Message {
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            chat: Chat { id: chat_id },
            from: None,
            text: None,
            document,
        }
    }

    async fn record(&self, entry: Recorded) {
        self.log.lock().await.push(entry);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_updates(&self, _offset: Option<i64>, _timeout_secs: u64) -> Result<Vec<Update>> {
        Ok(self.updates.lock().await.pop_front().unwrap_or_default())
    }

    async fn send_message(&self, chat_id: ChatId, text: &OutgoingText) -> Result<Message> {
        Self::check(&self.fail_sends, "Forbidden: bot was blocked by the user")?;
        let message = self.message(chat_id, None);
        self.record(Recorded::Sent {
            chat_id,
            message_id: message.message_id,
            text: text.clone(),
        })
        .await;
        Ok(message)
    }

    async fn edit_message(&self, message: MessageRef, text: &OutgoingText) -> Result<()> {
        Self::check(&self.fail_edits, "Bad Request: message to edit not found")?;
        self.record(Recorded::Edited {
            message,
            text: text.clone(),
        })
        .await;
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        self.record(Recorded::Deleted(message)).await;
        Ok(())
    }

    async fn send_cached_document(&self, chat_id: ChatId, handle: &str, caption: &OutgoingText) -> Result<Message> {
        Self::check(&self.fail_cached_documents, "Bad Request: wrong file identifier/HTTP URL specified")?;
        self.record(Recorded::CachedDocument {
            chat_id,
            handle: handle.to_string(),
            caption: caption.clone(),
        })
        .await;
        let document = Document {
            file_id: handle.to_string(),
            file_name: None,
        };
        Ok(self.message(chat_id, Some(document)))
    }

    async fn upload_document(&self, chat_id: ChatId, mut upload: DocumentUpload) -> Result<Message> {
        Self::check(&self.fail_uploads, "Request Entity Too Large")?;
        let mut contents = Vec::new();
        upload
            .body
            .read_to_end(&mut contents)
            .await
            .or_raise(|| ErrorKind::Body("mock upload read failed".to_string()))?;
        let message = self.message(
            chat_id,
            Some(Document {
                file_id: String::new(),
                file_name: Some(upload.file_name.clone()),
            }),
        );
        let handle = format!("handle-{}", message.message_id);
        self.record(Recorded::Uploaded {
            chat_id,
            file_name: upload.file_name,
            contents,
            handle: handle.clone(),
        })
        .await;
        Ok(Message {
            document: message.document.map(|d| Document { file_id: handle, ..d }),
            ..message
        })
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.record(Recorded::Answered {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        })
        .await;
        Ok(())
    }

    async fn set_commands(&self, commands: &[BotCommand]) -> Result<()> {
        self.record(Recorded::CommandsSet(commands.iter().map(|c| c.command.clone()).collect())).await;
        Ok(())
    }

    async fn drop_pending_updates(&self) -> Result<()> {
        self.record(Recorded::PendingDropped).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    #[tokio::test]
    async fn test_upload_drains_body_and_assigns_handle() {
        let transport = MockTransport::default();
        let upload = DocumentUpload {
            file_name: "notes.pdf".to_string(),
            length: 4,
            caption: OutgoingText::plain("caption"),
            body: Box::pin(Cursor::new(b"%PDF".to_vec())),
        };
        let message = transport.upload_document(3, upload).await.unwrap();
        let handle = message.document.unwrap().file_id;
        assert!(handle.starts_with("handle-"));
        assert_eq!(transport.uploads().await, 1);
        match &transport.recorded().await[0] {
            Recorded::Uploaded { contents, .. } => assert_eq!(contents, b"%PDF"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_cached_document() {
        let transport = MockTransport::default();
        transport.set_fail_cached_documents(true);
        let err = transport.send_cached_document(3, "old", &OutgoingText::plain("c")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Api { code: 400, .. }));
        assert!(transport.recorded().await.is_empty());
    }

    #[tokio::test]
    async fn test_updates_are_served_in_batches() {
        let transport = MockTransport::default();
        transport
            .push_updates(vec![Update {
                update_id: 1,
                message: None,
                callback_query: None,
            }])
            .await;
        assert_eq!(transport.get_updates(None, 0).await.unwrap().len(), 1);
        assert!(transport.get_updates(Some(2), 0).await.unwrap().is_empty());
    }
}
