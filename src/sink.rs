//! Delivers transfer jobs into a Telegram chat.

use async_trait::async_trait;
use drivebot_library::error::{ErrorKind, Result};
use drivebot_library::transfer::{DeliverySink, Upload};
use drivebot_telegram::{ChatId, DocumentUpload, MessageRef, OutgoingText, TransportHandle};
use exn::ResultExt;
use std::sync::{Mutex, PoisonError};

/// One chat, with at most one status message at a time.
pub struct ChatSink {
    transport: TransportHandle,
    chat_id: ChatId,
    status: Mutex<Option<MessageRef>>,
}

impl ChatSink {
    pub fn new(transport: TransportHandle, chat_id: ChatId) -> Self {
        Self {
            transport,
            chat_id,
            status: Mutex::new(None),
        }
    }

    fn status(&self) -> Option<MessageRef> {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace_status(&self, status: Option<MessageRef>) -> Option<MessageRef> {
        std::mem::replace(&mut *self.status.lock().unwrap_or_else(PoisonError::into_inner), status)
    }
}

#[async_trait]
impl DeliverySink for ChatSink {
    async fn open_status(&self, text: &str) -> Result<()> {
        let message = self
            .transport
            .send_message(self.chat_id, &OutgoingText::markdown(text))
            .await
            .or_raise(|| ErrorKind::Sink)?;
        self.replace_status(Some(message.reference()));
        Ok(())
    }

    async fn update_status(&self, text: &str) -> Result<()> {
        let Some(status) = self.status() else {
            return self.open_status(text).await;
        };
        match self.transport.edit_message(status, &OutgoingText::markdown(text)).await {
            Err(err) if !err.is_not_modified() => Err(err).or_raise(|| ErrorKind::Sink),
            _ => Ok(()),
        }
    }

    async fn close_status(&self) -> Result<()> {
        let Some(status) = self.replace_status(None) else {
            return Ok(());
        };
        self.transport.delete_message(status).await.or_raise(|| ErrorKind::Sink)
    }

    async fn send_cached(&self, handle: &str, caption: &str) -> Result<()> {
        self.transport
            .send_cached_document(self.chat_id, handle, &OutgoingText::markdown(caption))
            .await
            .or_raise(|| ErrorKind::Sink)?;
        Ok(())
    }

    async fn upload(&self, upload: Upload) -> Result<Option<String>> {
        let document = DocumentUpload {
            file_name: upload.file_name,
            length: upload.length,
            caption: OutgoingText::markdown(upload.caption),
            body: upload.body,
        };
        let message = self
            .transport
            .upload_document(self.chat_id, document)
            .await
            .or_raise(|| ErrorKind::Sink)?;
        Ok(message.document.map(|document| document.file_id).filter(|handle| !handle.is_empty()))
    }
}
