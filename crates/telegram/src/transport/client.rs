//! Bot API client over HTTPS.

use crate::error::{ErrorKind, Result};
use crate::models::{
    ApiResponse, BotCommand, ChatId, InlineKeyboardMarkup, Message, MessageRef, OutgoingText, ParseMode, Update,
};
use crate::transport::{DocumentUpload, Transport};
use async_trait::async_trait;
use drivebot_asyncutils::into_chunks;
use exn::{OptionExt, ResultExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
/// Size of the pieces the upload body is streamed in.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Connection settings for [`TelegramClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_size: usize,
}
impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            read_timeout: Duration::from_secs(300),
            write_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(60),
            pool_size: 20,
        }
    }
}

#[derive(Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: ChatId,
    message_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct DeleteMessage {
    chat_id: ChatId,
    message_id: i64,
}

#[derive(Serialize)]
struct SendCachedDocument<'a> {
    chat_id: ChatId,
    document: &'a str,
    caption: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
}

#[derive(Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Serialize)]
struct SetMyCommands<'a> {
    commands: &'a [BotCommand],
}

#[derive(Serialize)]
struct DeleteWebhook {
    drop_pending_updates: bool,
}

/// Bot API client.
///
/// All requests share one connection pool. The per-request timeout covers
/// both sending the body and waiting for the answer, so it is the sum of the
/// configured write and read timeouts.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}
impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient").field("api_url", &self.api_url).finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, settings: &ClientSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout + settings.write_timeout)
            .pool_max_idle_per_host(settings.pool_size)
            .build()
            .or_raise(|| ErrorKind::Network("failed to build HTTP client".to_string()))?;
        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn post_json<P, T>(&self, method: &'static str, payload: &P) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            // The URL embeds the bot token; keep it out of the error tree.
            .map_err(reqwest::Error::without_url)
            .or_raise(|| ErrorKind::Network(format!("{method} request failed")))?;
        decode(method, response).await
    }

    async fn post_form<T: DeserializeOwned>(&self, method: &'static str, form: Form) -> Result<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .or_raise(|| ErrorKind::Network(format!("{method} request failed")))?;
        decode(method, response).await
    }
}

/// Unwraps the Bot API envelope. `ok: false` becomes [`ErrorKind::Api`].
async fn decode<T: DeserializeOwned>(method: &'static str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(reqwest::Error::without_url)
        .or_raise(|| ErrorKind::Network(format!("{method} response interrupted")))?;
    let envelope: ApiResponse<T> = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => exn::bail!(ErrorKind::Api {
            code: status.as_u16(),
            description: String::from_utf8_lossy(&body).into_owned(),
        }),
        Err(e) => return Err(e).or_raise(|| ErrorKind::InvalidData("response envelope")),
    };
    unwrap_envelope(envelope, status.as_u16())
}

fn unwrap_envelope<T>(envelope: ApiResponse<T>, status: u16) -> Result<T> {
    if !envelope.ok {
        exn::bail!(ErrorKind::Api {
            code: envelope.error_code.unwrap_or(status),
            description: envelope.description.unwrap_or_default(),
        });
    }
    envelope.result.ok_or_raise(|| ErrorKind::InvalidData("missing result"))
}

fn parse_mode_name(mode: ParseMode) -> &'static str {
    match mode {
        ParseMode::Markdown => "Markdown",
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let payload = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message", "callback_query"],
        };
        self.post_json("getUpdates", &payload).await
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, chat_id: ChatId, text: &OutgoingText) -> Result<Message> {
        let payload = SendMessage {
            chat_id,
            text: &text.text,
            parse_mode: text.parse_mode,
            reply_markup: text.keyboard.as_ref(),
        };
        self.post_json("sendMessage", &payload).await
    }

    async fn edit_message(&self, message: MessageRef, text: &OutgoingText) -> Result<()> {
        let payload = EditMessageText {
            chat_id: message.chat_id,
            message_id: message.message_id,
            text: &text.text,
            parse_mode: text.parse_mode,
            reply_markup: text.keyboard.as_ref(),
        };
        // Answers with the edited message, or `true` for inline messages.
        let _: serde_json::Value = self.post_json("editMessageText", &payload).await?;
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        let payload = DeleteMessage {
            chat_id: message.chat_id,
            message_id: message.message_id,
        };
        let _: bool = self.post_json("deleteMessage", &payload).await?;
        Ok(())
    }

    #[instrument(skip(self, caption))]
    async fn send_cached_document(&self, chat_id: ChatId, handle: &str, caption: &OutgoingText) -> Result<Message> {
        let payload = SendCachedDocument {
            chat_id,
            document: handle,
            caption: &caption.text,
            parse_mode: caption.parse_mode,
        };
        self.post_json("sendDocument", &payload).await
    }

    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, bytes = upload.length))]
    async fn upload_document(&self, chat_id: ChatId, upload: DocumentUpload) -> Result<Message> {
        let DocumentUpload {
            file_name,
            length,
            caption,
            body,
        } = upload;
        let body = Body::wrap_stream(into_chunks(body, UPLOAD_CHUNK_SIZE));
        let part = Part::stream_with_length(body, length).file_name(file_name);
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.text)
            .part("document", part);
        if let Some(mode) = caption.parse_mode {
            form = form.text("parse_mode", parse_mode_name(mode));
        }
        let message: Message = self.post_form("sendDocument", form).await?;
        tracing::debug!(message_id = message.message_id, "Document uploaded");
        Ok(message)
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let payload = AnswerCallbackQuery {
            callback_query_id: callback_id,
            text,
        };
        let _: bool = self.post_json("answerCallbackQuery", &payload).await?;
        Ok(())
    }

    async fn set_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let _: bool = self.post_json("setMyCommands", &SetMyCommands { commands }).await?;
        Ok(())
    }

    async fn drop_pending_updates(&self) -> Result<()> {
        let payload = DeleteWebhook {
            drop_pending_updates: true,
        };
        let _: bool = self.post_json("deleteWebhook", &payload).await?;
        Ok(())
    }
}
