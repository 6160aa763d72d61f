//! Sink transport for drivebot: the Telegram Bot API.
//!
//! [`Transport`] is the seam the bot talks to. [`TelegramClient`] implements
//! it over HTTPS with `reqwest`, streaming document uploads as multipart
//! bodies, and `MockTransport` (feature `mock`) records calls for tests.

pub mod error;
mod models;
pub mod transport;

pub use crate::models::{
    BotCommand, CallbackQuery, Chat, ChatId, DEFAULT_LANGUAGE, Document, InlineKeyboardButton, InlineKeyboardMarkup,
    Message, MessageRef, OutgoingText, ParseMode, Update, User,
};
#[cfg(feature = "mock")]
pub use crate::transport::{MockTransport, Recorded};
pub use crate::transport::{ClientSettings, DocumentUpload, TelegramClient, Transport, UploadBody};
use std::sync::Arc;

pub type TransportHandle = Arc<dyn Transport + Send + Sync>;
