//! Bot API types.
//!
//! Only the fields the bot reads are modelled; everything else in the
//! payloads is ignored on deserialization.

use serde::{Deserialize, Serialize};

pub type ChatId = i64;

/// Language assumed when a user does not report one.
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}
impl User {
    /// Two-letter language code derived from the reported IETF tag
    /// (`"en-US"` becomes `"en"`). Users without one get [`DEFAULT_LANGUAGE`].
    pub fn language(&self) -> &str {
        self.language_code
            .as_deref()
            .and_then(|tag| tag.split('-').next())
            .filter(|code| !code.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Document {
    /// Reusable handle: sending it back delivers the same file without a
    /// new upload.
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}
impl Message {
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat.id,
            message_id: self.message_id,
        }
    }

    /// Splits a bot command into its name and argument text.
    ///
    /// ```
    /// # use drivebot_telegram::{Chat, Message};
    /// let message = Message {
    ///     message_id: 1,
    ///     chat: Chat { id: 7 },
    ///     from: None,
    ///     text: Some("/search@PhysicsBot  Chapter 1 ".to_string()),
    ///     document: None,
    /// };
    /// assert_eq!(message.command(), Some(("search", "Chapter 1")));
    /// ```
    pub fn command(&self) -> Option<(&str, &str)> {
        let text = self.text.as_deref()?.trim_start();
        let rest = text.strip_prefix('/')?;
        let (head, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let name = head.split('@').next().unwrap_or(head);
        if name.is_empty() {
            return None;
        }
        Some((name, args.trim()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Enough to address an existing message for edits and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}
impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}
impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

/// Text for a new message, an edit, or a document caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingText {
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Option<InlineKeyboardMarkup>,
}
impl OutgoingText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            keyboard: None,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::Markdown),
            ..Self::plain(text)
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn user(language_code: Option<&str>) -> User {
        User {
            id: 1,
            first_name: "Ada".to_string(),
            language_code: language_code.map(str::to_string),
        }
    }

    #[rstest]
    #[case(Some("en-US"), "en")]
    #[case(Some("ar"), "ar")]
    #[case(Some("pt-BR"), "pt")]
    #[case(Some(""), "en")]
    #[case(None, "en")]
    fn test_language_prefix(#[case] tag: Option<&str>, #[case] expected: &str) {
        assert_eq!(user(tag).language(), expected);
    }

    #[rstest]
    #[case("/start", Some(("start", "")))]
    #[case("/search Chapter 1", Some(("search", "Chapter 1")))]
    #[case("/search@Bot x", Some(("search", "x")))]
    #[case("hello", None)]
    #[case("/", None)]
    fn test_command_parsing(#[case] text: &str, #[case] expected: Option<(&str, &str)>) {
        let message = Message {
            message_id: 1,
            chat: Chat { id: 1 },
            from: None,
            text: Some(text.to_string()),
            document: None,
        };
        assert_eq!(message.command(), expected);
    }

    #[test]
    fn test_update_deserializes_callback() {
        let json = r#"{
            "update_id": 42,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 9, "is_bot": false, "first_name": "Ada", "language_code": "ar"},
                "message": {"message_id": 5, "chat": {"id": 9, "type": "private"}, "date": 0, "text": "menu"},
                "data": "OPEN|abc"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let query = update.callback_query.unwrap();
        assert_eq!(query.data.as_deref(), Some("OPEN|abc"));
        assert_eq!(query.from.language(), "ar");
        assert_eq!(query.message.unwrap().reference(), MessageRef { chat_id: 9, message_id: 5 });
    }

    #[test]
    fn test_keyboard_serializes_as_bot_api_markup() {
        let markup = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::new("📁 Unit 1", "OPEN|u1")]],
        };
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["inline_keyboard"][0][0]["callback_data"], "OPEN|u1");
    }
}
