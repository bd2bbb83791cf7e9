use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::response::FileKind;
use crate::types::{Chat, User};

/// Content-type tag of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Photo,
    Video,
    Audio,
    Voice,
    Document,
    Sticker,
    Reaction,
    /// Inline-button press; `text` carries the callback payload.
    Callback,
}

/// A file the user attached to a message, referenced by platform file id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_id: String,
    pub kind: FileKind,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

/// Normalized chat event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub user: User,
    pub text: Option<String>,
    /// Everything after the command token, filled in by the dispatcher.
    pub command_argument: Option<String>,
    pub kind: MessageKind,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// At most one level deep.
    pub reply_to: Option<Box<Message>>,
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub reactions: u32,
}

impl Message {
    pub fn new(message_id: i64, chat: Chat, user: User) -> Self {
        Self {
            message_id,
            chat,
            user,
            text: None,
            command_argument: None,
            kind: MessageKind::Text,
            attachments: Vec::new(),
            reply_to: None,
            date_time: Utc::now(),
            reactions: 0,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Attach a replied-to message, dropping its own reply so the chain stays one level.
    pub fn with_reply_to(mut self, mut reply: Message) -> Self {
        reply.reply_to = None;
        self.reply_to = Some(Box::new(reply));
        self
    }

    /// Message text, or empty when there is none.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn is_callback(&self) -> bool {
        self.kind == MessageKind::Callback
    }
}

/// One inbound unit of work. Immutable after dispatch; re-entry builds a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRequest {
    message: Message,
}

impl BotRequest {
    pub fn new(message: Message) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    pub fn chat_id(&self) -> i64 {
        self.message.chat.id
    }

    pub fn user_id(&self) -> i64 {
        self.message.user.id
    }

    /// Copy of this request with the text replaced and the parsed argument cleared.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        let mut message = self.message.clone();
        message.text = Some(text.into());
        message.command_argument = None;
        Self { message }
    }

    /// Copy of this request carrying a parsed command argument.
    pub fn with_command_argument(&self, argument: Option<String>) -> Self {
        let mut message = self.message.clone();
        message.command_argument = argument;
        Self { message }
    }
}
