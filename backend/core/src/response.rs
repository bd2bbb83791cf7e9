use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Text markup the platform should apply. Always explicit, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormattingStyle {
    #[default]
    Plain,
    Markdown,
    Html,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResponseSettings {
    pub formatting_style: FormattingStyle,
    pub disable_notification: bool,
    pub disable_web_page_preview: bool,
}

impl ResponseSettings {
    pub fn with_style(style: FormattingStyle) -> Self {
        Self { formatting_style: style, ..Default::default() }
    }
}

/// Chat action shown while a command works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    #[default]
    Typing,
    UploadPhoto,
    UploadDocument,
    UploadVideo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Photo,
    Document,
    Video,
    Audio,
    Voice,
    Sticker,
}

impl FileKind {
    pub fn indicator(self) -> Indicator {
        match self {
            FileKind::Photo | FileKind::Sticker => Indicator::UploadPhoto,
            FileKind::Video => Indicator::UploadVideo,
            FileKind::Document | FileKind::Audio | FileKind::Voice => Indicator::UploadDocument,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FileSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub source: FileSource,
    pub kind: FileKind,
    pub caption: Option<String>,
}

impl File {
    pub fn new(name: impl Into<String>, source: FileSource, kind: FileKind) -> Self {
        Self { name: name.into(), source, kind, caption: None }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextResponse {
    pub chat_id: i64,
    pub reply_to_message_id: Option<i64>,
    pub text: String,
    pub settings: ResponseSettings,
}

impl TextResponse {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            reply_to_message_id: None,
            text: text.into(),
            settings: ResponseSettings::default(),
        }
    }

    /// Reply in the message's chat, quoting the message.
    pub fn reply_to(message: &Message, text: impl Into<String>) -> Self {
        Self {
            reply_to_message_id: Some(message.message_id),
            ..Self::new(message.chat.id, text)
        }
    }

    pub fn with_style(mut self, style: FormattingStyle) -> Self {
        self.settings.formatting_style = style;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResponse {
    pub chat_id: i64,
    pub reply_to_message_id: Option<i64>,
    /// Sent in order; more than one photo is delivered as a group.
    pub files: Vec<File>,
    pub settings: ResponseSettings,
}

impl FileResponse {
    pub fn reply_to(message: &Message, files: Vec<File>) -> Self {
        Self {
            chat_id: message.chat.id,
            reply_to_message_id: Some(message.message_id),
            files,
            settings: ResponseSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub chat_id: i64,
    pub reply_to_message_id: Option<i64>,
    pub message_id: i64,
    pub settings: ResponseSettings,
}

impl DeleteResponse {
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self { chat_id, reply_to_message_id: None, message_id, settings: ResponseSettings::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationResponse {
    pub chat_id: i64,
    pub reply_to_message_id: Option<i64>,
    pub latitude: f64,
    pub longitude: f64,
    pub settings: ResponseSettings,
}

impl LocationResponse {
    pub fn reply_to(message: &Message, latitude: f64, longitude: f64) -> Self {
        Self {
            chat_id: message.chat.id,
            reply_to_message_id: Some(message.message_id),
            latitude,
            longitude,
            settings: ResponseSettings::default(),
        }
    }
}

/// Platform-independent outbound unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BotResponse {
    Text(TextResponse),
    File(FileResponse),
    Delete(DeleteResponse),
    Location(LocationResponse),
}

impl BotResponse {
    pub fn chat_id(&self) -> i64 {
        match self {
            BotResponse::Text(r) => r.chat_id,
            BotResponse::File(r) => r.chat_id,
            BotResponse::Delete(r) => r.chat_id,
            BotResponse::Location(r) => r.chat_id,
        }
    }

    pub fn reply_to_message_id(&self) -> Option<i64> {
        match self {
            BotResponse::Text(r) => r.reply_to_message_id,
            BotResponse::File(r) => r.reply_to_message_id,
            BotResponse::Delete(r) => r.reply_to_message_id,
            BotResponse::Location(r) => r.reply_to_message_id,
        }
    }

    pub fn settings(&self) -> &ResponseSettings {
        match self {
            BotResponse::Text(r) => &r.settings,
            BotResponse::File(r) => &r.settings,
            BotResponse::Delete(r) => &r.settings,
            BotResponse::Location(r) => &r.settings,
        }
    }

    /// Indicator matching what this response uploads.
    pub fn indicator(&self) -> Indicator {
        match self {
            BotResponse::File(r) => {
                r.files.first().map(|f| f.kind.indicator()).unwrap_or_default()
            }
            _ => Indicator::Typing,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BotResponse::Text(r) => Some(&r.text),
            _ => None,
        }
    }
}

impl From<TextResponse> for BotResponse {
    fn from(r: TextResponse) -> Self {
        BotResponse::Text(r)
    }
}

impl From<FileResponse> for BotResponse {
    fn from(r: FileResponse) -> Self {
        BotResponse::File(r)
    }
}

impl From<DeleteResponse> for BotResponse {
    fn from(r: DeleteResponse) -> Self {
        BotResponse::Delete(r)
    }
}

impl From<LocationResponse> for BotResponse {
    fn from(r: LocationResponse) -> Self {
        BotResponse::Location(r)
    }
}
