use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-facing message tags. Rendered with a default English text since the
/// localized catalog lives outside the bot core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speech {
    FoundNothing,
    WrongInput,
    NoResponse,
    Saved,
    Deleted,
    Enabled,
    Disabled,
    InternalError,
}

impl Speech {
    pub fn text(self) -> &'static str {
        match self {
            Speech::FoundNothing => "Found nothing",
            Speech::WrongInput => "Wrong input",
            Speech::NoResponse => "No response from the service",
            Speech::Saved => "Saved",
            Speech::Deleted => "Deleted",
            Speech::Enabled => "Enabled",
            Speech::Disabled => "Disabled",
            Speech::InternalError => "Something went wrong. The error has been reported",
        }
    }
}

impl fmt::Display for Speech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Error returned by command entry points.
///
/// `Speech` and `Message` are expected user-input failures and are shown to the
/// caller as-is. `Internal` covers everything else: it is reported to stats and
/// replaced with a generic reply.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("{0}")]
    Speech(Speech),

    #[error("{0}")]
    Message(String),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl BotError {
    pub fn message(text: impl Into<String>) -> Self {
        BotError::Message(text.into())
    }

    /// Text to show the user, or `None` for internal failures.
    pub fn user_message(&self) -> Option<String> {
        match self {
            BotError::Speech(speech) => Some(speech.text().to_string()),
            BotError::Message(text) => Some(text.clone()),
            BotError::Internal(_) => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, BotError::Internal(_))
    }

    pub fn speech(&self) -> Option<Speech> {
        match self {
            BotError::Speech(speech) => Some(*speech),
            _ => None,
        }
    }
}

impl From<Speech> for BotError {
    fn from(speech: Speech) -> Self {
        BotError::Speech(speech)
    }
}
