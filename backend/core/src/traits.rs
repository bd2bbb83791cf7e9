use std::error::Error;

use anyhow::Result;
use async_trait::async_trait;

use crate::message::{BotRequest, Message};
use crate::response::{BotResponse, Indicator};
use crate::types::{AccessLevel, Chat, CommandProperties, CommandWaiting, User};

/// Outbound side of the messaging platform.
///
/// The adapter behind this trait turns normalized responses into real API calls.
#[async_trait]
pub trait PlatformSink: Send + Sync {
    /// Show a chat action such as "typing…" in the given chat.
    async fn send_indicator(&self, chat_id: i64, indicator: Indicator) -> Result<()>;

    /// Deliver one response.
    async fn deliver(&self, response: &BotResponse) -> Result<()>;
}

/// Read-mostly catalog of command metadata.
#[async_trait]
pub trait CommandPropertiesStore: Send + Sync {
    /// Look up by typed token: the command name or one of its aliases.
    async fn get_by_name(&self, name: &str) -> Option<CommandProperties>;

    async fn get_by_identifier(&self, identifier: &str) -> Option<CommandProperties>;

    /// Enabled commands whose required level is at most `level`.
    async fn get_available_for_level(&self, level: AccessLevel) -> Vec<CommandProperties>;

    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<CommandProperties>;

    async fn all(&self) -> Vec<CommandProperties>;
}

/// Pending follow-ups keyed by (chat, user). At most one entry per key.
#[async_trait]
pub trait CommandWaitingStore: Send + Sync {
    /// Remember that the next message from the message's chat and user belongs to
    /// `command_identifier`. Replaces any existing entry for that key.
    async fn add(&self, message: &Message, command_identifier: &str) -> Result<()>;

    /// Remove and return the entry for (chat, user). Expired entries are removed
    /// and reported as absent. Two concurrent calls never both get the entry.
    async fn take(&self, chat_id: i64, user_id: i64) -> Result<Option<CommandWaiting>>;

    /// Drop every expired entry, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<User>>;

    /// Case-insensitive; a leading `@` is ignored.
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get_access_level(&self, id: i64) -> Result<Option<AccessLevel>>;

    async fn save(&self, user: &User) -> Result<()>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Chat>>;

    /// The chat's explicit override, if any.
    async fn get_access_level(&self, id: i64) -> Result<Option<AccessLevel>>;

    async fn save(&self, chat: &Chat) -> Result<()>;
}

/// Error reporting collaborator. Fire-and-forget: implementations must not panic
/// and have no way to fail back into the caller.
pub trait Stats: Send + Sync {
    fn increment_errors(&self, request: &BotRequest, error: &(dyn Error + 'static), note: &str);
}
