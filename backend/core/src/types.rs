use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Permission tier attached to users and chats. Declaration order is rank order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Banned,
    #[default]
    Newcomer,
    Familiar,
    Trusted,
    Moderator,
    Admin,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 6] = [
        AccessLevel::Banned,
        AccessLevel::Newcomer,
        AccessLevel::Familiar,
        AccessLevel::Trusted,
        AccessLevel::Moderator,
        AccessLevel::Admin,
    ];

    /// Numeric value as stored by persistence backends.
    pub fn value(self) -> i32 {
        match self {
            AccessLevel::Banned => -1,
            AccessLevel::Newcomer => 0,
            AccessLevel::Familiar => 1,
            AccessLevel::Trusted => 5,
            AccessLevel::Moderator => 7,
            AccessLevel::Admin => 10,
        }
    }

    /// Highest level whose value does not exceed `value`.
    pub fn from_value(value: i32) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|level| level.value() <= value)
            .unwrap_or(AccessLevel::Banned)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Banned => "banned",
            AccessLevel::Newcomer => "newcomer",
            AccessLevel::Familiar => "familiar",
            AccessLevel::Trusted => "trusted",
            AccessLevel::Moderator => "moderator",
            AccessLevel::Admin => "admin",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if let Ok(value) = lower.parse::<i32>() {
            return Ok(AccessLevel::from_value(value));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == lower)
            .ok_or_else(|| format!("unknown access level '{s}'"))
    }
}

/// Which levels a command compares against its required level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessScope {
    /// Only the caller's own level.
    User,
    /// Only the chat's level (the caller's level in private chats).
    Chat,
    /// The higher of the two.
    #[default]
    Max,
}

/// A chat. Negative ids are groups, positive ids are private conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: Option<String>,
    /// Explicit override; `None` means the configured default applies.
    pub access_level: Option<AccessLevel>,
}

impl Chat {
    pub fn new(id: i64) -> Self {
        Self { id, title: None, access_level: None }
    }

    pub fn is_private(&self) -> bool {
        self.id > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
}

impl User {
    pub fn new(id: i64) -> Self {
        Self { id, username: None, first_name: None, access_level: AccessLevel::default() }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// How the user is referred to in replies.
    pub fn mention(&self) -> String {
        match (&self.username, &self.first_name) {
            (Some(username), _) => format!("@{username}"),
            (None, Some(name)) => name.clone(),
            (None, None) => format!("user {}", self.id),
        }
    }
}

/// Catalog row describing one registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandProperties {
    /// Token users type, lowercase (e.g. "karma").
    pub name: String,
    /// Additional tokens resolving to the same command.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Key of the implementation in the dispatcher.
    pub identifier: String,
    pub description: String,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub access_scope: AccessScope,
    pub enabled: bool,
    /// Whether user-defined aliases may expand to this command.
    pub aliasable: bool,
}

impl CommandProperties {
    pub fn matches(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.name == token || self.aliases.iter().any(|a| *a == token)
    }
}

/// A pending follow-up: the next message from (chat, user) feeds this command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandWaiting {
    pub chat_id: i64,
    pub user_id: i64,
    pub command_identifier: String,
    /// Argument text typed before the bot asked for more.
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CommandWaiting {
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at > ttl
    }
}
