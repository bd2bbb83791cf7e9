/// Access policy: decides whether a caller may run a command.
///
/// The shared primitive is a single rank comparison; what gets compared is chosen
/// per command through its `AccessScope`.
use jtelebot_core::{AccessLevel, AccessScope, CommandProperties};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `true` when `effective` ranks at least as high as `required`.
pub fn has_access(effective: AccessLevel, required: AccessLevel) -> bool {
    effective >= required
}

/// The levels known about the sender of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub chat_id: i64,
    pub user_level: AccessLevel,
    /// The chat's explicit override; the policy default applies when `None`.
    pub chat_level: Option<AccessLevel>,
}

impl Caller {
    pub fn is_private_chat(&self) -> bool {
        self.chat_id > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted { effective: AccessLevel },
    Denied { effective: AccessLevel, required: AccessLevel },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// The bot owner. Always resolves to `Admin`, whatever the stores say.
    pub admin_id: Option<i64>,
    /// Level of group chats that have no explicit override.
    pub default_chat_level: AccessLevel,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self { admin_id: None, default_chat_level: AccessLevel::Newcomer }
    }
}

impl AccessPolicy {
    pub fn new(admin_id: Option<i64>, default_chat_level: AccessLevel) -> Self {
        Self { admin_id, default_chat_level }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id == Some(user_id)
    }

    /// The caller's own level, with the admin override applied.
    pub fn user_level(&self, caller: &Caller) -> AccessLevel {
        if self.is_admin(caller.user_id) {
            AccessLevel::Admin
        } else {
            caller.user_level
        }
    }

    /// The chat's level. Private chats take the caller's level.
    pub fn chat_level(&self, caller: &Caller) -> AccessLevel {
        if caller.is_private_chat() {
            return self.user_level(caller);
        }
        caller.chat_level.unwrap_or(self.default_chat_level)
    }

    pub fn effective_level(&self, scope: AccessScope, caller: &Caller) -> AccessLevel {
        let user = self.user_level(caller);
        match scope {
            AccessScope::User => user,
            AccessScope::Chat => self.chat_level(caller),
            AccessScope::Max => user.max(self.chat_level(caller)),
        }
    }

    /// Decide for a command. Banned users are refused everything; the admin is
    /// refused nothing.
    pub fn check(&self, properties: &CommandProperties, caller: &Caller) -> AccessDecision {
        let required = properties.access_level;
        if self.is_admin(caller.user_id) {
            return AccessDecision::Granted { effective: AccessLevel::Admin };
        }
        let effective = self.effective_level(properties.access_scope, caller);
        if caller.user_level == AccessLevel::Banned || !has_access(effective, required) {
            debug!(
                command = %properties.name,
                user_id = caller.user_id,
                chat_id = caller.chat_id,
                %effective,
                %required,
                "Access denied"
            );
            return AccessDecision::Denied { effective, required };
        }
        AccessDecision::Granted { effective }
    }
}
