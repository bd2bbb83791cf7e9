//! jtelebot runtime configuration schema.
//!
//! Every section is optional in the file; `defaults::apply_all_defaults` fills
//! in whatever is missing after load.

use jtelebot_core::AccessLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct BotConfig {
    /// Bot identity and owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<BotSection>,

    /// Access level defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessSection>,

    /// Command waiting store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting: Option<WaitingSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSection>,

    /// Catalog overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<CommandsSection>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotSection {
    /// Telegram username, without `@`. Used to accept `/cmd@username`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Word that makes the bot answer passively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_name: Option<String>,

    /// User id that always has `admin` level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessSection {
    /// Level of group chats without an explicit override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_chat_level: Option<AccessLevel>,

    /// Level given to users on first contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_user_level: Option<AccessLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitingBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaitingSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<WaitingBackend>,

    /// Database file for the `sqlite` backend. Relative paths resolve against
    /// the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,

    /// Seconds after which a pending wait is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    /// trace | debug | info | warn | error. `RUST_LOG` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for daily JSON log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandsSection {
    /// Commands switched off at startup, by name or alias.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,

    /// Required level overrides, by command name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub levels: HashMap<String, AccessLevel>,
}

// ---------------------------------------------------------------------------
// Accessors (valid after defaults are applied)
// ---------------------------------------------------------------------------

impl BotConfig {
    pub fn bot(&self) -> BotSection {
        self.bot.clone().unwrap_or_default()
    }

    pub fn access(&self) -> AccessSection {
        self.access.clone().unwrap_or_default()
    }

    pub fn waiting(&self) -> WaitingSection {
        self.waiting.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }

    pub fn commands(&self) -> CommandsSection {
        self.commands.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
bot:
  username: jtelebot
  trigger_name: bot
  admin_id: 42
access:
  default_chat_level: familiar
waiting:
  backend: sqlite
  ttl_secs: 300
commands:
  disabled: [location]
  levels:
    export: trusted
"#;
        let config: BotConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bot().admin_id, Some(42));
        assert_eq!(config.access().default_chat_level, Some(AccessLevel::Familiar));
        assert_eq!(config.waiting().backend, Some(WaitingBackend::Sqlite));
        assert_eq!(config.commands().disabled, vec!["location"]);
        assert_eq!(config.commands().levels["export"], AccessLevel::Trusted);
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(serde_yaml::from_str::<BotConfig>("gateway:\n  port: 1\n").is_err());
    }
}
