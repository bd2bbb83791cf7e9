//! Config defaults: fills every optional field after load.

use crate::schema::{
    AccessSection, BotConfig, BotSection, CommandsSection, LoggingSection, WaitingBackend,
    WaitingSection,
};
use jtelebot_core::AccessLevel;

pub const DEFAULT_USERNAME: &str = "jtelebot";
pub const DEFAULT_TRIGGER_NAME: &str = "bot";
pub const DEFAULT_WAITING_TTL_SECS: u64 = 600;
pub const DEFAULT_SQLITE_FILE: &str = "waiting.db";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn apply_all_defaults(mut config: BotConfig) -> BotConfig {
    let bot = config.bot.get_or_insert_with(BotSection::default);
    bot.username.get_or_insert_with(|| DEFAULT_USERNAME.to_string());
    bot.trigger_name.get_or_insert_with(|| DEFAULT_TRIGGER_NAME.to_string());
    if let Some(username) = &mut bot.username {
        *username = username.trim_start_matches('@').to_string();
    }

    let access = config.access.get_or_insert_with(AccessSection::default);
    access.default_chat_level.get_or_insert(AccessLevel::Newcomer);
    access.default_user_level.get_or_insert(AccessLevel::Newcomer);

    let waiting = config.waiting.get_or_insert_with(WaitingSection::default);
    let backend = *waiting.backend.get_or_insert(WaitingBackend::Memory);
    waiting.ttl_secs.get_or_insert(DEFAULT_WAITING_TTL_SECS);
    if backend == WaitingBackend::Sqlite {
        waiting.sqlite_path.get_or_insert_with(|| DEFAULT_SQLITE_FILE.into());
    }

    let logging = config.logging.get_or_insert_with(LoggingSection::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());

    config.commands.get_or_insert_with(CommandsSection::default);
    config
}
