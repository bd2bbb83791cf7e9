//! Config validation with field paths in every message.

use crate::schema::{BotConfig, WaitingBackend};
use jtelebot_core::AccessLevel;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &BotConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_bot(config, &mut report);
    validate_access(config, &mut report);
    validate_waiting(config, &mut report);
    validate_logging(config, &mut report);
    validate_commands(config, &mut report);
    report
}

fn validate_bot(config: &BotConfig, report: &mut ValidationReport) {
    let Some(bot) = &config.bot else { return };
    if let Some(username) = &bot.username {
        if username.trim().is_empty() {
            report.error("bot.username", "Username cannot be empty");
        } else if username.chars().any(char::is_whitespace) {
            report.error("bot.username", "Username cannot contain spaces");
        }
    }
    if bot.trigger_name.as_deref().is_some_and(|t| t.trim().is_empty()) {
        report.warn("bot.trigger_name", "Empty trigger name; the bot will never answer passively");
    }
    match bot.admin_id {
        None => report.warn("bot.admin_id", "No admin configured; admin-only commands are unreachable"),
        Some(id) if id <= 0 => report.error("bot.admin_id", "Admin id must be a positive user id"),
        Some(_) => {}
    }
}

fn validate_access(config: &BotConfig, report: &mut ValidationReport) {
    let Some(access) = &config.access else { return };
    if access.default_user_level == Some(AccessLevel::Banned) {
        report.warn("access.default_user_level", "New users start banned; nobody but the admin can use the bot");
    }
    if access.default_chat_level.is_some_and(|l| l >= AccessLevel::Moderator) {
        report.warn("access.default_chat_level", "Every group member gets moderator rights through the chat level");
    }
}

fn validate_waiting(config: &BotConfig, report: &mut ValidationReport) {
    let Some(waiting) = &config.waiting else { return };
    if waiting.ttl_secs == Some(0) {
        report.error("waiting.ttl_secs", "ttl_secs must be > 0");
    }
    if waiting.backend != Some(WaitingBackend::Sqlite) && waiting.sqlite_path.is_some() {
        report.warn("waiting.sqlite_path", "sqlite_path is ignored unless backend is sqlite");
    }
}

fn validate_logging(config: &BotConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            report.error("logging.level", format!("Unknown level '{level}'; expected one of {}", LOG_LEVELS.join(", ")));
        }
    }
}

fn validate_commands(config: &BotConfig, report: &mut ValidationReport) {
    let Some(commands) = &config.commands else { return };
    for (i, name) in commands.disabled.iter().enumerate() {
        if name.trim().is_empty() {
            report.error(format!("commands.disabled[{i}]"), "Command name cannot be empty");
        }
    }
    for name in commands.levels.keys() {
        if name.trim().is_empty() {
            report.error("commands.levels", "Command name cannot be empty");
        }
    }
}
