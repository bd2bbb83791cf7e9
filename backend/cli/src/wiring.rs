//! Build the runtime collaborators from a prepared config.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use jtelebot_commands::{BotSettings, CommandRegistry, Services};
use jtelebot_config::{resolve_relative, BotConfig, WaitingBackend};
use jtelebot_core::{AccessLevel, CommandPropertiesStore, CommandWaitingStore, PlatformSink};
use jtelebot_logging::LoggingStats;
use jtelebot_security::AccessPolicy;
use jtelebot_store::{InMemoryChatStore, InMemoryUserStore, InMemoryWaitingStore, SqliteWaitingStore};

/// Apply `commands.disabled` and `commands.levels`. Unknown names are logged and skipped.
pub async fn apply_catalog_overrides(registry: &CommandRegistry, config: &BotConfig) {
    let commands = config.commands();
    for name in &commands.disabled {
        if let Err(e) = registry.set_enabled(name, false).await {
            warn!(command = %name, error = %e, "Ignoring commands.disabled entry");
        }
    }
    for (name, level) in &commands.levels {
        if let Err(e) = registry.set_access_level(name, *level).await {
            warn!(command = %name, error = %e, "Ignoring commands.levels entry");
        }
    }
}

fn waiting_store(config: &BotConfig, config_dir: &Path) -> Result<Arc<dyn CommandWaitingStore>> {
    let waiting = config.waiting();
    let ttl = chrono::Duration::seconds(waiting.ttl_secs.unwrap_or(jtelebot_config::defaults::DEFAULT_WAITING_TTL_SECS) as i64);

    match waiting.backend.unwrap_or_default() {
        WaitingBackend::Memory => Ok(Arc::new(InMemoryWaitingStore::new(ttl))),
        WaitingBackend::Sqlite => {
            let file = waiting
                .sqlite_path
                .unwrap_or_else(|| jtelebot_config::defaults::DEFAULT_SQLITE_FILE.into());
            let path = resolve_relative(config_dir, &file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Arc::new(SqliteWaitingStore::open(&path, ttl)?))
        }
    }
}

/// Collaborators for one bot instance, delivering through `sink`.
pub async fn build_services(config: &BotConfig, config_dir: &Path, sink: Arc<dyn PlatformSink>) -> Result<Services> {
    let bot = config.bot();
    let access = config.access();

    let registry = CommandRegistry::new();
    apply_catalog_overrides(&registry, config).await;

    let settings = BotSettings {
        bot_username: bot.username.unwrap_or_else(|| jtelebot_config::defaults::DEFAULT_USERNAME.to_string()),
        trigger_name: bot.trigger_name.unwrap_or_else(|| jtelebot_config::defaults::DEFAULT_TRIGGER_NAME.to_string()),
        default_user_level: access.default_user_level.unwrap_or(AccessLevel::Newcomer),
    };
    info!(bot = %settings.bot_username, admin_id = ?bot.admin_id, "Bot services configured");

    Ok(Services {
        registry: Arc::new(registry),
        waiting: waiting_store(config, config_dir)?,
        users: Arc::new(InMemoryUserStore::new()),
        chats: Arc::new(InMemoryChatStore::new()),
        stats: Arc::new(LoggingStats::new()),
        sink,
        access: AccessPolicy::new(bot.admin_id, access.default_chat_level.unwrap_or(AccessLevel::Newcomer)),
        settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jtelebot_config::{apply_all_defaults, CommandsSection};

    #[tokio::test]
    async fn test_overrides_disable_and_relevel() {
        let mut config = BotConfig::default();
        config.commands = Some(CommandsSection {
            disabled: vec!["loc".into(), "weather".into()],
            levels: [("export".to_string(), AccessLevel::Trusted)].into_iter().collect(),
        });
        let registry = CommandRegistry::new();
        apply_catalog_overrides(&registry, &config).await;

        assert!(!registry.get_by_name("location").await.unwrap().enabled);
        assert_eq!(registry.get_by_name("export").await.unwrap().access_level, AccessLevel::Trusted);
    }

    #[tokio::test]
    async fn test_memory_backend_by_default() {
        let config = apply_all_defaults(BotConfig::default());
        let store = waiting_store(&config, Path::new("/nonexistent")).unwrap();
        assert!(store.take(1, 1).await.unwrap().is_none());
    }
}
