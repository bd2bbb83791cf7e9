/// Command properties registry: the built-in catalog plus runtime enable/disable.
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use jtelebot_core::{AccessLevel, AccessScope, CommandProperties, CommandPropertiesStore};

fn command(
    name: &str,
    aliases: &[&str],
    description: &str,
    level: AccessLevel,
    scope: AccessScope,
    aliasable: bool,
) -> CommandProperties {
    CommandProperties {
        name: name.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        identifier: name.to_string(),
        description: description.to_string(),
        access_level: level,
        access_scope: scope,
        enabled: true,
        aliasable,
    }
}

/// Build the built-in command catalog.
pub fn builtin_commands() -> Vec<CommandProperties> {
    use AccessLevel::*;
    use AccessScope::*;

    vec![
        command("ping", &[], "Check that the bot is alive.", Newcomer, Max, true),
        command("help", &["h"], "Show available commands, or describe one.", Newcomer, Max, true),
        command("echo", &[], "Repeat the given text.", Newcomer, Max, true),
        command("karma", &["k"], "Show karma, or change it: karma @user 1 / -1.", Newcomer, Max, true),
        command("location", &["loc"], "Send a map point: location <lat> <lon>.", Newcomer, Max, true),
        command("alias", &[], "Save and run shortcuts: alias name = text.", Familiar, User, false),
        command("export", &[], "Export your aliases as a file.", Familiar, User, true),
        command("del", &[], "Delete the replied message.", Moderator, User, false),
        command("command", &[], "Enable or disable a command: command on|off <name>.", Admin, User, false),
    ]
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CommandRegistry {
    commands: RwLock<Vec<CommandProperties>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::with_commands(builtin_commands())
    }

    pub fn with_commands(commands: Vec<CommandProperties>) -> Self {
        Self { commands: RwLock::new(commands) }
    }

    /// Register an additional command, replacing one with the same identifier.
    pub async fn register(&self, properties: CommandProperties) {
        let mut commands = self.commands.write().await;
        commands.retain(|c| c.identifier != properties.identifier);
        commands.push(properties);
    }

    pub async fn set_access_level(&self, name: &str, level: AccessLevel) -> Result<CommandProperties> {
        let mut commands = self.commands.write().await;
        let entry = commands
            .iter_mut()
            .find(|c| c.matches(name))
            .ok_or_else(|| anyhow!("unknown command '{name}'"))?;
        entry.access_level = level;
        info!(command = %entry.name, %level, "Command access level changed");
        Ok(entry.clone())
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandPropertiesStore for CommandRegistry {
    async fn get_by_name(&self, name: &str) -> Option<CommandProperties> {
        let name = name.trim_start_matches('/');
        self.commands.read().await.iter().find(|c| c.matches(name)).cloned()
    }

    async fn get_by_identifier(&self, identifier: &str) -> Option<CommandProperties> {
        self.commands.read().await.iter().find(|c| c.identifier == identifier).cloned()
    }

    async fn get_available_for_level(&self, level: AccessLevel) -> Vec<CommandProperties> {
        self.commands
            .read()
            .await
            .iter()
            .filter(|c| c.enabled && c.access_level <= level)
            .cloned()
            .collect()
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<CommandProperties> {
        let mut commands = self.commands.write().await;
        let entry = commands
            .iter_mut()
            .find(|c| c.matches(name))
            .ok_or_else(|| anyhow!("unknown command '{name}'"))?;
        entry.enabled = enabled;
        info!(command = %entry.name, enabled, "Command switched");
        Ok(entry.clone())
    }

    async fn all(&self) -> Vec<CommandProperties> {
        self.commands.read().await.clone()
    }
}
