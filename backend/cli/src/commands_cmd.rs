//! `jtelebot commands`: print the command catalog.

use anyhow::Result;

use jtelebot_commands::CommandRegistry;
use jtelebot_config::BotConfig;
use jtelebot_core::{AccessLevel, CommandPropertiesStore};

use crate::output::render_table;
use crate::wiring::apply_catalog_overrides;

/// List commands visible at `level`, or the whole catalog when `level` is `None`.
pub async fn run(config: &BotConfig, level: Option<AccessLevel>) -> Result<()> {
    let registry = CommandRegistry::new();
    apply_catalog_overrides(&registry, config).await;

    let commands = match level {
        Some(level) => registry.get_available_for_level(level).await,
        None => registry.all().await,
    };

    let rows: Vec<Vec<String>> = commands
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.aliases.join(","),
                c.access_level.to_string(),
                format!("{:?}", c.access_scope).to_lowercase(),
                if c.enabled { "yes".into() } else { "no".into() },
                c.description.clone(),
            ]
        })
        .collect();

    print!("{}", render_table(&["NAME", "ALIASES", "LEVEL", "SCOPE", "ENABLED", "DESCRIPTION"], &rows));
    Ok(())
}
