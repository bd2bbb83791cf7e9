//! Config file location and loading.

use crate::env::resolve_env_vars;
use crate::schema::BotConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the jtelebot config directory.
/// Priority: `JTELEBOT_CONFIG_DIR` env > `~/.jtelebot/` > `./.jtelebot`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("JTELEBOT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".jtelebot"),
        None => PathBuf::from(".jtelebot"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the YAML file as a generic value tree. A missing file is an empty config.
pub async fn read_config_value(path: &Path) -> Result<Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    serde_yaml::from_str(&raw).with_context(|| format!("Failed to parse config YAML at: {}", path.display()))
}

/// Load the config with `${VAR}` references resolved. Defaults are not applied.
pub async fn load_config(path: &Path) -> Result<BotConfig> {
    let value = read_config_value(path).await?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: BotConfig = serde_json::from_value(value)
        .with_context(|| format!("Invalid config at: {}", path.display()))?;
    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Resolve a config-relative path (such as the SQLite file) against the config directory.
pub fn resolve_relative(config_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jtelebot-config-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_config() {
        let dir = scratch_dir("missing");
        let config = load_config(&config_file_path(&dir)).await.unwrap();
        assert!(config.bot.is_none());
    }

    #[tokio::test]
    async fn test_load_yaml_file() {
        let dir = scratch_dir("load");
        let path = config_file_path(&dir);
        fs::write(&path, "bot:\n  username: testbot\n  admin_id: 7\n").await.unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.bot().username.as_deref(), Some("testbot"));
        assert_eq!(config.bot().admin_id, Some(7));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_invalid_yaml_reports_path() {
        let dir = scratch_dir("invalid");
        let path = config_file_path(&dir);
        fs::write(&path, "bot: [unclosed\n").await.unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("config.yaml"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_resolve_relative() {
        let dir = Path::new("/etc/jtelebot");
        assert_eq!(resolve_relative(dir, Path::new("waiting.db")), PathBuf::from("/etc/jtelebot/waiting.db"));
        assert_eq!(resolve_relative(dir, Path::new("/var/db")), PathBuf::from("/var/db"));
    }
}
