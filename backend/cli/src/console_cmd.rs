//! `jtelebot console`: chat with the bot over stdin/stdout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info};

use jtelebot_channels::{ChannelAdapter, ConsoleChannel, ConsoleSink};
use jtelebot_commands::{build_default_dispatcher, BotRuntime};
use jtelebot_config::BotConfig;
use jtelebot_core::User;

use crate::wiring::build_services;

const QUEUE_SIZE: usize = 64;

pub struct ConsoleOptions {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
}

pub async fn run(config: &BotConfig, config_dir: &Path, options: ConsoleOptions) -> Result<()> {
    let services = build_services(config, config_dir, Arc::new(ConsoleSink::stdout())).await?;
    let ttl_secs = config.waiting().ttl_secs.unwrap_or(jtelebot_config::defaults::DEFAULT_WAITING_TTL_SECS);
    let runtime = BotRuntime::new(build_default_dispatcher(services)).with_purge_interval(Duration::from_secs(ttl_secs));

    let mut user = User::new(options.user_id);
    if let Some(username) = options.username {
        user = user.with_username(username.trim_start_matches('@'));
    }
    let channel = ConsoleChannel::new(options.chat_id, user);

    let (tx, rx) = mpsc::channel(QUEUE_SIZE);
    let runtime_task = tokio::spawn(async move { runtime.run(rx).await });

    info!(adapter = channel.name(), "Type messages; ':quit' or EOF exits");
    if let Err(e) = channel.start(tx).await {
        error!(error = %e, "Console channel failed");
    }

    runtime_task.await?;
    Ok(())
}
