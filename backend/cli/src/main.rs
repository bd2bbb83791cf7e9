mod check_cmd;
mod commands_cmd;
mod console_cmd;
mod output;
mod wiring;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use jtelebot_config::{config_dir, config_file_path, load_and_prepare, BotConfig};
use jtelebot_core::AccessLevel;
use jtelebot_logging::init_logger;

use console_cmd::ConsoleOptions;

#[derive(Parser)]
#[command(name = "jtelebot")]
#[command(about = "jtelebot: command-driven chat bot")]
#[command(version)]
struct Cli {
    /// Config file (default: $JTELEBOT_CONFIG_DIR/config.yaml or ~/.jtelebot/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the bot on stdin/stdout
    Console {
        /// Chat id; negative for a group chat
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        chat_id: i64,
        /// Sender user id
        #[arg(long, default_value_t = 1)]
        user_id: i64,
        /// Sender username, with or without '@'
        #[arg(long)]
        username: Option<String>,
    },
    /// List the command catalog
    Commands {
        /// Only commands available at this level (name or number)
        #[arg(long)]
        level: Option<AccessLevel>,
    },
    /// Validate the config file
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (dir, path) = match cli.config {
        Some(path) => (path.parent().map(PathBuf::from).unwrap_or_default(), path),
        None => {
            let dir = config_dir();
            let path = config_file_path(&dir);
            (dir, path)
        }
    };

    match cli.command {
        Commands::CheckConfig => {
            init_logger(None, "warn");
            if !check_cmd::run(&path).await? {
                std::process::exit(1);
            }
        }
        Commands::Console { chat_id, user_id, username } => {
            let config = prepare(&path).await?;
            console_cmd::run(&config, &dir, ConsoleOptions { chat_id, user_id, username }).await?;
        }
        Commands::Commands { level } => {
            let config = prepare(&path).await?;
            commands_cmd::run(&config, level).await?;
        }
    }

    Ok(())
}

/// Load the config and install the logger it describes.
async fn prepare(path: &Path) -> Result<BotConfig> {
    let config = load_and_prepare(path).await?;
    let logging = config.logging();
    init_logger(logging.dir.as_deref(), logging.level.as_deref().unwrap_or("info"));
    Ok(config)
}
