use async_trait::async_trait;
use jtelebot_core::BotRequest;
use tokio::sync::mpsc;

pub mod console;
pub use console::{render, ConsoleChannel, ConsoleSink};

/// All channel adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Run the adapter's receive loop, forwarding normalized requests to the runtime.
    async fn start(&self, tx: mpsc::Sender<BotRequest>) -> anyhow::Result<()>;
}
