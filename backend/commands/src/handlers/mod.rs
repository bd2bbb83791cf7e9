//! Built-in commands that need no external service.

pub mod alias;
pub mod echo;
pub mod export;
pub mod help;
pub mod karma;
pub mod location;
pub mod moderation;

use std::sync::Arc;

pub use alias::{AliasBook, AliasHandler};
pub use echo::EchoHandler;
pub use export::ExportHandler;
pub use help::{HelpHandler, PingHandler};
pub use karma::{KarmaHandler, KarmaLedger};
pub use location::LocationHandler;
pub use moderation::{CommandSwitchHandler, DeleteHandler};

use crate::command::Command;

/// Every built-in implementation, in registration order.
///
/// Passive commands run in this order too, so karma votes come before echo replies.
pub fn builtin_handlers() -> Vec<Arc<dyn Command>> {
    let aliases = Arc::new(AliasBook::new());
    let karma = Arc::new(KarmaLedger::new());

    vec![
        Arc::new(PingHandler),
        Arc::new(HelpHandler),
        Arc::new(KarmaHandler::new(karma)),
        Arc::new(EchoHandler),
        Arc::new(LocationHandler),
        Arc::new(AliasHandler::new(aliases.clone())),
        Arc::new(ExportHandler::new(aliases)),
        Arc::new(DeleteHandler),
        Arc::new(CommandSwitchHandler),
    ]
}
