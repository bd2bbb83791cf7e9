pub mod command;
pub mod detection;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod runtime;
pub mod types;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use command::{BotSettings, Command, CommandContext, EventState, MAX_REDISPATCH_DEPTH, Services};
pub use detection::{cut_command_in_text, detect_command, parse_command_token};
pub use dispatch::Dispatcher;
pub use handlers::builtin_handlers;
pub use registry::{builtin_commands, CommandRegistry};
pub use runtime::BotRuntime;
pub use types::{CommandInvocation, CommandToken};

/// Build a dispatcher pre-wired with all built-in handlers.
pub fn build_default_dispatcher(services: Services) -> Arc<Dispatcher> {
    let mut dispatcher = Dispatcher::new(services);
    for command in builtin_handlers() {
        dispatcher.register(command);
    }
    Arc::new(dispatcher)
}
