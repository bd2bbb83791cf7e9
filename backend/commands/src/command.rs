/// Command contract and the context handed to every entry point.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::warn;

use jtelebot_core::{
    AccessLevel, BotError, BotRequest, BotResponse, ChatStore, CommandPropertiesStore,
    CommandWaitingStore, Indicator, PlatformSink, Speech, Stats, UserStore,
};
use jtelebot_security::{AccessPolicy, Caller};

use crate::dispatch::Dispatcher;

/// Re-entrant dispatch (alias expansion) stops at this depth.
pub const MAX_REDISPATCH_DEPTH: u8 = 3;

// ---------------------------------------------------------------------------
// Command trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Command: Send + Sync {
    /// Key linking this implementation to its `CommandProperties`.
    fn identifier(&self) -> &str;

    /// Chat action shown while `parse` runs.
    fn indicator(&self) -> Indicator {
        Indicator::Typing
    }

    /// Passive commands get `analyze` on every message that is not an invocation.
    fn is_passive(&self) -> bool {
        false
    }

    /// Explicit invocation. `Ok(vec![])` means "not applicable".
    async fn parse(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError>;

    /// Passive reaction. Must reject unrelated messages before touching any store.
    async fn analyze(&self, _request: &BotRequest, _ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        Ok(vec![])
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Telegram username of the bot, without `@`.
    pub bot_username: String,
    /// Word that makes the bot talk back in passive mode.
    pub trigger_name: String,
    /// Level given to users seen for the first time.
    pub default_user_level: AccessLevel,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            bot_username: "jtelebot".into(),
            trigger_name: "bot".into(),
            default_user_level: AccessLevel::Newcomer,
        }
    }
}

/// Collaborators shared by the dispatcher and every command.
#[derive(Clone)]
pub struct Services {
    pub registry: Arc<dyn CommandPropertiesStore>,
    pub waiting: Arc<dyn CommandWaitingStore>,
    pub users: Arc<dyn UserStore>,
    pub chats: Arc<dyn ChatStore>,
    pub stats: Arc<dyn Stats>,
    pub sink: Arc<dyn PlatformSink>,
    pub access: AccessPolicy,
    pub settings: BotSettings,
}

// ---------------------------------------------------------------------------
// Per-event state and context
// ---------------------------------------------------------------------------

/// State shared by every command run for one inbound event, re-entrant runs included.
#[derive(Debug)]
pub struct EventState {
    chat_id: i64,
    indicator_sent: AtomicBool,
}

impl EventState {
    pub fn new(chat_id: i64) -> Self {
        Self { chat_id, indicator_sent: AtomicBool::new(false) }
    }

    pub fn indicator_sent(&self) -> bool {
        self.indicator_sent.load(Ordering::Acquire)
    }
}

pub struct CommandContext<'a> {
    services: &'a Services,
    caller: Caller,
    event: &'a EventState,
    dispatcher: &'a Dispatcher,
    depth: u8,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(
        services: &'a Services,
        caller: Caller,
        event: &'a EventState,
        dispatcher: &'a Dispatcher,
        depth: u8,
    ) -> Self {
        Self { services, caller, event, dispatcher, depth }
    }

    pub fn services(&self) -> &Services {
        self.services
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Show a chat action, at most once per inbound event. Failures are logged only.
    pub async fn indicate(&self, indicator: Indicator) {
        if self.event.indicator_sent.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.services.sink.send_indicator(self.event.chat_id, indicator).await {
            warn!(chat_id = self.event.chat_id, error = %e, "Failed to send chat action");
        }
    }

    /// Dispatch a rewritten request as if it had just arrived, without consuming waits.
    pub fn redispatch<'b>(
        &'b self,
        request: BotRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BotResponse>, BotError>> + Send + 'b>> {
        Box::pin(async move {
            if self.depth + 1 >= MAX_REDISPATCH_DEPTH {
                warn!(depth = self.depth, "Re-entrant dispatch depth exceeded");
                return Err(Speech::WrongInput.into());
            }
            Ok(self.dispatcher.route(request, self.event, self.depth + 1).await)
        })
    }
}
