//! Recording fakes and a wired dispatcher for tests.
use std::error::Error;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use jtelebot_core::{
    AccessLevel, BotError, BotRequest, BotResponse, Chat, CommandProperties, Indicator, Message, PlatformSink,
    Stats, User, UserStore,
};
use jtelebot_security::{AccessPolicy, Caller};
use jtelebot_store::{InMemoryChatStore, InMemoryUserStore, InMemoryWaitingStore};

use crate::command::{BotSettings, Command, CommandContext, EventState, Services};
use crate::detection::detect_command;
use crate::dispatch::Dispatcher;
use crate::handlers::builtin_handlers;
use crate::registry::CommandRegistry;

pub const ADMIN_ID: i64 = 1;
pub const GROUP_ID: i64 = -100;

#[derive(Default)]
pub struct RecordingSink {
    pub indicators: Mutex<Vec<(i64, Indicator)>>,
    pub delivered: Mutex<Vec<BotResponse>>,
}

impl RecordingSink {
    pub fn indicator_count(&self) -> usize {
        self.indicators.lock().unwrap().len()
    }
}

#[async_trait]
impl PlatformSink for RecordingSink {
    async fn send_indicator(&self, chat_id: i64, indicator: Indicator) -> Result<()> {
        self.indicators.lock().unwrap().push((chat_id, indicator));
        Ok(())
    }

    async fn deliver(&self, response: &BotResponse) -> Result<()> {
        self.delivered.lock().unwrap().push(response.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingStats {
    pub errors: AtomicUsize,
    pub notes: Mutex<Vec<String>>,
}

impl CountingStats {
    pub fn count(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

impl Stats for CountingStats {
    fn increment_errors(&self, _request: &BotRequest, _error: &(dyn Error + 'static), note: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.notes.lock().unwrap().push(note.to_string());
    }
}

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub sink: Arc<RecordingSink>,
    pub stats: Arc<CountingStats>,
    pub registry: Arc<CommandRegistry>,
    pub users: Arc<InMemoryUserStore>,
    pub waiting: Arc<InMemoryWaitingStore>,
    next_message_id: AtomicI64,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_commands(vec![]).await
    }

    /// Built-in commands plus `extra` (properties registered in the catalog too).
    pub async fn with_commands(extra: Vec<(CommandProperties, Arc<dyn Command>)>) -> Self {
        Self::build(extra, AccessPolicy::new(Some(ADMIN_ID), AccessLevel::Newcomer)).await
    }

    /// Built-in commands under a custom access policy.
    pub async fn with_access(access: AccessPolicy) -> Self {
        Self::build(vec![], access).await
    }

    async fn build(extra: Vec<(CommandProperties, Arc<dyn Command>)>, access: AccessPolicy) -> Self {
        let sink = Arc::new(RecordingSink::default());
        let stats = Arc::new(CountingStats::default());
        let registry = Arc::new(CommandRegistry::new());
        let users = Arc::new(InMemoryUserStore::new());
        let waiting = Arc::new(InMemoryWaitingStore::new(chrono::Duration::minutes(5)));

        let services = Services {
            registry: registry.clone(),
            waiting: waiting.clone(),
            users: users.clone(),
            chats: Arc::new(InMemoryChatStore::new()),
            stats: stats.clone(),
            sink: sink.clone(),
            access,
            settings: BotSettings::default(),
        };

        let mut dispatcher = Dispatcher::new(services);
        for command in builtin_handlers() {
            dispatcher.register(command);
        }
        for (properties, command) in extra {
            registry.register(properties).await;
            dispatcher.register(command);
        }

        Self {
            dispatcher: Arc::new(dispatcher),
            sink,
            stats,
            registry,
            users,
            waiting,
            next_message_id: AtomicI64::new(1),
        }
    }

    pub fn message(&self, chat_id: i64, user_id: i64, text: &str) -> Message {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        let user = User::new(user_id).with_username(format!("user{user_id}"));
        Message::new(id, Chat::new(chat_id), user).with_text(text)
    }

    pub async fn send(&self, chat_id: i64, user_id: i64, text: &str) -> Vec<BotResponse> {
        self.dispatcher.handle(BotRequest::new(self.message(chat_id, user_id, text))).await
    }

    pub async fn send_message(&self, message: Message) -> Vec<BotResponse> {
        self.dispatcher.handle(BotRequest::new(message)).await
    }

    /// Call the detected command's `parse` directly, without error conversion.
    pub async fn parse(&self, chat_id: i64, user_id: i64, text: &str) -> Result<Vec<BotResponse>, BotError> {
        let services = self.dispatcher.services();
        let invocation = detect_command(text, services.registry.as_ref(), &services.settings.bot_username)
            .await
            .expect("text is not an invocation");
        let command = self.dispatcher.command(&invocation.properties.identifier).expect("no implementation");
        let user_level = self.users.get_access_level(user_id).await.unwrap().unwrap_or_default();
        let caller = Caller { user_id, chat_id, user_level, chat_level: None };
        let event = EventState::new(chat_id);
        let ctx = CommandContext::new(services, caller, &event, self.dispatcher.as_ref(), 0);
        let request = BotRequest::new(self.message(chat_id, user_id, text)).with_command_argument(invocation.argument);
        command.parse(&request, &ctx).await
    }

    pub async fn set_level(&self, user_id: i64, level: AccessLevel) {
        let user = User { access_level: level, ..User::new(user_id).with_username(format!("user{user_id}")) };
        self.users.save(&user).await.unwrap();
    }
}

pub fn texts(responses: &[BotResponse]) -> Vec<&str> {
    responses.iter().filter_map(BotResponse::as_text).collect()
}
