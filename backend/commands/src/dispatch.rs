/// Command dispatch: route one inbound event to explicit, waiting or passive handlers.
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, warn};

use jtelebot_core::{
    BotError, BotRequest, BotResponse, Chat, CommandProperties, CommandWaiting,
    Speech, TextResponse, User,
};
use jtelebot_logging::{DispatchEvent, EventLogger};
use jtelebot_security::{AccessDecision, Caller};

use crate::command::{Command, CommandContext, EventState, Services};
use crate::detection::detect_command;

#[derive(Debug, Clone, Copy)]
enum Mode {
    Parse,
    Analyze,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Parse => "parse",
            Mode::Analyze => "analyze",
        }
    }
}

/// How an invocation reached the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    /// `/name`, a wait continuation or a re-entrant run. Rejected input is replied to.
    Explicit,
    /// A bare leading word. Rejected or empty output means it was ordinary chat.
    Bare,
}

pub struct Dispatcher {
    services: Services,
    commands: HashMap<String, Arc<dyn Command>>,
    /// Passive commands in registration order.
    passive: Vec<Arc<dyn Command>>,
}

impl Dispatcher {
    pub fn new(services: Services) -> Self {
        Self { services, commands: HashMap::new(), passive: Vec::new() }
    }

    /// Register an implementation under its identifier. Re-registering replaces it.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        let identifier = command.identifier().to_string();
        self.passive.retain(|c| c.identifier() != identifier);
        if command.is_passive() {
            self.passive.push(command.clone());
        }
        self.commands.insert(identifier, command);
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn command(&self, identifier: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(identifier)
    }

    /// Handle one inbound event and return its responses in delivery order.
    pub async fn handle(&self, request: BotRequest) -> Vec<BotResponse> {
        let event = EventState::new(request.chat_id());
        self.route(request, &event, 0).await
    }

    /// Handle one inbound event and deliver its responses through the sink, in order.
    pub async fn handle_and_deliver(&self, request: BotRequest) {
        let chat_id = request.chat_id();
        let responses = self.handle(request).await;
        for response in &responses {
            if let Err(e) = self.services.sink.deliver(response).await {
                warn!(chat_id, error = %e, "Failed to deliver response");
            }
        }
    }

    pub(crate) async fn route(&self, request: BotRequest, event: &EventState, depth: u8) -> Vec<BotResponse> {
        let caller = self.resolve_caller(&request).await;
        let ctx = CommandContext::new(&self.services, caller, event, self, depth);

        let waiting = if depth == 0 { self.take_waiting(&request).await } else { None };
        let text = request.message().text_or_empty().to_string();

        let detected = detect_command(&text, self.services.registry.as_ref(), &self.services.settings.bot_username)
            .await
            // Aliases need the slash, except in re-entrant runs.
            .filter(|invocation| invocation.slash || !invocation.by_alias || depth > 0);
        if let Some(invocation) = detected {
            let form = if invocation.slash || depth > 0 { Form::Explicit } else { Form::Bare };
            if let Some(responses) = self.invoke(&invocation.properties, &request, invocation.argument, &ctx, form).await {
                if let Some(waiting) = &waiting {
                    EventLogger::log_event(
                        request.chat_id(),
                        request.user_id(),
                        DispatchEvent::WaitConsumed { command: waiting.command_identifier.clone(), used: false },
                    );
                }
                return responses;
            }
            debug!(command = %invocation.properties.name, "Bare word is not an invocation");
        }

        if let Some(waiting) = waiting {
            if let Some(properties) = self.services.registry.get_by_identifier(&waiting.command_identifier).await {
                if properties.enabled {
                    EventLogger::log_event(
                        request.chat_id(),
                        request.user_id(),
                        DispatchEvent::WaitConsumed { command: properties.identifier.clone(), used: true },
                    );
                    let rewritten = request.with_text(waiting_text(&properties, &waiting, &text));
                    let argument = rewritten_argument(&waiting, &text);
                    if let Some(responses) = self.invoke(&properties, &rewritten, argument, &ctx, Form::Explicit).await {
                        return responses;
                    }
                }
            }
            debug!(command = %waiting.command_identifier, "Dropping wait for unavailable command");
        }

        self.analyze_passive(&request, &ctx).await
    }

    async fn invoke(
        &self,
        properties: &CommandProperties,
        request: &BotRequest,
        argument: Option<String>,
        ctx: &CommandContext<'_>,
        form: Form,
    ) -> Option<Vec<BotResponse>> {
        let Some(command) = self.commands.get(&properties.identifier) else {
            warn!(command = %properties.identifier, "No implementation registered");
            return Some(vec![]);
        };

        if let AccessDecision::Denied { effective, required } = self.services.access.check(properties, ctx.caller()) {
            debug!(command = %properties.name, %effective, %required, "Invocation refused");
            EventLogger::log_event(
                request.chat_id(),
                request.user_id(),
                DispatchEvent::AccessDenied { command: properties.name.clone() },
            );
            return (form == Form::Explicit).then(Vec::new);
        }

        info!(command = %properties.name, chat_id = request.chat_id(), user_id = request.user_id(), depth = ctx.depth(), "Invoking command");
        EventLogger::log_event(
            request.chat_id(),
            request.user_id(),
            DispatchEvent::CommandInvoked { command: properties.name.clone(), argument: argument.clone() },
        );

        let request = request.with_command_argument(argument);
        if form == Form::Explicit {
            ctx.indicate(command.indicator()).await;
            return Some(self.run(command.as_ref(), &request, ctx, Mode::Parse).await);
        }

        let responses = match self.execute(command.as_ref(), &request, ctx, Mode::Parse).await {
            Ok(responses) if responses.is_empty() => return None,
            Ok(responses) => responses,
            Err(error) if !error.is_internal() => return None,
            Err(error) => self.convert_error(command.identifier(), &request, Mode::Parse, error),
        };
        ctx.indicate(command.indicator()).await;
        Some(responses)
    }

    async fn analyze_passive(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Vec<BotResponse> {
        let mut responses = Vec::new();
        for command in &self.passive {
            let Some(properties) = self.services.registry.get_by_identifier(command.identifier()).await else {
                continue;
            };
            if !properties.enabled || !self.services.access.check(&properties, ctx.caller()).is_granted() {
                continue;
            }
            let produced = self.run(command.as_ref(), request, ctx, Mode::Analyze).await;
            if !produced.is_empty() {
                ctx.indicate(command.indicator()).await;
                responses.extend(produced);
            }
        }
        responses
    }

    async fn run(&self, command: &dyn Command, request: &BotRequest, ctx: &CommandContext<'_>, mode: Mode) -> Vec<BotResponse> {
        match self.execute(command, request, ctx, mode).await {
            Ok(responses) => responses,
            Err(error) => self.convert_error(command.identifier(), request, mode, error),
        }
    }

    /// Run one entry point, turning a panic into an internal error.
    async fn execute(
        &self,
        command: &dyn Command,
        request: &BotRequest,
        ctx: &CommandContext<'_>,
        mode: Mode,
    ) -> Result<Vec<BotResponse>, BotError> {
        let outcome = match mode {
            Mode::Parse => AssertUnwindSafe(command.parse(request, ctx)).catch_unwind().await,
            Mode::Analyze => AssertUnwindSafe(command.analyze(request, ctx)).catch_unwind().await,
        };
        outcome.unwrap_or_else(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(BotError::Internal(anyhow::anyhow!("command panicked: {reason}")))
        })
    }

    fn convert_error(&self, identifier: &str, request: &BotRequest, mode: Mode, error: BotError) -> Vec<BotResponse> {
        let message = request.message();
        if let Some(text) = error.user_message() {
            debug!(command = identifier, mode = mode.as_str(), %text, "Command rejected input");
            return vec![TextResponse::reply_to(message, text).into()];
        }

        EventLogger::log_event(
            request.chat_id(),
            request.user_id(),
            DispatchEvent::CommandFailed { command: identifier.to_string(), error_msg: error.to_string() },
        );
        let note = format!("{identifier}:{}", mode.as_str());
        let stats = &self.services.stats;
        if std::panic::catch_unwind(AssertUnwindSafe(|| stats.increment_errors(request, &error, &note))).is_err() {
            warn!(command = identifier, "Stats collaborator panicked");
        }
        vec![TextResponse::reply_to(message, Speech::InternalError.text()).into()]
    }

    /// Load or register the sender and the chat. Store failures fall back to defaults.
    async fn resolve_caller(&self, request: &BotRequest) -> Caller {
        let message = request.message();
        let default_level = self.services.settings.default_user_level;

        let user_level = match self.services.users.get(message.user.id).await {
            Ok(Some(user)) => user.access_level,
            Ok(None) => {
                let user = User { access_level: default_level, ..message.user.clone() };
                if let Err(e) = self.services.users.save(&user).await {
                    warn!(user_id = user.id, error = %e, "Failed to register user");
                }
                default_level
            }
            Err(e) => {
                warn!(user_id = message.user.id, error = %e, "Failed to load user");
                default_level
            }
        };

        let chat_level = if message.chat.is_private() {
            None
        } else {
            match self.services.chats.get(message.chat.id).await {
                Ok(Some(chat)) => chat.access_level,
                Ok(None) => {
                    let chat = Chat { access_level: None, ..message.chat.clone() };
                    if let Err(e) = self.services.chats.save(&chat).await {
                        warn!(chat_id = chat.id, error = %e, "Failed to register chat");
                    }
                    None
                }
                Err(e) => {
                    warn!(chat_id = message.chat.id, error = %e, "Failed to load chat");
                    None
                }
            }
        };

        Caller { user_id: message.user.id, chat_id: message.chat.id, user_level, chat_level }
    }

    async fn take_waiting(&self, request: &BotRequest) -> Option<CommandWaiting> {
        match self.services.waiting.take(request.chat_id(), request.user_id()).await {
            Ok(waiting) => waiting,
            Err(e) => {
                warn!(chat_id = request.chat_id(), user_id = request.user_id(), error = %e, "Failed to read command waiting");
                None
            }
        }
    }
}

/// `"<name> [<partial>] <text>"`
fn waiting_text(properties: &CommandProperties, waiting: &CommandWaiting, text: &str) -> String {
    [Some(properties.name.as_str()), waiting.text.as_deref(), Some(text.trim())]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn rewritten_argument(waiting: &CommandWaiting, text: &str) -> Option<String> {
    let argument = [waiting.text.as_deref(), Some(text.trim())]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!argument.is_empty()).then_some(argument)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use jtelebot_core::{AccessLevel, AccessScope, BotResponse, Indicator, Speech, UserStore};

    use super::*;
    use crate::command::{Command, CommandContext};
    use crate::testing::{texts, Harness, ADMIN_ID, GROUP_ID};

    fn props(name: &str) -> CommandProperties {
        CommandProperties {
            name: name.into(),
            aliases: vec![],
            identifier: name.into(),
            description: String::new(),
            access_level: AccessLevel::Newcomer,
            access_scope: AccessScope::Max,
            enabled: true,
            aliasable: true,
        }
    }

    struct FailingCommand;

    #[async_trait]
    impl Command for FailingCommand {
        fn identifier(&self) -> &str {
            "fail"
        }

        async fn parse(&self, _request: &BotRequest, _ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
            Err(anyhow::anyhow!("database is down").into())
        }
    }

    struct PanickingCommand;

    #[async_trait]
    impl Command for PanickingCommand {
        fn identifier(&self) -> &str {
            "boom"
        }

        async fn parse(&self, _request: &BotRequest, _ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
            panic!("unexpected state");
        }
    }

    /// Passive command answering twice to any text containing "loud".
    struct LoudCommand;

    #[async_trait]
    impl Command for LoudCommand {
        fn identifier(&self) -> &str {
            "loud"
        }

        fn is_passive(&self) -> bool {
            true
        }

        async fn parse(&self, _request: &BotRequest, _ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
            Ok(vec![])
        }

        async fn analyze(&self, request: &BotRequest, _ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
            let message = request.message();
            if !message.text_or_empty().contains("loud") {
                return Ok(vec![]);
            }
            Ok(vec![
                TextResponse::reply_to(message, "LOUD").into(),
                TextResponse::reply_to(message, "LOUDER").into(),
            ])
        }
    }

    struct RecursiveCommand;

    #[async_trait]
    impl Command for RecursiveCommand {
        fn identifier(&self) -> &str {
            "recurse"
        }

        async fn parse(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
            ctx.redispatch(request.with_text("/recurse")).await
        }
    }

    async fn harness_with_test_commands() -> Harness {
        Harness::with_commands(vec![
            (props("fail"), Arc::new(FailingCommand) as Arc<dyn Command>),
            (props("boom"), Arc::new(PanickingCommand) as Arc<dyn Command>),
            (props("loud"), Arc::new(LoudCommand) as Arc<dyn Command>),
            (props("recurse"), Arc::new(RecursiveCommand) as Arc<dyn Command>),
        ])
        .await
    }

    #[tokio::test]
    async fn test_ping_replies_with_one_indicator() {
        let h = Harness::new().await;
        let responses = h.send(GROUP_ID, 5, "/ping").await;
        assert_eq!(texts(&responses), vec!["pong"]);
        assert_eq!(responses[0].reply_to_message_id(), Some(1));
        assert_eq!(*h.sink.indicators.lock().unwrap(), vec![(GROUP_ID, Indicator::Typing)]);
    }

    #[tokio::test]
    async fn test_bare_word_and_addressed_invocations() {
        let h = Harness::new().await;
        assert_eq!(texts(&h.send(GROUP_ID, 5, "Ping").await), vec!["pong"]);
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/ping@jtelebot").await), vec!["pong"]);
        assert!(h.send(GROUP_ID, 5, "/ping@otherbot").await.is_empty());
    }

    #[tokio::test]
    async fn test_chat_starting_with_command_word_is_quiet() {
        let h = Harness::new().await;
        assert!(h.send(GROUP_ID, 5, "k thanks").await.is_empty());
        assert!(h.send(GROUP_ID, 5, "help me with this please").await.is_empty());
        assert!(h.send(GROUP_ID, 5, "alias test").await.is_empty());
        assert_eq!(h.sink.indicator_count(), 0);

        assert_eq!(texts(&h.send(GROUP_ID, 5, "/help me").await), vec![Speech::FoundNothing.text()]);
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/k thanks").await), vec![Speech::WrongInput.text()]);
    }

    #[tokio::test]
    async fn test_bare_word_rejected_input_feeds_waiting_command() {
        let h = Harness::new().await;
        h.send(GROUP_ID, 5, "/echo").await;
        assert_eq!(texts(&h.send(GROUP_ID, 5, "help me please").await), vec!["help me please"]);
    }

    #[tokio::test]
    async fn test_unknown_sender_is_registered() {
        let h = Harness::new().await;
        h.send(GROUP_ID, 42, "hello").await;
        let user = h.users.get(42).await.unwrap().unwrap();
        assert_eq!(user.access_level, AccessLevel::Newcomer);
        assert_eq!(user.username.as_deref(), Some("user42"));
    }

    #[tokio::test]
    async fn test_unrelated_text_is_quiet() {
        let h = harness_with_test_commands().await;
        assert!(h.send(GROUP_ID, 5, "just chatting about the weather").await.is_empty());
        assert_eq!(h.sink.indicator_count(), 0);
        assert_eq!(h.stats.count(), 0);
    }

    #[tokio::test]
    async fn test_one_indicator_for_several_passive_responses() {
        let h = harness_with_test_commands().await;
        let responses = h.send(GROUP_ID, 5, "hey bot, say it loud").await;
        assert_eq!(responses.len(), 3);
        assert_eq!(&texts(&responses)[1..], &["LOUD", "LOUDER"]);
        assert_eq!(h.sink.indicator_count(), 1);
    }

    #[tokio::test]
    async fn test_internal_error_becomes_generic_reply() {
        let h = harness_with_test_commands().await;
        let responses = h.send(GROUP_ID, 5, "/fail").await;
        assert_eq!(texts(&responses), vec![Speech::InternalError.text()]);
        assert_eq!(h.stats.count(), 1);
        assert_eq!(h.stats.notes.lock().unwrap()[0], "fail:parse");

        assert_eq!(texts(&h.send(GROUP_ID, 5, "/ping").await), vec!["pong"]);
    }

    #[tokio::test]
    async fn test_panic_becomes_generic_reply() {
        let h = harness_with_test_commands().await;
        let responses = h.send(GROUP_ID, 5, "/boom").await;
        assert_eq!(texts(&responses), vec![Speech::InternalError.text()]);
        assert_eq!(h.stats.count(), 1);
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/ping").await), vec!["pong"]);
    }

    #[tokio::test]
    async fn test_user_input_error_is_not_reported() {
        let h = Harness::new().await;
        let responses = h.send(GROUP_ID, 5, "/karma nobody").await;
        assert_eq!(texts(&responses), vec![Speech::WrongInput.text()]);
        assert_eq!(h.stats.count(), 0);
    }

    #[tokio::test]
    async fn test_waiting_feeds_next_message_once() {
        let h = Harness::new().await;
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/echo").await), vec!["What should I repeat?"]);
        assert_eq!(texts(&h.send(GROUP_ID, 5, "hello there").await), vec!["hello there"]);
        assert!(h.send(GROUP_ID, 5, "hello there").await.is_empty());
    }

    #[tokio::test]
    async fn test_waiting_is_per_user() {
        let h = Harness::new().await;
        h.send(GROUP_ID, 5, "/echo").await;
        assert!(h.send(GROUP_ID, 6, "hello").await.is_empty());
        assert_eq!(texts(&h.send(GROUP_ID, 5, "hello").await), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_waiting_is_consumed_by_explicit_command() {
        let h = Harness::new().await;
        h.send(GROUP_ID, 5, "/echo").await;
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/ping").await), vec!["pong"]);
        assert!(h.send(GROUP_ID, 5, "hello").await.is_empty());
        assert!(h.waiting.is_empty().await);
    }

    #[tokio::test]
    async fn test_waiting_keeps_partial_argument() {
        let h = Harness::new().await;
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/loc 55.75").await), vec!["Now send the longitude"]);
        let responses = h.send(GROUP_ID, 5, "37.61").await;
        match responses.as_slice() {
            [BotResponse::Location(location)] => {
                assert_eq!(location.latitude, 55.75);
                assert_eq!(location.longitude, 37.61);
            }
            other => panic!("unexpected responses: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_access_denied_is_silent() {
        let h = Harness::new().await;
        let responses = h.send(GROUP_ID, 5, "/command off ping").await;
        assert!(responses.is_empty());
        assert_eq!(h.sink.indicator_count(), 0);
    }

    #[tokio::test]
    async fn test_banned_user_gets_nothing() {
        let h = Harness::new().await;
        h.set_level(5, AccessLevel::Banned).await;
        assert!(h.send(GROUP_ID, 5, "/ping").await.is_empty());
    }

    #[tokio::test]
    async fn test_admin_disables_command() {
        let h = Harness::new().await;
        let responses = h.send(GROUP_ID, ADMIN_ID, "/command off ping").await;
        assert_eq!(texts(&responses), vec!["/ping: Disabled"]);
        assert!(h.send(GROUP_ID, 5, "/ping").await.is_empty());

        h.send(GROUP_ID, ADMIN_ID, "/command on ping").await;
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/ping").await), vec!["pong"]);
    }

    #[tokio::test]
    async fn test_redispatch_depth_is_limited() {
        let h = harness_with_test_commands().await;
        let responses = h.send(GROUP_ID, 5, "/recurse").await;
        assert_eq!(texts(&responses), vec![Speech::WrongInput.text()]);
        assert_eq!(h.sink.indicator_count(), 1);
    }

    #[test]
    fn test_waiting_text_rewrite() {
        let waiting = CommandWaiting {
            chat_id: GROUP_ID,
            user_id: 5,
            command_identifier: "location".into(),
            text: Some("55.75".into()),
            created_at: chrono::Utc::now(),
        };
        let properties = props("location");
        assert_eq!(waiting_text(&properties, &waiting, " 37.61 "), "location 55.75 37.61");
        assert_eq!(rewritten_argument(&waiting, "37.61").as_deref(), Some("55.75 37.61"));
    }
}
