use async_trait::async_trait;
use rand::seq::SliceRandom;

use jtelebot_core::{BotError, BotRequest, BotResponse, TextResponse};

use crate::command::{Command, CommandContext};

const REPLIES: &[&str] = &[
    "I'm here.",
    "Yes?",
    "Listening.",
    "That's me.",
    "Call /help to see what I can do.",
];

/// Repeats its argument; passively answers when addressed by the trigger word.
pub struct EchoHandler;

impl EchoHandler {
    fn mentions(text: &str, trigger: &str) -> bool {
        let trigger = trigger.to_lowercase();
        !trigger.is_empty()
            && text
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word.to_lowercase() == trigger)
    }

    fn pick_reply() -> &'static str {
        REPLIES.choose(&mut rand::thread_rng()).copied().unwrap_or(REPLIES[0])
    }
}

#[async_trait]
impl Command for EchoHandler {
    fn identifier(&self) -> &str {
        "echo"
    }

    fn is_passive(&self) -> bool {
        true
    }

    async fn parse(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        match message.command_argument.as_deref() {
            Some(text) => Ok(vec![TextResponse::reply_to(message, text).into()]),
            None => {
                ctx.services().waiting.add(message, self.identifier()).await?;
                Ok(vec![TextResponse::reply_to(message, "What should I repeat?").into()])
            }
        }
    }

    async fn analyze(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        if !message.has_text() || message.is_callback() {
            return Ok(vec![]);
        }
        if !Self::mentions(message.text_or_empty(), &ctx.services().settings.trigger_name) {
            return Ok(vec![]);
        }
        Ok(vec![TextResponse::reply_to(message, Self::pick_reply()).into()])
    }
}
