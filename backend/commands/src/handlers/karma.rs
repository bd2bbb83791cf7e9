use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use jtelebot_core::{BotError, BotRequest, BotResponse, Speech, TextResponse, User};

use crate::command::{Command, CommandContext};

const TOP_SIZE: usize = 10;

/// Per-chat karma scores.
#[derive(Debug, Default)]
pub struct KarmaLedger {
    scores: RwLock<HashMap<(i64, i64), i64>>,
}

impl KarmaLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, chat_id: i64, user_id: i64) -> i64 {
        self.scores.read().await.get(&(chat_id, user_id)).copied().unwrap_or(0)
    }

    /// Apply `delta` and return the new score.
    pub async fn change(&self, chat_id: i64, user_id: i64, delta: i64) -> i64 {
        let mut scores = self.scores.write().await;
        let score = scores.entry((chat_id, user_id)).or_insert(0);
        *score += delta;
        *score
    }

    /// Highest scores in a chat, best first.
    pub async fn top(&self, chat_id: i64, limit: usize) -> Vec<(i64, i64)> {
        let mut top: Vec<(i64, i64)> = self
            .scores
            .read()
            .await
            .iter()
            .filter(|((chat, _), _)| *chat == chat_id)
            .map(|((_, user), score)| (*user, *score))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        top.truncate(limit);
        top
    }
}

fn parse_delta(token: &str) -> Option<i64> {
    match token {
        "1" | "+1" => Some(1),
        "-1" => Some(-1),
        _ => None,
    }
}

/// Vote carried by a bare reply such as "+1" or "👎".
fn reply_vote(text: &str) -> Option<i64> {
    match text.trim() {
        "+1" | "+" | "👍" => Some(1),
        "-1" | "-" | "👎" => Some(-1),
        _ => None,
    }
}

/// `karma` shows the chat top, `karma @user` one score, `karma @user 1|-1` votes.
/// Passively counts "+1"/"-1" replies.
pub struct KarmaHandler {
    ledger: Arc<KarmaLedger>,
}

impl KarmaHandler {
    pub fn new(ledger: Arc<KarmaLedger>) -> Self {
        Self { ledger }
    }

    async fn mention(&self, ctx: &CommandContext<'_>, user_id: i64) -> String {
        match ctx.services().users.get(user_id).await {
            Ok(Some(user)) => user.mention(),
            _ => User::new(user_id).mention(),
        }
    }

    async fn show_top(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<String, BotError> {
        let top = self.ledger.top(request.chat_id(), TOP_SIZE).await;
        if top.is_empty() {
            return Err(Speech::FoundNothing.into());
        }
        let mut lines = vec!["Karma:".to_string()];
        for (position, (user_id, score)) in top.into_iter().enumerate() {
            lines.push(format!("{}. {} {score}", position + 1, self.mention(ctx, user_id).await));
        }
        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl Command for KarmaHandler {
    fn identifier(&self) -> &str {
        "karma"
    }

    fn is_passive(&self) -> bool {
        true
    }

    async fn parse(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        let Some(argument) = message.command_argument.as_deref() else {
            let text = self.show_top(request, ctx).await?;
            return Ok(vec![TextResponse::reply_to(message, text).into()]);
        };

        let mut tokens = argument.split_whitespace();
        let username = tokens.next().filter(|t| t.starts_with('@')).ok_or(Speech::WrongInput)?;
        let delta = match tokens.next() {
            Some(token) => Some(parse_delta(token).ok_or(Speech::WrongInput)?),
            None => None,
        };
        if tokens.next().is_some() {
            return Err(Speech::WrongInput.into());
        }

        let target = ctx.services().users.get_by_username(username).await?.ok_or(Speech::FoundNothing)?;
        let text = match delta {
            None => format!("Karma of {}: {}", target.mention(), self.ledger.get(request.chat_id(), target.id).await),
            Some(_) if target.id == request.user_id() => return Err(Speech::WrongInput.into()),
            Some(delta) => {
                let score = self.ledger.change(request.chat_id(), target.id, delta).await;
                format!("Karma of {}: {score}", target.mention())
            }
        };
        Ok(vec![TextResponse::reply_to(message, text).into()])
    }

    async fn analyze(&self, request: &BotRequest, _ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        let Some(delta) = reply_vote(message.text_or_empty()) else {
            return Ok(vec![]);
        };
        let Some(reply) = message.reply_to.as_deref() else {
            return Ok(vec![]);
        };
        if reply.user.id == message.user.id {
            return Ok(vec![]);
        }

        let score = self.ledger.change(request.chat_id(), reply.user.id, delta).await;
        let text = format!("Karma of {}: {score}", reply.user.mention());
        Ok(vec![TextResponse::reply_to(message, text).into()])
    }
}
