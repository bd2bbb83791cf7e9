use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use jtelebot_core::{BotError, BotRequest, BotResponse, Speech, TextResponse};

use crate::command::{Command, CommandContext};
use crate::detection::parse_command_token;

/// User-defined shortcuts, scoped to (chat, user).
#[derive(Debug, Default)]
pub struct AliasBook {
    entries: RwLock<HashMap<(i64, i64), BTreeMap<String, String>>>,
}

impl AliasBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, chat_id: i64, user_id: i64, name: &str) -> Option<String> {
        self.entries.read().await.get(&(chat_id, user_id)).and_then(|book| book.get(name).cloned())
    }

    /// Aliases of one user in one chat, sorted by name.
    pub async fn list(&self, chat_id: i64, user_id: i64) -> Vec<(String, String)> {
        self.entries
            .read()
            .await
            .get(&(chat_id, user_id))
            .map(|book| book.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub async fn set(&self, chat_id: i64, user_id: i64, name: &str, value: &str) {
        self.entries
            .write()
            .await
            .entry((chat_id, user_id))
            .or_default()
            .insert(name.to_string(), value.to_string());
    }

    pub async fn remove(&self, chat_id: i64, user_id: i64, name: &str) -> bool {
        let mut entries = self.entries.write().await;
        let Some(book) = entries.get_mut(&(chat_id, user_id)) else {
            return false;
        };
        let removed = book.remove(name).is_some();
        if book.is_empty() {
            entries.remove(&(chat_id, user_id));
        }
        removed
    }
}

/// `alias` lists, `alias name = text` saves, `alias name =` deletes, `alias name` runs.
pub struct AliasHandler {
    book: Arc<AliasBook>,
}

impl AliasHandler {
    pub fn new(book: Arc<AliasBook>) -> Self {
        Self { book }
    }

    async fn save(&self, request: &BotRequest, ctx: &CommandContext<'_>, name: &str, value: &str) -> Result<Speech, BotError> {
        let (chat_id, user_id) = (request.chat_id(), request.user_id());
        if value.is_empty() {
            if self.book.remove(chat_id, user_id, name).await {
                return Ok(Speech::Deleted);
            }
            return Err(Speech::FoundNothing.into());
        }

        let settings = &ctx.services().settings;
        let token = parse_command_token(value, &settings.bot_username).ok_or(Speech::WrongInput)?;
        let target = ctx.services().registry.get_by_name(&token.name).await.ok_or(Speech::WrongInput)?;
        if !target.aliasable {
            debug!(alias = name, command = %target.name, "Refusing alias to non-aliasable command");
            return Err(Speech::WrongInput.into());
        }

        self.book.set(chat_id, user_id, name, value).await;
        Ok(Speech::Saved)
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[async_trait]
impl Command for AliasHandler {
    fn identifier(&self) -> &str {
        "alias"
    }

    async fn parse(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        let (chat_id, user_id) = (request.chat_id(), request.user_id());

        let Some(argument) = message.command_argument.as_deref() else {
            let aliases = self.book.list(chat_id, user_id).await;
            if aliases.is_empty() {
                return Err(Speech::FoundNothing.into());
            }
            let lines: Vec<String> = aliases.iter().map(|(name, value)| format!("{name} = {value}")).collect();
            return Ok(vec![TextResponse::reply_to(message, lines.join("\n")).into()]);
        };

        if let Some((name, value)) = argument.split_once('=') {
            let name = name.trim().to_lowercase();
            if !valid_name(&name) {
                return Err(Speech::WrongInput.into());
            }
            let speech = self.save(request, ctx, &name, value.trim()).await?;
            return Ok(vec![TextResponse::reply_to(message, speech.text()).into()]);
        }

        let (name, extra) = match argument.split_once(char::is_whitespace) {
            Some((name, extra)) => (name, extra.trim()),
            None => (argument, ""),
        };
        let value = self
            .book
            .get(chat_id, user_id, &name.to_lowercase())
            .await
            .ok_or(Speech::FoundNothing)?;
        let text = if extra.is_empty() { value } else { format!("{value} {extra}") };
        ctx.redispatch(request.with_text(text)).await
    }
}
