use async_trait::async_trait;
use tracing::info;

use jtelebot_core::{BotError, BotRequest, BotResponse, DeleteResponse, Speech, TextResponse};

use crate::command::{Command, CommandContext};

// ---------------------------------------------------------------------------
// del
// ---------------------------------------------------------------------------

/// Deletes the replied message and the command message itself.
pub struct DeleteHandler;

#[async_trait]
impl Command for DeleteHandler {
    fn identifier(&self) -> &str {
        "del"
    }

    async fn parse(&self, request: &BotRequest, _ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        let reply = message.reply_to.as_deref().ok_or(Speech::WrongInput)?;
        Ok(vec![
            DeleteResponse::new(message.chat.id, reply.message_id).into(),
            DeleteResponse::new(message.chat.id, message.message_id).into(),
        ])
    }
}

// ---------------------------------------------------------------------------
// command on|off <name>
// ---------------------------------------------------------------------------

pub struct CommandSwitchHandler;

#[async_trait]
impl Command for CommandSwitchHandler {
    fn identifier(&self) -> &str {
        "command"
    }

    async fn parse(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        let argument = message.command_argument.as_deref().ok_or(Speech::WrongInput)?;

        let mut tokens = argument.split_whitespace();
        let enabled = match tokens.next().map(str::to_lowercase).as_deref() {
            Some("on") => true,
            Some("off") => false,
            _ => return Err(Speech::WrongInput.into()),
        };
        let name = tokens.next().ok_or(Speech::WrongInput)?.trim_start_matches('/');
        if tokens.next().is_some() {
            return Err(Speech::WrongInput.into());
        }

        let registry = &ctx.services().registry;
        let target = registry.get_by_name(name).await.ok_or(Speech::FoundNothing)?;
        if target.identifier == self.identifier() {
            return Err(Speech::WrongInput.into());
        }

        registry.set_enabled(&target.name, enabled).await?;
        info!(command = %target.name, enabled, by = request.user_id(), "Command switched by admin");
        let speech = if enabled { Speech::Enabled } else { Speech::Disabled };
        Ok(vec![TextResponse::reply_to(message, format!("/{}: {}", target.name, speech.text())).into()])
    }
}

#[cfg(test)]
mod tests {
    use jtelebot_core::{AccessLevel, BotResponse};

    use crate::testing::{texts, Harness, ADMIN_ID, GROUP_ID};

    #[tokio::test]
    async fn test_delete_requires_reply() {
        let h = Harness::new().await;
        h.set_level(7, AccessLevel::Moderator).await;
        assert_eq!(texts(&h.send(GROUP_ID, 7, "/del").await), vec!["Wrong input"]);
    }

    #[tokio::test]
    async fn test_delete_removes_reply_and_command() {
        let h = Harness::new().await;
        h.set_level(7, AccessLevel::Moderator).await;
        let spam = h.message(GROUP_ID, 5, "spam");
        let command = h.message(GROUP_ID, 7, "/del").with_reply_to(spam.clone());
        let command_id = command.message_id;

        let responses = h.send_message(command).await;
        let deleted: Vec<i64> = responses
            .iter()
            .map(|r| match r {
                BotResponse::Delete(d) => d.message_id,
                other => panic!("unexpected response: {other:?}"),
            })
            .collect();
        assert_eq!(deleted, vec![spam.message_id, command_id]);
    }

    #[tokio::test]
    async fn test_switch_rejects_unknown_and_self() {
        let h = Harness::new().await;
        assert_eq!(texts(&h.send(GROUP_ID, ADMIN_ID, "/command off weather").await), vec!["Found nothing"]);
        assert_eq!(texts(&h.send(GROUP_ID, ADMIN_ID, "/command off command").await), vec!["Wrong input"]);
        assert_eq!(texts(&h.send(GROUP_ID, ADMIN_ID, "/command maybe ping").await), vec!["Wrong input"]);
    }

    #[tokio::test]
    async fn test_switch_accepts_alias() {
        let h = Harness::new().await;
        assert_eq!(texts(&h.send(GROUP_ID, ADMIN_ID, "/command off k").await), vec!["/karma: Disabled"]);
    }
}
