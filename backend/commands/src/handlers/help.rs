use async_trait::async_trait;

use jtelebot_core::{BotError, BotRequest, BotResponse, CommandProperties, Speech, TextResponse};

use crate::command::{Command, CommandContext};

// ---------------------------------------------------------------------------
// ping
// ---------------------------------------------------------------------------

pub struct PingHandler;

#[async_trait]
impl Command for PingHandler {
    fn identifier(&self) -> &str {
        "ping"
    }

    async fn parse(&self, request: &BotRequest, _ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        if message.command_argument.is_some() {
            return Ok(vec![]);
        }
        Ok(vec![TextResponse::reply_to(message, "pong").into()])
    }
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

pub struct HelpHandler;

#[async_trait]
impl Command for HelpHandler {
    fn identifier(&self) -> &str {
        "help"
    }

    async fn parse(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        let registry = &ctx.services().registry;
        let access = &ctx.services().access;
        // Listed only when the dispatcher would run it for this caller.
        let runnable = |cmd: &CommandProperties| cmd.enabled && access.check(cmd, ctx.caller()).is_granted();

        let text = match message.command_argument.as_deref() {
            None => {
                let available: Vec<CommandProperties> = registry.all().await.into_iter().filter(|c| runnable(c)).collect();
                if available.is_empty() {
                    return Err(Speech::FoundNothing.into());
                }
                let mut lines = vec!["Available commands:".to_string()];
                for cmd in available {
                    lines.push(format!("/{} — {}", cmd.name, cmd.description));
                }
                lines.join("\n")
            }
            Some(name) => {
                let cmd = registry
                    .get_by_name(name.split_whitespace().next().unwrap_or(name))
                    .await
                    .filter(|c| runnable(c))
                    .ok_or(Speech::FoundNothing)?;
                let mut text = format!("/{} — {}", cmd.name, cmd.description);
                if !cmd.aliases.is_empty() {
                    text.push_str(&format!("\nAliases: {}", cmd.aliases.join(", ")));
                }
                text.push_str(&format!("\nRequired level: {}", cmd.access_level));
                text
            }
        };

        Ok(vec![TextResponse::reply_to(message, text).into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jtelebot_core::{AccessLevel, CommandPropertiesStore};
    use jtelebot_security::AccessPolicy;
    use crate::testing::{texts, Harness, GROUP_ID};

    #[tokio::test]
    async fn test_ping_ignores_arguments() {
        let h = Harness::new().await;
        assert!(h.send(GROUP_ID, 5, "ping pong").await.is_empty());
    }

    #[tokio::test]
    async fn test_help_lists_only_visible_commands() {
        let h = Harness::new().await;
        let responses = h.send(GROUP_ID, 5, "/help").await;
        let text = texts(&responses)[0];
        assert!(text.contains("/ping"));
        assert!(text.contains("/karma"));
        assert!(!text.contains("/del"));
        assert!(!text.contains("/command"));
    }

    #[tokio::test]
    async fn test_help_for_one_command() {
        let h = Harness::new().await;
        let text = h.send(GROUP_ID, 5, "/h karma").await;
        assert!(texts(&text)[0].contains("Aliases: k"));
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/help del").await), vec![Speech::FoundNothing.text()]);
    }

    #[tokio::test]
    async fn test_help_hides_disabled_commands() {
        let h = Harness::new().await;
        h.registry.set_enabled("echo", false).await.unwrap();
        assert!(!texts(&h.send(GROUP_ID, 5, "/help").await)[0].contains("/echo"));
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/help echo").await), vec![Speech::FoundNothing.text()]);
    }

    #[tokio::test]
    async fn test_help_follows_command_access_scope() {
        let h = Harness::with_access(AccessPolicy::new(None, AccessLevel::Familiar)).await;
        let listing = h.send(GROUP_ID, 5, "/help").await;
        let text = texts(&listing)[0];
        assert!(text.contains("/ping"));
        assert!(!text.contains("/alias"));
        assert!(!text.contains("/export"));
        assert_eq!(texts(&h.send(GROUP_ID, 5, "/help alias").await), vec![Speech::FoundNothing.text()]);
        assert!(h.send(GROUP_ID, 5, "/alias").await.is_empty());

        h.set_level(5, AccessLevel::Familiar).await;
        assert!(texts(&h.send(GROUP_ID, 5, "/help").await)[0].contains("/alias"));
    }
}
