/// Command detection: find an invocation at the start of a message.
///
/// An invocation is `/name`, a bare `name`, either optionally followed by a
/// `_<argument>` suffix and an `@botname` suffix, then free text. Whether a bare
/// word really is an invocation is settled by the dispatcher.
use jtelebot_core::CommandPropertiesStore;

use crate::types::{CommandInvocation, CommandToken};

/// Split the leading token of `text` into a command name candidate.
///
/// Returns `None` when the token cannot be a command name, or when it is
/// addressed (`/help@otherbot`) to a bot other than `bot_username`.
pub fn parse_command_token(text: &str, bot_username: &str) -> Option<CommandToken> {
    let first = text.split_whitespace().next()?;
    let (slash, first) = match first.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, first),
    };

    let first = match first.split_once('@') {
        Some((name, addressee)) => {
            if !addressee.eq_ignore_ascii_case(bot_username.trim_start_matches('@')) {
                return None;
            }
            name
        }
        None => first,
    };

    let name = match first.find('_') {
        Some(i) if i > 0 => &first[..i],
        _ => first,
    };
    if name.is_empty() || !name.chars().all(char::is_alphanumeric) {
        return None;
    }

    Some(CommandToken { name: name.to_lowercase(), slash })
}

/// Strip the leading command token from `text` and return the remainder.
///
/// The leading `/` is optional and an `@username` glued to the token is dropped.
/// Returns `None` when nothing follows the command name.
///
/// ```
/// use jtelebot_commands::cut_command_in_text;
/// assert_eq!(cut_command_in_text("/bot how are you?", "bot").as_deref(), Some("how are you?"));
/// assert_eq!(cut_command_in_text("bot", "bot"), None);
/// assert_eq!(cut_command_in_text("/news_1@jtelebot", "news").as_deref(), Some("_1"));
/// ```
pub fn cut_command_in_text(text: &str, command_name: &str) -> Option<String> {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix('/').unwrap_or(trimmed);

    let rest = match body.get(..command_name.len()) {
        Some(head) if head.to_lowercase() == command_name.to_lowercase() => &body[command_name.len()..],
        _ => return non_empty(body),
    };

    let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (token, tail) = rest.split_at(token_end);
    let token = match token.find('@') {
        Some(at) => &token[..at],
        None => token,
    };

    non_empty(&format!("{token}{tail}"))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Detect a known, enabled command at the start of `text`.
pub async fn detect_command(
    text: &str,
    registry: &dyn CommandPropertiesStore,
    bot_username: &str,
) -> Option<CommandInvocation> {
    let token = parse_command_token(text, bot_username)?;
    let properties = registry.get_by_name(&token.name).await?;
    if !properties.enabled {
        return None;
    }
    let argument = cut_command_in_text(text, &token.name);
    let by_alias = properties.name != token.name;
    Some(CommandInvocation { properties, argument, slash: token.slash, by_alias })
}
