/// Parsed invocation types.
use jtelebot_core::CommandProperties;

/// The leading token of a message that may name a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandToken {
    /// Lowercase command name without `/`, `@bot` or `_suffix`.
    pub name: String,
    /// Whether the token started with `/`.
    pub slash: bool,
}

/// A detected and resolved command invocation.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub properties: CommandProperties,
    /// Full remaining text after the command token.
    pub argument: Option<String>,
    /// Written as `/name` rather than a bare leading word.
    pub slash: bool,
    /// Matched through one of the command's aliases instead of its name.
    pub by_alias: bool,
}
