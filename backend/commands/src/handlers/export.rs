use std::sync::Arc;

use async_trait::async_trait;

use jtelebot_core::{
    BotError, BotRequest, BotResponse, File, FileKind, FileResponse, FileSource, Indicator, Speech,
};

use crate::command::{Command, CommandContext};
use crate::handlers::alias::AliasBook;

const EXPORT_FILE_NAME: &str = "aliases.txt";

/// Sends the caller's aliases for this chat as a text document.
pub struct ExportHandler {
    book: Arc<AliasBook>,
}

impl ExportHandler {
    pub fn new(book: Arc<AliasBook>) -> Self {
        Self { book }
    }
}

#[async_trait]
impl Command for ExportHandler {
    fn identifier(&self) -> &str {
        "export"
    }

    fn indicator(&self) -> Indicator {
        Indicator::UploadDocument
    }

    async fn parse(&self, request: &BotRequest, _ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        let aliases = self.book.list(request.chat_id(), request.user_id()).await;
        if aliases.is_empty() {
            return Err(Speech::FoundNothing.into());
        }

        let mut body = String::new();
        for (name, value) in &aliases {
            body.push_str(&format!("{name} = {value}\n"));
        }
        let file = File::new(EXPORT_FILE_NAME, FileSource::Bytes(body.into_bytes()), FileKind::Document)
            .with_caption(format!("{} aliases", aliases.len()));
        Ok(vec![FileResponse::reply_to(message, vec![file]).into()])
    }
}
