/// Console adapter: stdin lines become messages from one configured user,
/// responses are rendered as plain text on stdout.
///
/// A line starting with `>N ` replies to message `N`; message ids are printed
/// as they are assigned so replies can refer to them.
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use jtelebot_core::{BotRequest, BotResponse, Chat, FileSource, Indicator, Message, PlatformSink, User};

use crate::ChannelAdapter;

const QUIT: &str = ":quit";
/// Messages kept for `>N` replies; older ids can no longer be replied to.
const HISTORY_LIMIT: i64 = 200;

pub struct ConsoleChannel {
    chat: Chat,
    user: User,
    next_id: AtomicI64,
    history: Mutex<HashMap<i64, Message>>,
}

impl ConsoleChannel {
    pub fn new(chat_id: i64, user: User) -> Self {
        Self { chat: Chat::new(chat_id), user, next_id: AtomicI64::new(1), history: Mutex::new(HashMap::new()) }
    }

    /// Turn one input line into a request. Blank lines yield `None`.
    pub async fn request_for(&self, line: &str) -> Option<BotRequest> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (reply_id, text) = match line.strip_prefix('>') {
            Some(rest) => match rest.split_once(' ') {
                Some((id, text)) => match id.parse::<i64>() {
                    Ok(id) => (Some(id), text.trim()),
                    Err(_) => (None, line),
                },
                None => (None, line),
            },
            None => (None, line),
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut message = Message::new(id, self.chat.clone(), self.user.clone()).with_text(text);

        let mut history = self.history.lock().await;
        if let Some(reply) = reply_id.and_then(|rid| history.get(&rid)) {
            message = message.with_reply_to(reply.clone());
        }
        history.insert(id, message.clone());
        history.remove(&(id - HISTORY_LIMIT));
        Some(BotRequest::new(message))
    }

    /// Forward every line of `reader` until EOF or `:quit`. Returns the number of requests sent.
    pub async fn pump<R>(&self, reader: R, tx: &mpsc::Sender<BotRequest>) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut sent = 0;
        while let Some(line) = lines.next_line().await? {
            if line.trim() == QUIT {
                break;
            }
            let Some(request) = self.request_for(&line).await else { continue };
            debug!(message_id = request.message().message_id, "Console line received");
            if tx.send(request).await.is_err() {
                break;
            }
            sent += 1;
        }
        Ok(sent)
    }
}

#[async_trait]
impl ChannelAdapter for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn start(&self, tx: mpsc::Sender<BotRequest>) -> Result<()> {
        info!(chat_id = self.chat.id, user_id = self.user.id, "Console channel reading stdin");
        let sent = self.pump(BufReader::new(tokio::io::stdin()), &tx).await?;
        info!(sent, "Console input closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Writes rendered responses to any async writer (stdout by default).
pub struct ConsoleSink {
    out: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::new(Box::new(tokio::io::stdout()))
    }

    pub fn new(out: Box<dyn AsyncWrite + Send + Unpin>) -> Self {
        Self { out: Mutex::new(out) }
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

/// Plain-text rendering of one response.
pub fn render(response: &BotResponse) -> String {
    let reply = response.reply_to_message_id().map(|id| format!("[re {id}] ")).unwrap_or_default();
    match response {
        BotResponse::Text(r) => format!("{reply}{}", r.text),
        BotResponse::File(r) => {
            let files: Vec<String> = r
                .files
                .iter()
                .map(|f| {
                    let size = match &f.source {
                        FileSource::Bytes(bytes) => format!("{} bytes", bytes.len()),
                        FileSource::Path(path) => path.display().to_string(),
                        FileSource::Url(url) => url.clone(),
                    };
                    let caption = f.caption.as_deref().map(|c| format!(": {c}")).unwrap_or_default();
                    format!("<{:?} {} ({size}){caption}>", f.kind, f.name)
                })
                .collect();
            format!("{reply}{}", files.join(" "))
        }
        BotResponse::Delete(r) => format!("<deleted message {}>", r.message_id),
        BotResponse::Location(r) => format!("{reply}<location {:.5}, {:.5}>", r.latitude, r.longitude),
    }
}

#[async_trait]
impl PlatformSink for ConsoleSink {
    async fn send_indicator(&self, _chat_id: i64, indicator: Indicator) -> Result<()> {
        let action = match indicator {
            Indicator::Typing => "typing",
            Indicator::UploadPhoto => "sending a photo",
            Indicator::UploadDocument => "sending a document",
            Indicator::UploadVideo => "sending a video",
        };
        self.write_line(&format!("* {action}…")).await
    }

    async fn deliver(&self, response: &BotResponse) -> Result<()> {
        self.write_line(&render(response)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jtelebot_core::{DeleteResponse, LocationResponse, TextResponse};

    fn channel() -> ConsoleChannel {
        ConsoleChannel::new(-1, User::new(5).with_username("ann"))
    }

    #[tokio::test]
    async fn test_lines_become_numbered_requests() {
        let channel = channel();
        let first = channel.request_for("/ping").await.unwrap();
        let second = channel.request_for("  hello ").await.unwrap();
        assert_eq!(first.message().message_id, 1);
        assert_eq!(second.message().text.as_deref(), Some("hello"));
        assert!(channel.request_for("   ").await.is_none());
    }

    #[tokio::test]
    async fn test_reply_prefix_attaches_earlier_message() {
        let channel = channel();
        channel.request_for("spam").await.unwrap();
        let reply = channel.request_for(">1 +1").await.unwrap();
        let message = reply.message();
        assert_eq!(message.text.as_deref(), Some("+1"));
        assert_eq!(message.reply_to.as_ref().map(|m| m.message_id), Some(1));

        let unknown = channel.request_for(">9 hi").await.unwrap();
        assert!(unknown.message().reply_to.is_none());
        let not_reply = channel.request_for(">x hi").await.unwrap();
        assert_eq!(not_reply.message().text.as_deref(), Some(">x hi"));
    }

    #[tokio::test]
    async fn test_history_keeps_only_recent_messages() {
        let channel = channel();
        for i in 0..HISTORY_LIMIT + 5 {
            channel.request_for(&format!("line {i}")).await.unwrap();
        }
        assert_eq!(channel.history.lock().await.len(), HISTORY_LIMIT as usize);

        let stale = channel.request_for(">5 +1").await.unwrap();
        assert!(stale.message().reply_to.is_none());
        let recent = channel.request_for(&format!(">{} +1", HISTORY_LIMIT + 5)).await.unwrap();
        assert_eq!(recent.message().reply_to.as_ref().map(|m| m.message_id), Some(HISTORY_LIMIT + 5));
    }

    #[tokio::test]
    async fn test_pump_stops_at_quit() {
        let channel = channel();
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"/ping\n\nhello\n:quit\nignored\n";
        let sent = channel.pump(input, &tx).await.unwrap();
        assert_eq!(sent, 2);
        assert_eq!(rx.recv().await.unwrap().message().text.as_deref(), Some("/ping"));
    }

    #[test]
    fn test_render_variants() {
        let message = Message::new(3, Chat::new(-1), User::new(5));
        assert_eq!(render(&TextResponse::reply_to(&message, "pong").into()), "[re 3] pong");
        assert_eq!(render(&DeleteResponse::new(-1, 2).into()), "<deleted message 2>");
        assert_eq!(
            render(&LocationResponse::reply_to(&message, 55.75, 37.61).into()),
            "[re 3] <location 55.75000, 37.61000>"
        );
    }

    #[tokio::test]
    async fn test_sink_writes_lines() {
        let (writer, mut reader) = tokio::io::duplex(1024);
        let sink = ConsoleSink::new(Box::new(writer));
        sink.send_indicator(-1, Indicator::Typing).await.unwrap();
        sink.deliver(&TextResponse::new(-1, "hi").into()).await.unwrap();
        drop(sink);

        let mut output = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut output).await.unwrap();
        assert_eq!(output, "* typing…\nhi\n");
    }
}
