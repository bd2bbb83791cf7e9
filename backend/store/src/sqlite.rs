/// SQLite-backed command waits.
///
/// Waits persist across restarts. `take` is a single `DELETE … RETURNING`
/// statement run under the connection mutex, so a wait is consumed once.
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};

use jtelebot_core::{CommandWaiting, CommandWaitingStore, Message};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS command_waiting (
         chat_id            INTEGER NOT NULL,
         user_id            INTEGER NOT NULL,
         command_identifier TEXT NOT NULL,
         text               TEXT,
         created_at         INTEGER NOT NULL,
         PRIMARY KEY (chat_id, user_id)
     );
     CREATE INDEX IF NOT EXISTS idx_command_waiting_created ON command_waiting(created_at);";

pub struct SqliteWaitingStore {
    conn: Mutex<Connection>,
    ttl: Duration,
}

impl SqliteWaitingStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open SQLite waiting database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL journal")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize command_waiting schema")?;

        info!("SqliteWaitingStore opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn), ttl })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory(ttl: Duration) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn), ttl })
    }

    fn cutoff(&self) -> i64 {
        (Utc::now() - self.ttl).timestamp_millis()
    }
}

#[async_trait]
impl CommandWaitingStore for SqliteWaitingStore {
    async fn add(&self, message: &Message, command_identifier: &str) -> Result<()> {
        let text = message.command_argument.as_deref().filter(|t| !t.trim().is_empty());
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO command_waiting (chat_id, user_id, command_identifier, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.chat.id,
                message.user.id,
                command_identifier,
                text,
                Utc::now().timestamp_millis(),
            ],
        )
        .context("Failed to save command waiting")?;
        debug!(chat_id = message.chat.id, user_id = message.user.id, command = command_identifier, "Waiting added");
        Ok(())
    }

    async fn take(&self, chat_id: i64, user_id: i64) -> Result<Option<CommandWaiting>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "DELETE FROM command_waiting WHERE chat_id = ?1 AND user_id = ?2
                 RETURNING command_identifier, text, created_at",
                params![chat_id, user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .context("Failed to consume command waiting")?;

        let Some((command_identifier, text, created_ms)) = row else {
            return Ok(None);
        };
        if created_ms < self.cutoff() {
            debug!(chat_id, user_id, command = %command_identifier, "Dropped stale waiting");
            return Ok(None);
        }
        let created_at = DateTime::from_timestamp_millis(created_ms).unwrap_or_else(Utc::now);
        Ok(Some(CommandWaiting { chat_id, user_id, command_identifier, text, created_at }))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let removed = conn
            .execute("DELETE FROM command_waiting WHERE created_at < ?1", params![self.cutoff()])
            .context("Failed to purge stale command waits")?;
        Ok(removed)
    }
}
