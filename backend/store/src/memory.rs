/// In-memory stores. Nothing here survives a restart.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use jtelebot_core::{
    AccessLevel, Chat, ChatStore, CommandWaiting, CommandWaitingStore, Message, User, UserStore,
};

fn normalize_username(username: &str) -> String {
    username.trim().trim_start_matches('@').to_lowercase()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<i64, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let wanted = normalize_username(username);
        if wanted.is_empty() {
            return Ok(None);
        }
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username.as_deref().map(normalize_username).as_deref() == Some(wanted.as_str()))
            .cloned())
    }

    async fn get_access_level(&self, id: i64) -> Result<Option<AccessLevel>> {
        Ok(self.users.read().await.get(&id).map(|u| u.access_level))
    }

    async fn save(&self, user: &User) -> Result<()> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chats
// ---------------------------------------------------------------------------

#[derive(Default, Clone)]
pub struct InMemoryChatStore {
    chats: Arc<RwLock<HashMap<i64, Chat>>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn get(&self, id: i64) -> Result<Option<Chat>> {
        Ok(self.chats.read().await.get(&id).cloned())
    }

    async fn get_access_level(&self, id: i64) -> Result<Option<AccessLevel>> {
        Ok(self.chats.read().await.get(&id).and_then(|c| c.access_level))
    }

    async fn save(&self, chat: &Chat) -> Result<()> {
        self.chats.write().await.insert(chat.id, chat.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command waits
// ---------------------------------------------------------------------------

/// Waits keyed by (chat id, user id). Removal happens under one lock, so a take
/// is atomic per key.
pub struct InMemoryWaitingStore {
    entries: Mutex<HashMap<(i64, i64), CommandWaiting>>,
    ttl: Duration,
}

impl InMemoryWaitingStore {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CommandWaitingStore for InMemoryWaitingStore {
    async fn add(&self, message: &Message, command_identifier: &str) -> Result<()> {
        let waiting = CommandWaiting {
            chat_id: message.chat.id,
            user_id: message.user.id,
            command_identifier: command_identifier.to_string(),
            text: message.command_argument.clone().filter(|t| !t.trim().is_empty()),
            created_at: Utc::now(),
        };
        debug!(chat_id = waiting.chat_id, user_id = waiting.user_id, command = command_identifier, "Waiting added");
        self.entries.lock().await.insert((waiting.chat_id, waiting.user_id), waiting);
        Ok(())
    }

    async fn take(&self, chat_id: i64, user_id: i64) -> Result<Option<CommandWaiting>> {
        let removed = self.entries.lock().await.remove(&(chat_id, user_id));
        Ok(removed.filter(|w| {
            let expired = w.is_expired(self.ttl, Utc::now());
            if expired {
                debug!(chat_id, user_id, command = %w.command_identifier, "Dropped stale waiting");
            }
            !expired
        }))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, w| !w.is_expired(self.ttl, now));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(chat_id: i64, user_id: i64) -> Message {
        Message::new(1, Chat::new(chat_id), User::new(user_id)).with_text("/echo")
    }

    #[tokio::test]
    async fn test_waiting_is_single_use() {
        let store = InMemoryWaitingStore::new(Duration::minutes(10));
        store.add(&message(-1, 2), "echo").await.unwrap();

        let first = store.take(-1, 2).await.unwrap();
        let second = store.take(-1, 2).await.unwrap();
        assert_eq!(first.unwrap().command_identifier, "echo");
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_add_overwrites_existing_wait() {
        let store = InMemoryWaitingStore::new(Duration::minutes(10));
        store.add(&message(-1, 2), "echo").await.unwrap();
        store.add(&message(-1, 2), "location").await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.take(-1, 2).await.unwrap().unwrap().command_identifier, "location");
    }

    #[tokio::test]
    async fn test_waits_are_per_chat_and_user() {
        let store = InMemoryWaitingStore::new(Duration::minutes(10));
        store.add(&message(-1, 2), "echo").await.unwrap();

        assert!(store.take(-1, 3).await.unwrap().is_none());
        assert!(store.take(-9, 2).await.unwrap().is_none());
        assert!(store.take(-1, 2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_partial_text_is_kept() {
        let store = InMemoryWaitingStore::new(Duration::minutes(10));
        let mut msg = message(-1, 2);
        msg.command_argument = Some("55.7".into());
        store.add(&msg, "location").await.unwrap();

        assert_eq!(store.take(-1, 2).await.unwrap().unwrap().text.as_deref(), Some("55.7"));
    }

    #[tokio::test]
    async fn test_stale_wait_is_consumed_but_not_returned() {
        let store = InMemoryWaitingStore::new(Duration::seconds(-1));
        store.add(&message(-1, 2), "echo").await.unwrap();

        assert!(store.take(-1, 2).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemoryWaitingStore::new(Duration::seconds(-1));
        store.add(&message(-1, 2), "echo").await.unwrap();
        store.add(&message(-1, 3), "echo").await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_takes_consume_once() {
        let store = Arc::new(InMemoryWaitingStore::new(Duration::minutes(10)));
        store.add(&message(-1, 2), "echo").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.take(-1, 2).await.unwrap() }));
        }
        let mut hits = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                hits += 1;
            }
        }
        assert_eq!(hits, 1);
    }

    #[tokio::test]
    async fn test_user_lookup_by_username() {
        let store = InMemoryUserStore::new();
        store.save(&User::new(1).with_username("Alice")).await.unwrap();
        store.save(&User::new(2)).await.unwrap();

        assert_eq!(store.get_by_username("@alice").await.unwrap().unwrap().id, 1);
        assert!(store.get_by_username("bob").await.unwrap().is_none());
        assert!(store.get_by_username("@").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_chat_access_level_override() {
        let store = InMemoryChatStore::new();
        let mut chat = Chat::new(-10);
        store.save(&chat).await.unwrap();
        assert_eq!(store.get_access_level(-10).await.unwrap(), None);

        chat.access_level = Some(AccessLevel::Trusted);
        store.save(&chat).await.unwrap();
        assert_eq!(store.get_access_level(-10).await.unwrap(), Some(AccessLevel::Trusted));
    }
}
