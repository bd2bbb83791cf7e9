//! Collaborator store implementations: in-memory for everything, SQLite for
//! command waits that must survive a restart.

pub mod memory;
pub mod sqlite;

pub use memory::{InMemoryChatStore, InMemoryUserStore, InMemoryWaitingStore};
pub use sqlite::SqliteWaitingStore;
