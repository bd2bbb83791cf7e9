//! Dispatch Event Logger
//!
//! Structured records of what the dispatcher did with each inbound message,
//! emitted on the `dispatch_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DispatchEvent {
    CommandInvoked {
        command: String,
        argument: Option<String>,
    },
    AccessDenied {
        command: String,
    },
    WaitConsumed {
        command: String,
        used: bool,
    },
    CommandFailed {
        command: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub chat_id: i64,
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
    pub event: DispatchEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redact free text in the event and hand it to tracing.
    pub fn log_event(chat_id: i64, user_id: i64, mut event: DispatchEvent) {
        match &mut event {
            DispatchEvent::CommandInvoked { argument: Some(argument), .. } => {
                *argument = redact_sensitive_data(argument);
            }
            DispatchEvent::CommandFailed { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            _ => {}
        }

        let entry = EventLogEntry { chat_id, user_id, timestamp: Utc::now(), event };
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "dispatch_events", chat_id, user_id, event = %json, "Dispatch event");
    }
}
