//! Error statistics backed by tracing and in-process counters.

use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};

use jtelebot_core::{BotRequest, Stats};
use tracing::warn;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Default)]
pub struct LoggingStats {
    errors: AtomicU64,
}

impl LoggingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Stats for LoggingStats {
    fn increment_errors(&self, request: &BotRequest, error: &(dyn Error + 'static), note: &str) {
        let total = self.errors.fetch_add(1, Ordering::Relaxed) + 1;
        let text = redact_sensitive_data(request.message().text_or_empty());
        warn!(
            chat_id = request.chat_id(),
            user_id = request.user_id(),
            message_id = request.message().message_id,
            text = %text,
            error = %error,
            note,
            total,
            "Unexpected error while handling message"
        );
    }
}
