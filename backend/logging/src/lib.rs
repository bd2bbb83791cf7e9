//! Telemetry and structured logging for jtelebot.
//!
//! Console and rolling NDJSON output, log redaction, dispatch event records, and
//! the tracing-backed error statistics collaborator.

pub mod event_logger;
pub mod logger;
pub mod redact;
pub mod stats;

pub use event_logger::{DispatchEvent, EventLogEntry, EventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
pub use stats::LoggingStats;
