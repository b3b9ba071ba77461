//! Per-unit log buffer. Owned by exactly one worker until the aggregator reads it.

use std::fmt::Display;

use super::worker::UnitStatus;
use crate::api::redact;
use crate::journal::timestamp;
use crate::model::ServerId;

/// Marker line prefix for a deliberate no-op (usage above limit).
pub const SKIP_MARKER: &str = "SKIPPED:";
/// Prefix of the terminal status line.
pub const STATUS_MARKER: &str = "STATUS";

#[derive(Debug)]
pub(crate) struct UnitLog {
    server_id: ServerId,
    lines: Vec<String>,
}

impl UnitLog {
    pub fn new(server_id: ServerId) -> Self {
        Self {
            server_id,
            lines: Vec::new(),
        }
    }

    pub fn info(&mut self, msg: impl Display) {
        let text = redact(&msg.to_string());
        tracing::debug!(server_id = %self.server_id, "{}", text);
        self.push("INFO", &text);
    }

    pub fn warn(&mut self, msg: impl Display) {
        let text = redact(&msg.to_string());
        tracing::warn!(server_id = %self.server_id, "{}", text);
        self.push("WARN", &text);
    }

    pub fn error(&mut self, msg: impl Display) {
        let text = redact(&msg.to_string());
        tracing::error!(server_id = %self.server_id, "{}", text);
        self.push("ERROR", &text);
    }

    pub fn skip(&mut self, reason: &str) {
        let text = redact(reason);
        tracing::info!(server_id = %self.server_id, "skipped: {}", text);
        self.push("INFO", &format!("{} {}", SKIP_MARKER, text));
    }

    /// Appends the status sentinel. Must be the last line written.
    pub fn finish(mut self, status: UnitStatus) -> Vec<String> {
        self.push("INFO", &format!("{} {}", STATUS_MARKER, status.code()));
        self.lines
    }

    /// `text` is already redacted.
    fn push(&mut self, level: &str, text: &str) {
        self.lines.push(format!(
            "{} {:<5} server={} {}",
            timestamp(),
            level,
            self.server_id,
            text
        ));
    }
}
