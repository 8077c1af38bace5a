// Audit-log entries appended to a league's history.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    /// Display name of whoever caused the entry ("system" for scheduled work).
    pub actor: String,
    pub text: String,
}

impl HistoryEntry {
    pub fn new(timestamp: DateTime<Utc>, actor: impl Into<String>, text: impl Into<String>) -> Self {
        HistoryEntry {
            timestamp,
            actor: actor.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.actor,
            self.text
        )
    }
}
