// Error types shared across the core.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::editing::EditError;
use crate::model::codec::CodecError;
use crate::model::LeagueStatus;
use crate::results::ResultsError;

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Any failure coming back from the record store. Never retried here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to (de)serialize stored field: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed stored value: {0}")]
    Codec(#[from] CodecError),

    #[error("malformed stored timestamp `{value}`: {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("malformed stored id `{value}`")]
    InvalidId { value: String },

    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// A single field that failed pre-submit validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field that failed validation. Produced before any store call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing failed, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, e) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{} {}", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LeagueError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Results(#[from] ResultsError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("{field} deadline passed at {deadline}")]
    DeadlinePassed {
        field: &'static str,
        deadline: DateTime<Utc>,
    },

    #[error("cannot {action} while league is {status}")]
    InvalidState {
        status: LeagueStatus,
        action: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Consistency warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A prediction or result names a queen no longer in the cast.
    UnknownQueen,
    /// A tie-group would push placements past the number of queens.
    GroupOverflow,
    /// A ranking has more slots than the league has queens.
    ExtraRankingSlot,
    BonusCategoryMismatch,
    UnparseableBonusAnswer,
}

/// Non-fatal problem found while deriving scores. The offending entry is
/// skipped rather than failing the whole computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    pub kind: WarningKind,
    pub detail: String,
}

impl ConsistencyWarning {
    pub fn new(kind: WarningKind, detail: impl Into<String>) -> Self {
        ConsistencyWarning {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}
