//! Dream-journal domain model.
//!
//! # Responsibility
//! - Define journal records and the draft handed over by a dismissed alarm.
//!
//! # Invariants
//! - Persisted entries have non-blank title and content.
//! - `timestamp` is epoch milliseconds captured at save time.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned journal entry identity.
pub type JournalEntryId = i64;

/// Placeholder id carried by entries that were not persisted yet.
pub const UNASSIGNED_ENTRY_ID: JournalEntryId = 0;

/// Title used for a capture form opened without an alarm.
pub const DEFAULT_DRAFT_TITLE: &str = "Dream";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub title: String,
    pub content: String,
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,
}

impl JournalEntry {
    pub fn new(title: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: UNASSIGNED_ENTRY_ID,
            title: title.into(),
            content: content.into(),
            timestamp,
        }
    }

    pub fn validate(&self) -> Result<(), JournalValidationError> {
        if self.title.trim().is_empty() {
            return Err(JournalValidationError::EmptyTitle);
        }
        if self.content.trim().is_empty() {
            return Err(JournalValidationError::EmptyContent);
        }
        Ok(())
    }
}

/// Pre-filled capture form opened after an alarm is dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalDraft {
    pub title: String,
}

impl JournalDraft {
    /// Draft for a dismissed alarm: `Dream — {label}`.
    pub fn for_alarm(label: &str) -> Self {
        Self {
            title: format!("{DEFAULT_DRAFT_TITLE} — {label}"),
        }
    }

    /// Draft for a capture form opened directly by the user.
    pub fn blank() -> Self {
        Self {
            title: DEFAULT_DRAFT_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalValidationError {
    EmptyTitle,
    EmptyContent,
}

impl Display for JournalValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "journal title must not be empty"),
            Self::EmptyContent => write!(f, "journal content must not be empty"),
        }
    }
}

impl Error for JournalValidationError {}
