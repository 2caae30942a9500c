//! Dream-journal use-case service.
//!
//! # Responsibility
//! - Trim and validate capture input before it reaches the repository.
//! - Stamp new entries with the capture time.
//!
//! # Invariants
//! - `update` keeps the entry's original timestamp.
//! - `list` is newest first.

use crate::model::journal::{JournalDraft, JournalEntry, JournalEntryId, JournalValidationError};
use crate::repo::journal_repo::JournalRepository;
use crate::repo::RepoError;
use chrono::Utc;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum JournalServiceError {
    /// Title or content was blank after trimming.
    Invalid(JournalValidationError),
    NotFound(JournalEntryId),
    Repo(RepoError),
}

impl Display for JournalServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "journal entry not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for JournalServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<RepoError> for JournalServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::EntryNotFound(id) => Self::NotFound(id),
            RepoError::InvalidEntry(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

impl From<JournalValidationError> for JournalServiceError {
    fn from(value: JournalValidationError) -> Self {
        Self::Invalid(value)
    }
}

pub type JournalServiceResult<T> = Result<T, JournalServiceError>;

pub struct JournalService<R: JournalRepository> {
    repo: R,
}

impl<R: JournalRepository> JournalService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Capture form pre-filled for a dismissed alarm, or blank without one.
    pub fn capture_draft(alarm_label: Option<&str>) -> JournalDraft {
        match alarm_label.map(str::trim).filter(|label| !label.is_empty()) {
            Some(label) => JournalDraft::for_alarm(label),
            None => JournalDraft::blank(),
        }
    }

    /// Saves a new entry stamped with the current time.
    pub fn save(&self, title: &str, content: &str) -> JournalServiceResult<JournalEntry> {
        self.save_at(title, content, Utc::now().timestamp_millis())
    }

    pub fn save_at(
        &self,
        title: &str,
        content: &str,
        timestamp: i64,
    ) -> JournalServiceResult<JournalEntry> {
        let mut entry = JournalEntry::new(title.trim(), content.trim(), timestamp);
        entry.validate()?;
        entry.id = self.repo.create_entry(&entry)?;
        info!("event=journal_save module=service status=ok entry_id={}", entry.id);
        Ok(entry)
    }

    /// Replaces title and content of an existing entry.
    pub fn update(
        &self,
        id: JournalEntryId,
        title: &str,
        content: &str,
    ) -> JournalServiceResult<JournalEntry> {
        let existing = self
            .repo
            .get_entry(id)?
            .ok_or(JournalServiceError::NotFound(id))?;
        let updated = JournalEntry {
            id,
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            timestamp: existing.timestamp,
        };
        updated.validate()?;
        self.repo.update_entry(&updated)?;
        Ok(updated)
    }

    pub fn get(&self, id: JournalEntryId) -> JournalServiceResult<Option<JournalEntry>> {
        Ok(self.repo.get_entry(id)?)
    }

    pub fn list(&self) -> JournalServiceResult<Vec<JournalEntry>> {
        Ok(self.repo.list_entries()?)
    }

    pub fn delete(&self, id: JournalEntryId) -> JournalServiceResult<()> {
        self.repo.delete_entry(id)?;
        info!("event=journal_delete module=service status=ok entry_id={id}");
        Ok(())
    }
}
