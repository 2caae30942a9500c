//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define the narrow store contracts used by scheduling and journal code.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Each mutation touches exactly one row.

use crate::db::DbError;
use crate::model::alarm::{AlarmId, AlarmValidationError};
use crate::model::journal::{JournalEntryId, JournalValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod alarm_repo;
pub mod journal_repo;
pub mod observer;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by alarm and journal persistence.
#[derive(Debug)]
pub enum RepoError {
    InvalidAlarm(AlarmValidationError),
    InvalidEntry(JournalValidationError),
    /// Persistence layer failure; the store is unavailable for this call.
    Db(DbError),
    AlarmNotFound(AlarmId),
    EntryNotFound(JournalEntryId),
    InvalidData(String),
}

impl RepoError {
    /// Whether the error comes from the storage backend rather than input.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Db(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAlarm(err) => write!(f, "{err}"),
            Self::InvalidEntry(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "store unavailable: {err}"),
            Self::AlarmNotFound(id) => write!(f, "alarm not found: {id}"),
            Self::EntryNotFound(id) => write!(f, "journal entry not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidAlarm(err) => Some(err),
            Self::InvalidEntry(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::AlarmNotFound(_) | Self::EntryNotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<AlarmValidationError> for RepoError {
    fn from(value: AlarmValidationError) -> Self {
        Self::InvalidAlarm(value)
    }
}

impl From<JournalValidationError> for RepoError {
    fn from(value: JournalValidationError) -> Self {
        Self::InvalidEntry(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
