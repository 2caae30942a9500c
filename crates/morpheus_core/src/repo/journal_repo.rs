//! Journal entry repository contract and SQLite implementation.
//!
//! # Invariants
//! - Listing is ordered newest first (`timestamp DESC, id DESC`).
//! - Write paths call `JournalEntry::validate()` before SQL mutations.

use crate::db::ensure_table;
use crate::model::journal::{JournalEntry, JournalEntryId};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const ENTRY_SELECT_SQL: &str = "SELECT id, title, content, timestamp FROM journal_entries";

pub trait JournalRepository {
    fn create_entry(&self, entry: &JournalEntry) -> RepoResult<JournalEntryId>;
    fn update_entry(&self, entry: &JournalEntry) -> RepoResult<()>;
    fn get_entry(&self, id: JournalEntryId) -> RepoResult<Option<JournalEntry>>;
    fn list_entries(&self) -> RepoResult<Vec<JournalEntry>>;
    fn delete_entry(&self, id: JournalEntryId) -> RepoResult<()>;
}

/// SQLite-backed journal repository borrowing a migrated connection.
pub struct SqliteJournalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteJournalRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "journal_entries")?;
        Ok(Self { conn })
    }
}

impl JournalRepository for SqliteJournalRepository<'_> {
    fn create_entry(&self, entry: &JournalEntry) -> RepoResult<JournalEntryId> {
        entry.validate()?;
        self.conn.execute(
            "INSERT INTO journal_entries (title, content, timestamp) VALUES (?1, ?2, ?3);",
            params![entry.title.as_str(), entry.content.as_str(), entry.timestamp],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_entry(&self, entry: &JournalEntry) -> RepoResult<()> {
        entry.validate()?;
        let changed = self.conn.execute(
            "UPDATE journal_entries
             SET title = ?1, content = ?2, timestamp = ?3
             WHERE id = ?4;",
            params![
                entry.title.as_str(),
                entry.content.as_str(),
                entry.timestamp,
                entry.id
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::EntryNotFound(entry.id));
        }
        Ok(())
    }

    fn get_entry(&self, id: JournalEntryId) -> RepoResult<Option<JournalEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }
        Ok(None)
    }

    fn list_entries(&self) -> RepoResult<Vec<JournalEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL} ORDER BY timestamp DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn delete_entry(&self, id: JournalEntryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM journal_entries WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::EntryNotFound(id));
        }
        Ok(())
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<JournalEntry> {
    Ok(JournalEntry {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        timestamp: row.get("timestamp")?,
    })
}
