//! Alarm store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist alarm definitions with store-assigned ids.
//! - Serve the ordered alarm collection, both on demand and reactively.
//!
//! # Invariants
//! - `get_all` is ordered by `(hour_of_day, minute)`, ties by id.
//! - Listeners observe the collection once on subscribe and after every
//!   successful mutation, never after a failed one.
//! - `delete` of a missing id is a no-op so rollback paths stay idempotent.

use crate::db::ensure_table;
use crate::model::alarm::{Alarm, AlarmId};
use crate::repo::observer::{Listener, ListenerRegistry, Subscription};
use crate::repo::{bool_to_int, int_to_bool, RepoError, RepoResult};
use log::{debug, error};
use rusqlite::{params, Connection, Row};

const ALARM_SELECT_SQL: &str = "SELECT
    id,
    hour_of_day,
    minute,
    is_enabled,
    label,
    vibrate,
    ringtone_ref
FROM alarms";

/// Listener invoked with the full ordered alarm collection.
pub type AlarmListener = Listener<Alarm>;

/// Persistence interface consumed by the scheduling core.
pub trait AlarmStore {
    /// Returns all alarms ordered by wall-clock time.
    fn get_all(&self) -> RepoResult<Vec<Alarm>>;
    fn get(&self, id: AlarmId) -> RepoResult<Option<Alarm>>;
    /// Persists `alarm` ignoring its current id and returns the new id.
    fn insert(&self, alarm: &Alarm) -> RepoResult<AlarmId>;
    fn update(&self, alarm: &Alarm) -> RepoResult<()>;
    fn delete(&self, id: AlarmId) -> RepoResult<()>;
    /// Registers a collection listener; it is called immediately with the
    /// current collection.
    fn subscribe(&self, listener: AlarmListener) -> RepoResult<Subscription>;
}

/// SQLite-backed alarm store owning its connection.
pub struct SqliteAlarmStore {
    conn: Connection,
    listeners: ListenerRegistry<Alarm>,
}

impl SqliteAlarmStore {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `RepoError::Db(SchemaNotReady)` if the `alarms` table is missing.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_table(&conn, "alarms")?;
        Ok(Self {
            conn,
            listeners: ListenerRegistry::new(),
        })
    }

    /// Borrows the underlying connection for sibling repositories.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        match self.get_all() {
            Ok(alarms) => self.listeners.emit(&alarms),
            Err(err) => error!(
                "event=alarm_store_notify module=repo status=error error={err}"
            ),
        }
    }
}

impl AlarmStore for SqliteAlarmStore {
    fn get_all(&self) -> RepoResult<Vec<Alarm>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ALARM_SELECT_SQL} ORDER BY hour_of_day ASC, minute ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut alarms = Vec::new();
        while let Some(row) = rows.next()? {
            alarms.push(parse_alarm_row(row)?);
        }
        Ok(alarms)
    }

    fn get(&self, id: AlarmId) -> RepoResult<Option<Alarm>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ALARM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_alarm_row(row)?));
        }
        Ok(None)
    }

    fn insert(&self, alarm: &Alarm) -> RepoResult<AlarmId> {
        alarm.validate()?;

        self.conn.execute(
            "INSERT INTO alarms (
                hour_of_day,
                minute,
                is_enabled,
                label,
                vibrate,
                ringtone_ref
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                alarm.hour_of_day,
                alarm.minute,
                bool_to_int(alarm.is_enabled),
                alarm.label.as_str(),
                bool_to_int(alarm.vibrate),
                alarm.ringtone_ref.as_deref(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("event=alarm_insert module=repo status=ok alarm_id={id}");

        self.notify();
        Ok(id)
    }

    fn update(&self, alarm: &Alarm) -> RepoResult<()> {
        alarm.validate()?;

        let changed = self.conn.execute(
            "UPDATE alarms
             SET
                hour_of_day = ?1,
                minute = ?2,
                is_enabled = ?3,
                label = ?4,
                vibrate = ?5,
                ringtone_ref = ?6
             WHERE id = ?7;",
            params![
                alarm.hour_of_day,
                alarm.minute,
                bool_to_int(alarm.is_enabled),
                alarm.label.as_str(),
                bool_to_int(alarm.vibrate),
                alarm.ringtone_ref.as_deref(),
                alarm.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::AlarmNotFound(alarm.id));
        }
        debug!(
            "event=alarm_update module=repo status=ok alarm_id={} enabled={}",
            alarm.id, alarm.is_enabled
        );

        self.notify();
        Ok(())
    }

    fn delete(&self, id: AlarmId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM alarms WHERE id = ?1;", [id])?;
        debug!("event=alarm_delete module=repo status=ok alarm_id={id} changed={changed}");
        if changed > 0 {
            self.notify();
        }
        Ok(())
    }

    fn subscribe(&self, listener: AlarmListener) -> RepoResult<Subscription> {
        let current = self.get_all()?;
        listener(&current);
        Ok(self.listeners.register(listener))
    }
}

fn parse_alarm_row(row: &Row<'_>) -> RepoResult<Alarm> {
    let id: AlarmId = row.get("id")?;
    let hour_of_day = clock_field(row.get("hour_of_day")?, "alarms.hour_of_day")?;
    let minute = clock_field(row.get("minute")?, "alarms.minute")?;

    let alarm = Alarm {
        id,
        hour_of_day,
        minute,
        is_enabled: int_to_bool(row.get("is_enabled")?, "alarms.is_enabled")?,
        label: row.get("label")?,
        vibrate: int_to_bool(row.get("vibrate")?, "alarms.vibrate")?,
        ringtone_ref: row.get("ringtone_ref")?,
    };
    alarm.validate()?;
    Ok(alarm)
}

fn clock_field(value: i64, column: &str) -> RepoResult<u8> {
    u8::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid value `{value}` in {column}")))
}
