//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose alarm, dismiss and journal use-cases to Dart via FRB.
//! - Return the platform work core requested as `PlatformAction` lists that
//!   Dart carries out with the OS.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Each call opens its own store; no state survives between calls except
//!   the ringing dismiss flow.
//! - `PlatformAction` lists are ordered; Dart applies them in order.

use crate::host::ActionQueue;
use morpheus_core::db::open_db;
use morpheus_core::schedule::clock::Clock;
use morpheus_core::{
    compute_next_trigger_ms, core_version as core_version_inner,
    init_logging as init_logging_inner, ping as ping_inner, Alarm, AlarmScheduler, AlarmService,
    AlarmServiceResult, CoreConfig, CreateAlarmRequest, DismissHosts, DismissOutcome,
    DismissSlot, FiringHandler, JournalEntry, JournalService, JournalServiceError, RepoError,
    SqliteAlarmStore, SqliteJournalRepository, SystemClock, TimerPayload,
};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

static CORE_CONFIG: OnceLock<CoreConfig> = OnceLock::new();
static DISMISS_SESSION: OnceLock<Mutex<DismissSession>> = OnceLock::new();

type FfiAlarmService = AlarmService<SqliteAlarmStore, Arc<ActionQueue>, SystemClock>;

/// Platform work requested by core, to be carried out by Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformAction {
    ScheduleWakeTimer {
        alarm_id: i64,
        trigger_at_ms: i64,
        payload_json: String,
    },
    CancelWakeTimer {
        alarm_id: i64,
    },
    EnsureAlarmChannel {
        channel_id: String,
        name: String,
    },
    PostNotification {
        notification_id: i32,
        channel_id: String,
        title: String,
        text: String,
        full_screen_payload_json: Option<String>,
        action_label: Option<String>,
        capture_title: String,
    },
    CancelNotification {
        notification_id: i32,
    },
    StartVibration {
        timings_ms: Vec<u64>,
        repeat_from: Option<u32>,
    },
    CancelVibration,
    PlaySound {
        uri: String,
    },
    StopSound,
    LaunchDismiss {
        payload_json: String,
    },
    OpenJournalCapture {
        title: String,
    },
}

/// Alarm row as shown by the alarm list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmItem {
    pub id: i64,
    pub hour_of_day: u8,
    pub minute: u8,
    pub is_enabled: bool,
    pub label: String,
    pub vibrate: bool,
    pub ringtone_ref: Option<String>,
}

impl From<Alarm> for AlarmItem {
    fn from(alarm: Alarm) -> Self {
        Self {
            id: alarm.id,
            hour_of_day: alarm.hour_of_day,
            minute: alarm.minute,
            is_enabled: alarm.is_enabled,
            label: alarm.label,
            vibrate: alarm.vibrate,
            ringtone_ref: alarm.ringtone_ref,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmListResponse {
    pub ok: bool,
    pub items: Vec<AlarmItem>,
    pub message: String,
}

/// Result envelope for alarm mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmActionResponse {
    pub ok: bool,
    /// The alarm as persisted after the call, when it still exists.
    pub alarm: Option<AlarmItem>,
    pub actions: Vec<PlatformAction>,
    /// Whether Dart should offer a shortcut to the exact-alarm settings.
    pub needs_settings: bool,
    pub message: String,
}

impl AlarmActionResponse {
    fn from_result(
        operation: &str,
        result: AlarmServiceResult<Option<Alarm>>,
        actions: Vec<PlatformAction>,
    ) -> Self {
        match result {
            Ok(alarm) => Self {
                ok: true,
                alarm: alarm.map(AlarmItem::from),
                actions,
                needs_settings: false,
                message: String::new(),
            },
            Err(err) => Self {
                ok: false,
                alarm: None,
                actions,
                needs_settings: err.needs_settings_remediation(),
                message: format!("{operation} failed: {err}"),
            },
        }
    }
}

/// State of the full-screen dismiss flow after a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissResponse {
    pub ok: bool,
    pub alarm_id: Option<i64>,
    pub label: String,
    /// Current time rendered as `h:mm AM/PM`.
    pub current_time: String,
    pub actions: Vec<PlatformAction>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub timestamp_ms: i64,
}

impl From<JournalEntry> for JournalItem {
    fn from(entry: JournalEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            content: entry.content,
            timestamp_ms: entry.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalResponse {
    pub ok: bool,
    pub items: Vec<JournalItem>,
    pub message: String,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`.
/// - Returns an empty string on success and the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Next epoch-ms instant of `hour:minute` in device local time, `None` for
/// out-of-range input.
#[flutter_rust_bridge::frb(sync)]
pub fn next_trigger_epoch_ms(hour_of_day: u8, minute: u8) -> Option<i64> {
    compute_next_trigger_ms(hour_of_day, minute, &SystemClock.now()).ok()
}

#[flutter_rust_bridge::frb(sync)]
pub fn alarm_list() -> AlarmListResponse {
    match with_alarm_service(Arc::new(ActionQueue::new()), |service| {
        Ok(service.alarms()?)
    }) {
        Ok(alarms) => AlarmListResponse {
            ok: true,
            items: alarms.into_iter().map(AlarmItem::from).collect(),
            message: String::new(),
        },
        Err(err) => AlarmListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("alarm_list failed: {err}"),
        },
    }
}

/// Creates an enabled alarm and schedules it.
///
/// # FFI contract
/// - `exact_alarm_permitted` is the current OS grant for precise timers.
/// - On `needs_settings`, nothing was persisted.
#[flutter_rust_bridge::frb(sync)]
pub fn alarm_create(
    hour_of_day: u8,
    minute: u8,
    label: String,
    vibrate: bool,
    ringtone_ref: Option<String>,
    exact_alarm_permitted: bool,
) -> AlarmActionResponse {
    let request = CreateAlarmRequest {
        hour_of_day,
        minute,
        label,
        vibrate,
        ringtone_ref,
    };
    run_alarm_action("alarm_create", exact_alarm_permitted, move |service| {
        service.create_alarm(&request).map(Some)
    })
}

/// Flips the enabled flag; enabling schedules from the current time.
#[flutter_rust_bridge::frb(sync)]
pub fn alarm_toggle(alarm_id: i64, exact_alarm_permitted: bool) -> AlarmActionResponse {
    run_alarm_action("alarm_toggle", exact_alarm_permitted, move |service| {
        service.toggle_alarm(alarm_id).map(Some)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn alarm_delete(alarm_id: i64) -> AlarmActionResponse {
    run_alarm_action("alarm_delete", true, move |service| {
        service.delete_alarm(alarm_id).map(|()| None)
    })
}

/// Re-registers every enabled alarm, e.g. after device boot.
#[flutter_rust_bridge::frb(sync)]
pub fn alarm_resync(exact_alarm_permitted: bool) -> AlarmActionResponse {
    run_alarm_action("alarm_resync", exact_alarm_permitted, |service| {
        service.reschedule_enabled().map(|_| None)
    })
}

/// Entry point for a delivered wake timer.
///
/// Runs the firing steps from the payload alone, then applies the alarm's
/// recurrence policy against the store. A store failure in the second
/// part does not suppress the firing actions.
#[flutter_rust_bridge::frb(sync)]
pub fn alarm_fired(
    payload_json: String,
    notifications_permitted: bool,
    exact_alarm_permitted: bool,
) -> AlarmActionResponse {
    let payload = match TimerPayload::from_json(&payload_json) {
        Ok(payload) => payload,
        Err(err) => {
            return AlarmActionResponse {
                ok: false,
                alarm: None,
                actions: Vec::new(),
                needs_settings: false,
                message: format!("alarm_fired failed: invalid payload: {err}"),
            };
        }
    };

    let queue = Arc::new(
        ActionQueue::new()
            .with_exact_permission(exact_alarm_permitted)
            .with_notification_permission(notifications_permitted),
    );
    let host = queue.as_ref();
    FiringHandler::new(host, host, host).on_timer_fired(&payload);

    let alarm_id = payload.alarm_id;
    let result = with_alarm_service(Arc::clone(&queue), move |service| {
        service.on_alarm_fired(alarm_id)
    });
    AlarmActionResponse::from_result("alarm_fired", result, queue.drain())
}

/// Called when the dismiss screen is shown; starts the alarm sound.
///
/// A flow already showing for another alarm is torn down first.
#[flutter_rust_bridge::frb(sync)]
pub fn dismiss_screen_opened(payload_json: String, ringtone_available: bool) -> DismissResponse {
    let payload = match TimerPayload::from_json(&payload_json) {
        Ok(payload) => payload,
        Err(err) => {
            return DismissResponse {
                ok: false,
                alarm_id: None,
                label: String::new(),
                current_time: String::new(),
                actions: Vec::new(),
                message: format!("dismiss_screen_opened failed: invalid payload: {err}"),
            };
        }
    };

    let mut session = dismiss_session();
    session.queue.set_ringtone_available(ringtone_available);
    let hosts = session.hosts();
    let flow = session.slot.present(payload, &hosts);
    let screen = flow.screen(&SystemClock.now());
    let alarm_id = flow.alarm_id();
    DismissResponse {
        ok: true,
        alarm_id: Some(alarm_id),
        label: screen.label,
        current_time: screen.current_time,
        actions: session.queue.drain(),
        message: String::new(),
    }
}

/// Back navigation never closes a ringing dismiss screen.
#[flutter_rust_bridge::frb(sync)]
pub fn dismiss_back_pressed() -> bool {
    let mut session = dismiss_session();
    if let Some(flow) = session.slot.active() {
        flow.on_back_pressed();
    }
    false
}

/// The user pressed dismiss: stop signals and open journal capture.
#[flutter_rust_bridge::frb(sync)]
pub fn alarm_dismissed() -> DismissResponse {
    let mut session = dismiss_session();
    let alarm_id = session.slot.active_alarm_id();
    let navigator = Arc::clone(&session.queue);
    let outcome = session.slot.dismiss(navigator.as_ref());
    let actions = session.queue.drain();

    let (ok, label, message) = match outcome {
        Some(DismissOutcome::Dismissed { draft }) => (true, draft.title, String::new()),
        Some(DismissOutcome::DismissedWithoutNavigation { draft, error }) => {
            (true, draft.title, format!("journal capture unavailable: {error}"))
        }
        Some(DismissOutcome::AlreadyDismissed) | None => (
            false,
            String::new(),
            "alarm_dismissed failed: no ringing alarm".to_string(),
        ),
    };
    DismissResponse {
        ok,
        alarm_id,
        label,
        current_time: String::new(),
        actions,
        message,
    }
}

/// The dismiss screen went away without a dismissal; signals still stop.
#[flutter_rust_bridge::frb(sync)]
pub fn dismiss_screen_closed() -> Vec<PlatformAction> {
    let mut session = dismiss_session();
    session.slot.teardown();
    session.queue.drain()
}

/// Title the journal capture form starts with.
#[flutter_rust_bridge::frb(sync)]
pub fn journal_draft_title(alarm_label: Option<String>) -> String {
    JournalService::<SqliteJournalRepository<'_>>::capture_draft(alarm_label.as_deref()).title
}

#[flutter_rust_bridge::frb(sync)]
pub fn journal_create(title: String, content: String) -> JournalResponse {
    journal_response("journal_create", |service| {
        service.save(&title, &content).map(|entry| vec![entry])
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn journal_update(entry_id: i64, title: String, content: String) -> JournalResponse {
    journal_response("journal_update", |service| {
        service.update(entry_id, &title, &content).map(|entry| vec![entry])
    })
}

/// Entries newest first.
#[flutter_rust_bridge::frb(sync)]
pub fn journal_list() -> JournalResponse {
    journal_response("journal_list", |service| service.list())
}

#[flutter_rust_bridge::frb(sync)]
pub fn journal_delete(entry_id: i64) -> JournalResponse {
    journal_response("journal_delete", |service| {
        service.delete(entry_id).map(|()| Vec::new())
    })
}

struct DismissSession {
    slot: DismissSlot,
    queue: Arc<ActionQueue>,
}

impl DismissSession {
    fn hosts(&self) -> DismissHosts {
        DismissHosts {
            sound: self.queue.clone(),
            vibrator: self.queue.clone(),
            notifier: self.queue.clone(),
        }
    }
}

fn dismiss_session() -> MutexGuard<'static, DismissSession> {
    DISMISS_SESSION
        .get_or_init(|| {
            Mutex::new(DismissSession {
                slot: DismissSlot::new(),
                queue: Arc::new(ActionQueue::new()),
            })
        })
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn core_config() -> &'static CoreConfig {
    CORE_CONFIG.get_or_init(|| CoreConfig::load(None).unwrap_or_default())
}

fn run_alarm_action(
    operation: &str,
    exact_alarm_permitted: bool,
    f: impl FnOnce(&mut FfiAlarmService) -> AlarmServiceResult<Option<Alarm>>,
) -> AlarmActionResponse {
    let queue = Arc::new(ActionQueue::new().with_exact_permission(exact_alarm_permitted));
    let result = with_alarm_service(Arc::clone(&queue), f);
    AlarmActionResponse::from_result(operation, result, queue.drain())
}

fn with_alarm_service<T>(
    queue: Arc<ActionQueue>,
    f: impl FnOnce(&mut FfiAlarmService) -> AlarmServiceResult<T>,
) -> AlarmServiceResult<T> {
    let config = core_config();
    let conn = open_db(&config.database_path).map_err(RepoError::from)?;
    let store = SqliteAlarmStore::try_new(conn)?;
    let scheduler = AlarmScheduler::new(queue, SystemClock);
    let mut service = AlarmService::new(store, scheduler).with_recurrence(config.recurrence);
    f(&mut service)
}

fn journal_response(
    operation: &str,
    f: impl FnOnce(
        &JournalService<SqliteJournalRepository<'_>>,
    ) -> Result<Vec<JournalEntry>, JournalServiceError>,
) -> JournalResponse {
    let result = open_db(&core_config().database_path)
        .map_err(|err| JournalServiceError::Repo(RepoError::from(err)))
        .and_then(|conn| {
            let service = JournalService::new(SqliteJournalRepository::try_new(&conn)?);
            f(&service)
        });
    match result {
        Ok(entries) => JournalResponse {
            ok: true,
            items: entries.into_iter().map(JournalItem::from).collect(),
            message: String::new(),
        },
        Err(err) => JournalResponse {
            ok: false,
            items: Vec::new(),
            message: format!("{operation} failed: {err}"),
        },
    }
}
