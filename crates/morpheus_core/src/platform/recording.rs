//! Deterministic in-process host implementations.
//!
//! Used by the core's unit and integration tests. The FFI crate has its own
//! action-queue host and does not depend on these.
//! Every implementation records what the core asked for and can be told to
//! deny permissions or fail calls.

use super::{
    AlarmNotification, DismissLauncher, Navigator, NotificationHost, PlatformError,
    PlatformResult, ResolvedSound, SoundPlayer, SoundSource, VibrationPattern, Vibrator,
    WakeTimer, WakeTimerHost,
};
use crate::model::alarm::AlarmId;
use crate::model::journal::JournalDraft;
use crate::schedule::payload::TimerPayload;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory wake-timer table keyed by alarm id.
#[derive(Debug)]
pub struct InMemoryWakeTimers {
    exact_permitted: AtomicBool,
    timers: Mutex<BTreeMap<AlarmId, WakeTimer>>,
    rejected: Mutex<BTreeSet<AlarmId>>,
    register_calls: AtomicUsize,
}

impl InMemoryWakeTimers {
    pub fn new() -> Self {
        Self::with_exact_permission(true)
    }

    pub fn with_exact_permission(permitted: bool) -> Self {
        Self {
            exact_permitted: AtomicBool::new(permitted),
            timers: Mutex::new(BTreeMap::new()),
            rejected: Mutex::new(BTreeSet::new()),
            register_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_exact_permitted(&self, permitted: bool) {
        self.exact_permitted.store(permitted, Ordering::SeqCst);
    }

    /// Makes every later `register` for `alarm_id` fail.
    pub fn reject_registrations_for(&self, alarm_id: AlarmId) {
        lock(&self.rejected).insert(alarm_id);
    }

    pub fn live(&self, alarm_id: AlarmId) -> Option<WakeTimer> {
        lock(&self.timers).get(&alarm_id).cloned()
    }

    pub fn live_count(&self) -> usize {
        lock(&self.timers).len()
    }

    /// Live registrations ordered by alarm id.
    pub fn live_timers(&self) -> Vec<WakeTimer> {
        lock(&self.timers).values().cloned().collect()
    }

    /// Total `register` calls accepted, including replacements.
    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Removes and returns every registration due at `now_ms`, earliest
    /// first, the way a one-shot OS timer is consumed when it fires.
    pub fn take_due(&self, now_ms: i64) -> Vec<WakeTimer> {
        let mut timers = lock(&self.timers);
        let due_ids: Vec<AlarmId> = timers
            .values()
            .filter(|timer| timer.trigger_at_ms <= now_ms)
            .map(|timer| timer.alarm_id)
            .collect();
        let mut due: Vec<WakeTimer> = due_ids
            .into_iter()
            .filter_map(|id| timers.remove(&id))
            .collect();
        due.sort_by_key(|timer| (timer.trigger_at_ms, timer.alarm_id));
        due
    }
}

impl Default for InMemoryWakeTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeTimerHost for InMemoryWakeTimers {
    fn can_schedule_exact(&self) -> bool {
        self.exact_permitted.load(Ordering::SeqCst)
    }

    fn register(&self, timer: WakeTimer) -> PlatformResult<()> {
        if lock(&self.rejected).contains(&timer.alarm_id) {
            return Err(PlatformError::new(format!(
                "timer for alarm {} rejected",
                timer.alarm_id
            )));
        }
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.timers).insert(timer.alarm_id, timer);
        Ok(())
    }

    fn unregister(&self, alarm_id: AlarmId) -> bool {
        lock(&self.timers).remove(&alarm_id).is_some()
    }
}

/// Notification host that keeps posted notifications in memory.
#[derive(Debug)]
pub struct RecordingNotifier {
    permitted: AtomicBool,
    fail_channel_setup: AtomicBool,
    channel_setups: AtomicUsize,
    posted: Mutex<Vec<AlarmNotification>>,
    cancelled: Mutex<Vec<i32>>,
    visible: Mutex<BTreeMap<i32, AlarmNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::with_permission(true)
    }

    pub fn with_permission(permitted: bool) -> Self {
        Self {
            permitted: AtomicBool::new(permitted),
            fail_channel_setup: AtomicBool::new(false),
            channel_setups: AtomicUsize::new(0),
            posted: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            visible: Mutex::new(BTreeMap::new()),
        }
    }

    /// Makes `ensure_alarm_channel` fail from now on.
    pub fn fail_channel_setup(&self) {
        self.fail_channel_setup.store(true, Ordering::SeqCst);
    }

    pub fn channel_setups(&self) -> usize {
        self.channel_setups.load(Ordering::SeqCst)
    }

    pub fn posted(&self) -> Vec<AlarmNotification> {
        lock(&self.posted).clone()
    }

    pub fn cancelled(&self) -> Vec<i32> {
        lock(&self.cancelled).clone()
    }

    pub fn is_visible(&self, notification_id: i32) -> bool {
        lock(&self.visible).contains_key(&notification_id)
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHost for RecordingNotifier {
    fn ensure_alarm_channel(&self) -> PlatformResult<()> {
        if self.fail_channel_setup.load(Ordering::SeqCst) {
            return Err(PlatformError::new("notification channel service unavailable"));
        }
        self.channel_setups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn notifications_permitted(&self) -> bool {
        self.permitted.load(Ordering::SeqCst)
    }

    fn post(&self, notification: &AlarmNotification) -> PlatformResult<()> {
        lock(&self.posted).push(notification.clone());
        lock(&self.visible).insert(notification.id, notification.clone());
        Ok(())
    }

    fn cancel(&self, notification_id: i32) -> PlatformResult<()> {
        lock(&self.cancelled).push(notification_id);
        lock(&self.visible).remove(&notification_id);
        Ok(())
    }
}

/// Vibrator that tracks the active pattern.
#[derive(Debug, Default)]
pub struct RecordingVibrator {
    failing: AtomicBool,
    active: Mutex<Option<VibrationPattern>>,
    starts: AtomicUsize,
    cancels: AtomicUsize,
}

impl RecordingVibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail from now on.
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn active_pattern(&self) -> Option<VibrationPattern> {
        lock(&self.active).clone()
    }

    pub fn is_vibrating(&self) -> bool {
        lock(&self.active).is_some()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    fn check(&self) -> PlatformResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PlatformError::new("vibrator service unavailable"))
        } else {
            Ok(())
        }
    }
}

impl Vibrator for RecordingVibrator {
    fn start_pattern(&self, pattern: &VibrationPattern) -> PlatformResult<()> {
        self.check()?;
        self.starts.fetch_add(1, Ordering::SeqCst);
        *lock(&self.active) = Some(pattern.clone());
        Ok(())
    }

    fn cancel(&self) -> PlatformResult<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        *lock(&self.active) = None;
        Ok(())
    }
}

/// Sound player that only resolves sources marked available.
#[derive(Debug)]
pub struct RecordingSoundPlayer {
    available: Mutex<BTreeSet<SoundSource>>,
    failing: AtomicBool,
    playing: Mutex<Option<ResolvedSound>>,
    plays: Mutex<Vec<ResolvedSound>>,
    stops: AtomicUsize,
}

impl RecordingSoundPlayer {
    /// Player with both system defaults available and no custom ringtones.
    pub fn with_system_defaults() -> Self {
        Self::with_available([SoundSource::DefaultAlarm, SoundSource::DefaultNotification])
    }

    pub fn with_available(sources: impl IntoIterator<Item = SoundSource>) -> Self {
        Self {
            available: Mutex::new(sources.into_iter().collect()),
            failing: AtomicBool::new(false),
            playing: Mutex::new(None),
            plays: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn make_available(&self, source: SoundSource) {
        lock(&self.available).insert(source);
    }

    /// Makes `play` and `stop` fail from now on.
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn playing(&self) -> Option<ResolvedSound> {
        lock(&self.playing).clone()
    }

    pub fn plays(&self) -> Vec<ResolvedSound> {
        lock(&self.plays).clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl SoundPlayer for RecordingSoundPlayer {
    fn resolve(&self, source: &SoundSource) -> Option<ResolvedSound> {
        if !lock(&self.available).contains(source) {
            return None;
        }
        let uri = match source {
            SoundSource::Ringtone(reference) => reference.clone(),
            SoundSource::DefaultAlarm => "system://alarm".to_string(),
            SoundSource::DefaultNotification => "system://notification".to_string(),
        };
        Some(ResolvedSound {
            source: source.clone(),
            uri,
        })
    }

    fn play(&self, sound: &ResolvedSound) -> PlatformResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlatformError::new("audio output unavailable"));
        }
        lock(&self.plays).push(sound.clone());
        *lock(&self.playing) = Some(sound.clone());
        Ok(())
    }

    fn stop(&self) -> PlatformResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlatformError::new("audio output unavailable"));
        }
        *lock(&self.playing) = None;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<TimerPayload>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> Vec<TimerPayload> {
        lock(&self.launched).clone()
    }
}

impl DismissLauncher for RecordingLauncher {
    fn launch(&self, payload: &TimerPayload) -> PlatformResult<()> {
        lock(&self.launched).push(payload.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    opened: Mutex<Vec<JournalDraft>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<JournalDraft> {
        lock(&self.opened).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn open_journal_capture(&self, draft: &JournalDraft) -> PlatformResult<()> {
        lock(&self.opened).push(draft.clone());
        Ok(())
    }
}
