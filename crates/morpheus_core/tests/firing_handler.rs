use morpheus_core::firing::SkipReason;
use morpheus_core::platform::recording::{
    RecordingLauncher, RecordingNavigator, RecordingNotifier, RecordingSoundPlayer,
    RecordingVibrator,
};
use morpheus_core::platform::{
    DismissLauncher, NotificationCategory, NotificationPriority, PlatformError, PlatformResult,
    VibrationPattern, ALARM_CHANNEL_ID, ALARM_NOTIFICATION_ID, CAPTURE_DREAM_ACTION_LABEL,
};
use morpheus_core::{DismissHosts, DismissOutcome, DismissSlot, FiringHandler, StepOutcome};
use morpheus_core::{JournalDraft, TimerPayload};
use std::sync::Arc;

fn payload(alarm_id: i64, vibrate: bool) -> TimerPayload {
    TimerPayload {
        alarm_id,
        label: "Wake up".to_string(),
        vibrate,
        ringtone_ref: None,
    }
}

struct FailingLauncher;

impl DismissLauncher for FailingLauncher {
    fn launch(&self, _payload: &TimerPayload) -> PlatformResult<()> {
        Err(PlatformError::new("activity start blocked"))
    }
}

struct PanickingLauncher;

impl DismissLauncher for PanickingLauncher {
    fn launch(&self, _payload: &TimerPayload) -> PlatformResult<()> {
        panic!("launcher exploded");
    }
}

#[test]
fn fired_alarm_rings_and_dismiss_hands_over_to_capture_once() {
    let notifier = Arc::new(RecordingNotifier::new());
    let vibrator = Arc::new(RecordingVibrator::new());
    let launcher = RecordingLauncher::new();

    let report = FiringHandler::new(notifier.as_ref(), vibrator.as_ref(), &launcher)
        .on_timer_fired(&payload(5, true));

    assert_eq!(report.alarm_id, 5);
    assert!(report.channel.is_done());
    assert!(report.vibration.is_done());
    assert!(report.notification.is_done());
    assert!(report.dismiss_launched());
    assert_eq!(vibrator.active_pattern(), Some(VibrationPattern::alarm()));
    assert_eq!(
        vibrator.active_pattern().unwrap().timings_ms,
        vec![0, 1000, 1000]
    );
    assert!(notifier.is_visible(ALARM_NOTIFICATION_ID));

    let launched = launcher.launched();
    assert_eq!(launched.len(), 1);
    assert_eq!(launched[0].alarm_id, 5);

    let hosts = DismissHosts {
        sound: Arc::new(RecordingSoundPlayer::with_system_defaults()),
        vibrator: vibrator.clone(),
        notifier: notifier.clone(),
    };
    let navigator = RecordingNavigator::new();
    let mut slot = DismissSlot::new();
    slot.present(launched[0].clone(), &hosts);

    let outcome = slot.dismiss(&navigator).unwrap();
    assert_eq!(
        outcome,
        DismissOutcome::Dismissed {
            draft: JournalDraft::for_alarm("Wake up")
        }
    );
    assert!(!vibrator.is_vibrating());
    assert!(!notifier.is_visible(ALARM_NOTIFICATION_ID));
    assert_eq!(navigator.opened().len(), 1);

    assert!(slot.dismiss(&navigator).is_none());
    assert_eq!(navigator.opened().len(), 1);
}

#[test]
fn notification_shape_targets_the_alarm_channel() {
    let notifier = RecordingNotifier::new();
    let vibrator = RecordingVibrator::new();
    let launcher = RecordingLauncher::new();
    FiringHandler::new(&notifier, &vibrator, &launcher).on_timer_fired(&payload(2, true));

    let posted = notifier.posted();
    assert_eq!(posted.len(), 1);
    let notification = &posted[0];
    assert_eq!(notification.id, ALARM_NOTIFICATION_ID);
    assert_eq!(notification.channel_id, ALARM_CHANNEL_ID);
    assert_eq!(notification.priority, NotificationPriority::Max);
    assert_eq!(notification.category, NotificationCategory::Alarm);
    assert!(notification.auto_cancel);
    assert_eq!(notification.full_screen.as_ref().unwrap().alarm_id, 2);
    assert_eq!(notification.actions.len(), 1);
    assert_eq!(notification.actions[0].label, CAPTURE_DREAM_ACTION_LABEL);
    assert_eq!(notification.actions[0].target.title, "Dream — Wake up");
}

#[test]
fn vibration_is_skipped_when_disabled_on_the_alarm() {
    let notifier = RecordingNotifier::new();
    let vibrator = RecordingVibrator::new();
    let launcher = RecordingLauncher::new();

    let report =
        FiringHandler::new(&notifier, &vibrator, &launcher).on_timer_fired(&payload(3, false));

    assert_eq!(
        report.vibration,
        StepOutcome::Skipped(SkipReason::VibrationDisabled)
    );
    assert_eq!(vibrator.starts(), 0);
    assert!(report.dismiss_launched());
}

#[test]
fn denied_notifications_still_vibrate_and_launch_dismiss() {
    let notifier = RecordingNotifier::with_permission(false);
    let vibrator = RecordingVibrator::new();
    let launcher = RecordingLauncher::new();

    let report =
        FiringHandler::new(&notifier, &vibrator, &launcher).on_timer_fired(&payload(4, true));

    assert_eq!(
        report.notification,
        StepOutcome::Skipped(SkipReason::NotificationDenied)
    );
    assert!(notifier.posted().is_empty());
    assert!(vibrator.is_vibrating());
    assert!(report.dismiss_launched());
}

#[test]
fn failing_steps_do_not_block_the_rest() {
    let notifier = RecordingNotifier::new();
    notifier.fail_channel_setup();
    let vibrator = RecordingVibrator::new();
    vibrator.fail_all();
    let launcher = RecordingLauncher::new();

    let report =
        FiringHandler::new(&notifier, &vibrator, &launcher).on_timer_fired(&payload(6, true));

    assert!(matches!(report.channel, StepOutcome::Failed(_)));
    assert!(matches!(report.vibration, StepOutcome::Failed(_)));
    assert!(report.notification.is_done());
    assert!(report.dismiss_launched());
}

#[test]
fn launcher_errors_and_panics_are_reported_not_propagated() {
    let notifier = RecordingNotifier::new();
    let vibrator = RecordingVibrator::new();

    let failed = FiringHandler::new(&notifier, &vibrator, &FailingLauncher)
        .on_timer_fired(&payload(7, true));
    assert!(!failed.dismiss_launched());
    assert!(failed.notification.is_done());

    let panicked = FiringHandler::new(&notifier, &vibrator, &PanickingLauncher)
        .on_timer_fired(&payload(7, true));
    assert!(matches!(panicked.dismiss_launch, StepOutcome::Failed(_)));
}
