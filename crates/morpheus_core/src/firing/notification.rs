use crate::model::journal::JournalDraft;
use crate::platform::{
    AlarmNotification, NotificationAction, NotificationCategory, NotificationPriority,
    ALARM_CHANNEL_ID, ALARM_NOTIFICATION_ID, CAPTURE_DREAM_ACTION_LABEL,
};
use crate::schedule::payload::TimerPayload;

/// Builds the high-priority alarm notification for a fired timer.
///
/// Tapping the body or the "Capture Dream" action opens journal capture
/// pre-filled from the alarm label; the full-screen target is the dismiss
/// flow.
pub fn alarm_notification(payload: &TimerPayload) -> AlarmNotification {
    let draft = JournalDraft::for_alarm(&payload.label);
    AlarmNotification {
        id: ALARM_NOTIFICATION_ID,
        channel_id: ALARM_CHANNEL_ID.to_string(),
        title: format!("Alarm: {}", payload.label),
        text: "Time to wake up!".to_string(),
        priority: NotificationPriority::Max,
        category: NotificationCategory::Alarm,
        full_screen: Some(payload.clone()),
        content_target: draft.clone(),
        actions: vec![NotificationAction {
            label: CAPTURE_DREAM_ACTION_LABEL.to_string(),
            target: draft,
        }],
        auto_cancel: true,
    }
}
