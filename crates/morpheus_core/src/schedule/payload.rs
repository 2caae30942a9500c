//! Timer payload carried through the host and delivered back on fire.
//!
//! The payload holds everything the firing path needs, so a fired timer can
//! be handled without reading the store.

use crate::model::alarm::{Alarm, AlarmId, DEFAULT_ALARM_LABEL};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPayload {
    pub alarm_id: AlarmId,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_vibrate")]
    pub vibrate: bool,
    #[serde(default)]
    pub ringtone_ref: Option<String>,
}

fn default_label() -> String {
    DEFAULT_ALARM_LABEL.to_string()
}

fn default_vibrate() -> bool {
    true
}

impl TimerPayload {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes a payload stored by the host; missing label and vibrate
    /// fields fall back to their defaults.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl From<&Alarm> for TimerPayload {
    fn from(alarm: &Alarm) -> Self {
        Self {
            alarm_id: alarm.id,
            label: alarm.label.clone(),
            vibrate: alarm.vibrate,
            ringtone_ref: alarm.ringtone_ref.clone(),
        }
    }
}
