//! Notifications emitted on condition transitions.

use crate::{Condition, SensorType};

/// A user-visible alert produced when a sensor changes condition.
///
/// Everything except `saved` is fixed at creation. `saved` flips to `true`
/// once the notification has been written to durable storage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Notification {
    /// Unique id; combines gear, sensor, time and a random component.
    pub id: String,
    pub message: String,
    /// Unix timestamp in milliseconds when the transition was detected.
    pub timestamp_ms: u64,
    pub gear_id: String,
    pub sensor: SensorType,
    pub value: f64,
    pub is_critical: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub saved: bool,
}

impl Notification {
    /// The message template for a transition into `condition`.
    ///
    /// Returns `None` for [`Condition::None`], which never produces an alert.
    pub fn message_for(sensor: SensorType, condition: Condition) -> Option<String> {
        match condition {
            Condition::Critical => Some(format!("High {} Detected!", sensor.label())),
            Condition::Normal => Some(format!("{} is back to normal.", sensor.label())),
            Condition::None => None,
        }
    }

    /// The condition this notification announced.
    pub fn condition(&self) -> Condition {
        if self.is_critical {
            Condition::Critical
        } else {
            Condition::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_templates() {
        assert_eq!(
            Notification::message_for(SensorType::SmokeSensor, Condition::Critical).as_deref(),
            Some("High Smoke Detected!")
        );
        assert_eq!(
            Notification::message_for(SensorType::HeartRate, Condition::Normal).as_deref(),
            Some("Heart Rate is back to normal.")
        );
        assert!(Notification::message_for(SensorType::HeartRate, Condition::None).is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn saved_defaults_to_false() {
        let json = r#"{
            "id": "HH-01-heartRate-1-a",
            "message": "High Heart Rate Detected!",
            "timestampMs": 1,
            "gearId": "HH-01",
            "sensor": "heartRate",
            "value": 130.0,
            "isCritical": true
        }"#;
        let notification: Notification = serde_json::from_str(json).unwrap();
        assert!(!notification.saved);
        assert_eq!(notification.condition(), Condition::Critical);
    }
}
