//! Normalized input events delivered to callbacks.

use crate::hook::types::Button;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current wall-clock time in (fractional) milliseconds since the Unix epoch.
pub fn now_millis() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1000.0
}

/// Convert an event time back to a `DateTime` for display.
fn to_datetime(time: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros((time * 1000.0) as i64).unwrap_or_default()
}

/// A key release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardEvent {
    /// Symbolic name for named keys (`"enter"`, `"shift_r"`), the literal
    /// character for character keys, `None` if the key could not be resolved
    pub key: Option<String>,
    /// Milliseconds since the Unix epoch
    pub time: f64,
}

impl KeyboardEvent {
    pub fn new(key: Option<String>, time: f64) -> Self {
        Self { key, time }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        to_datetime(self.time)
    }
}

/// An accepted (post-debounce) mouse click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseEvent {
    pub x: i32,
    pub y: i32,
    pub button: Button,
    /// Milliseconds since the Unix epoch
    pub time: f64,
}

impl MouseEvent {
    pub fn new(x: i32, y: i32, button: Button, time: f64) -> Self {
        Self { x, y, button, time }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        to_datetime(self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_epoch_based() {
        let now = now_millis();
        // 2020-01-01T00:00:00Z
        assert!(now > 1_577_836_800_000.0);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let event = KeyboardEvent::new(Some("a".into()), 1_700_000_000_123.0);
        assert_eq!(event.timestamp().timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_mouse_event_serializes_button() {
        let event = MouseEvent::new(10, 20, Button::Left, 0.0);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["button"], "Left");
        assert_eq!(json["x"], 10);
    }
}
