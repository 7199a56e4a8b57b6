//! Device state: a typed payload whose variant is the device type.
//!
//! Serialized adjacently tagged so the persisted form reads
//! `"type": "light", "state": {"on": true, "brightness": 80}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::DeviceType;
use crate::error::ValidationError;

/// Current state of a device, one variant per [`DeviceType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "state", rename_all = "lowercase")]
pub enum DeviceState {
    Light(LightState),
    Sensor(SensorState),
    Camera(CameraState),
    Switch(SwitchState),
    Climate(ClimateState),
    Lock(LockState),
    Speaker(SpeakerState),
}

/// Outcome of flipping a device's primary boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// The primary boolean now holds this value.
    Flipped(bool),
    /// The device type has no primary boolean; nothing changed.
    Unsupported,
}

impl DeviceState {
    /// The device type this payload belongs to.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        match self {
            Self::Light(_) => DeviceType::Light,
            Self::Sensor(_) => DeviceType::Sensor,
            Self::Camera(_) => DeviceType::Camera,
            Self::Switch(_) => DeviceType::Switch,
            Self::Climate(_) => DeviceType::Climate,
            Self::Lock(_) => DeviceType::Lock,
            Self::Speaker(_) => DeviceType::Speaker,
        }
    }

    /// Value of the primary on/off boolean, for types that have one.
    ///
    /// Lights expose `on`, switches expose `active`.
    #[must_use]
    pub fn primary(&self) -> Option<bool> {
        match self {
            Self::Light(light) => Some(light.on),
            Self::Switch(switch) => Some(switch.active),
            Self::Sensor(_)
            | Self::Camera(_)
            | Self::Climate(_)
            | Self::Lock(_)
            | Self::Speaker(_) => None,
        }
    }

    /// Whether the primary boolean is set.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.primary().unwrap_or(false)
    }

    /// Flip the primary boolean in place.
    pub fn toggle(&mut self) -> Toggle {
        match self {
            Self::Light(light) => {
                light.on = !light.on;
                Toggle::Flipped(light.on)
            }
            Self::Switch(switch) => {
                switch.active = !switch.active;
                Toggle::Flipped(switch.active)
            }
            Self::Sensor(_)
            | Self::Camera(_)
            | Self::Climate(_)
            | Self::Lock(_)
            | Self::Speaker(_) => Toggle::Unsupported,
        }
    }

    /// Check payload ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BrightnessOutOfRange`] or
    /// [`ValidationError::VolumeOutOfRange`] for percentages above 100.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Light(light) if light.brightness > 100 => {
                Err(ValidationError::BrightnessOutOfRange(light.brightness))
            }
            Self::Speaker(speaker) if speaker.volume > 100 => {
                Err(ValidationError::VolumeOutOfRange(speaker.volume))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LightState {
    pub on: bool,
    /// Percentage, `0..=100`.
    pub brightness: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchState {
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateState {
    /// Measured temperature in °C.
    pub temperature: f64,
    /// Set point in °C.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

/// Free-form sensor readings keyed by name (`temperature`, `humidity`, …).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorState {
    pub readings: BTreeMap<String, Reading>,
}

impl SensorState {
    /// Add or replace a reading.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Reading>) -> Self {
        self.readings.insert(key.into(), value.into());
        self
    }

    /// Look up a reading by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Reading> {
        self.readings.get(key)
    }
}

/// A single sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Reading {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Reading {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Reading {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Reading {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraState {
    pub recording: bool,
    pub motion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LockState {
    pub locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerState {
    pub playing: bool,
    /// Percentage, `0..=100`.
    pub volume: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_flip_light_on_twice_back_to_original() {
        let mut state = DeviceState::Light(LightState {
            on: false,
            brightness: 50,
        });
        assert_eq!(state.toggle(), Toggle::Flipped(true));
        assert_eq!(state.toggle(), Toggle::Flipped(false));
        assert_eq!(
            state,
            DeviceState::Light(LightState {
                on: false,
                brightness: 50
            })
        );
    }

    #[test]
    fn should_flip_switch_active() {
        let mut state = DeviceState::Switch(SwitchState { active: true });
        assert_eq!(state.toggle(), Toggle::Flipped(false));
        assert!(!state.is_on());
    }

    #[test]
    fn should_leave_camera_untouched_when_toggled() {
        let original = DeviceState::Camera(CameraState {
            recording: true,
            motion: false,
        });
        let mut state = original.clone();
        assert_eq!(state.toggle(), Toggle::Unsupported);
        assert_eq!(state, original);
    }

    #[test]
    fn should_report_no_primary_for_lock() {
        let state = DeviceState::Lock(LockState { locked: true });
        assert_eq!(state.primary(), None);
        assert!(!state.is_on());
    }

    #[test]
    fn should_reject_brightness_above_hundred() {
        let state = DeviceState::Light(LightState {
            on: true,
            brightness: 101,
        });
        assert_eq!(
            state.validate(),
            Err(ValidationError::BrightnessOutOfRange(101))
        );
    }

    #[test]
    fn should_reject_volume_above_hundred() {
        let state = DeviceState::Speaker(SpeakerState {
            playing: false,
            volume: 150,
        });
        assert_eq!(state.validate(), Err(ValidationError::VolumeOutOfRange(150)));
    }

    #[test]
    fn should_serialize_adjacently_tagged() {
        let state = DeviceState::Switch(SwitchState { active: true });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "switch", "state": {"active": true}})
        );
    }

    #[test]
    fn should_serialize_sensor_readings_as_flat_map() {
        let state = DeviceState::Sensor(
            SensorState::default()
                .with("temperature", 21.5)
                .with("unit", "°C"),
        );
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "sensor", "state": {"temperature": 21.5, "unit": "°C"}})
        );
    }

    #[test]
    fn should_deserialize_climate_without_target() {
        let json = r#"{"type": "climate", "state": {"temperature": 19.0}}"#;
        let state: DeviceState = serde_json::from_str(json).unwrap();
        assert_eq!(
            state,
            DeviceState::Climate(ClimateState {
                temperature: 19.0,
                target: None
            })
        );
    }
}
