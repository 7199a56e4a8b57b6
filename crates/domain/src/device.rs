//! Device: a controllable or observable thing living in a room.

mod state;

pub use state::{
    CameraState, ClimateState, DeviceState, LightState, LockState, Reading, SensorState,
    SpeakerState, SwitchState, Toggle,
};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{HomeDashError, ValidationError};
use crate::id::{DeviceId, RoomId};
use crate::time::{Timestamp, advance, now};

/// Battery level below which a device is flagged as low.
pub const LOW_BATTERY_THRESHOLD: u8 = 20;

/// Closed set of device kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Light,
    Sensor,
    Camera,
    Switch,
    Climate,
    Lock,
    Speaker,
}

impl DeviceType {
    pub const ALL: [Self; 7] = [
        Self::Light,
        Self::Sensor,
        Self::Camera,
        Self::Switch,
        Self::Climate,
        Self::Lock,
        Self::Speaker,
    ];

    /// Whether `toggle` has an effect on devices of this type.
    #[must_use]
    pub fn is_toggleable(self) -> bool {
        matches!(self, Self::Light | Self::Switch)
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Sensor => "sensor",
            Self::Camera => "camera",
            Self::Switch => "switch",
            Self::Climate => "climate",
            Self::Lock => "lock",
            Self::Speaker => "speaker",
        })
    }
}

/// Reachability of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    #[default]
    Offline,
    Error,
}

/// A device registered in the home.
///
/// The device type is not stored separately: it is the variant of
/// [`state`](Self::state), so type and state shape cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub room: RoomId,
    pub status: DeviceStatus,
    #[serde(flatten)]
    pub state: DeviceState,
    pub last_updated: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<u8>,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.state.device_type()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }

    /// Light `on` or switch `active`.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.is_on()
    }

    /// Online and switched on; the devices counted as drawing power.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_online() && self.is_on()
    }

    #[must_use]
    pub fn is_low_battery(&self) -> bool {
        self.battery
            .is_some_and(|level| level < LOW_BATTERY_THRESHOLD)
    }

    #[must_use]
    pub fn is_toggleable(&self) -> bool {
        self.device_type().is_toggleable()
    }

    /// Move `last_updated` forward to the current time.
    pub fn touch(&mut self) {
        self.last_updated = advance(self.last_updated);
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::Validation`] when:
    /// - `id` is empty ([`ValidationError::EmptyId`])
    /// - `battery` is above 100 ([`ValidationError::BatteryOutOfRange`])
    /// - a state percentage is above 100
    pub fn validate(&self) -> Result<(), HomeDashError> {
        self.id.validate()?;
        if let Some(level) = self.battery {
            check_battery(level)?;
        }
        self.state.validate()?;
        Ok(())
    }

    /// Replace the state payload, keeping the device type.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::StateTypeMismatch`] when `state` belongs to
    /// another device type, or a range error from [`DeviceState::validate`].
    pub fn replace_state(&mut self, state: DeviceState) -> Result<(), HomeDashError> {
        ensure_same_type(self.device_type(), &state)?;
        state.validate()?;
        self.state = state;
        self.touch();
        Ok(())
    }

    /// Merge `patch` into this device and refresh `last_updated`.
    ///
    /// Only the fields the patch carries are checked, so a record loaded
    /// with out-of-range data can still receive unrelated updates.
    /// All-or-nothing: on error the device is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::Validation`] if the patched battery or state
    /// is out of range, or if the state belongs to another device type.
    pub fn apply(&mut self, patch: DevicePatch) -> Result<(), HomeDashError> {
        if let Some(Some(level)) = patch.battery {
            check_battery(level)?;
        }
        if let Some(state) = &patch.state {
            ensure_same_type(self.device_type(), state)?;
            state.validate()?;
        }

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(room) = patch.room {
            self.room = room;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(battery) = patch.battery {
            self.battery = battery;
        }
        if let Some(capabilities) = patch.capabilities {
            self.capabilities = capabilities;
        }
        self.touch();
        Ok(())
    }
}

fn check_battery(level: u8) -> Result<(), ValidationError> {
    if level > 100 {
        return Err(ValidationError::BatteryOutOfRange(level));
    }
    Ok(())
}

fn ensure_same_type(expected: DeviceType, state: &DeviceState) -> Result<(), ValidationError> {
    let found = state.device_type();
    if found != expected {
        return Err(ValidationError::StateTypeMismatch { expected, found });
    }
    Ok(())
}

/// Partial update for [`Device::apply`]. `None` fields are left alone.
///
/// `battery` is doubly optional: `Some(None)` clears the level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicePatch {
    pub name: Option<String>,
    pub room: Option<RoomId>,
    pub status: Option<DeviceStatus>,
    pub state: Option<DeviceState>,
    pub battery: Option<Option<u8>>,
    pub capabilities: Option<BTreeSet<String>>,
}

impl DevicePatch {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn room(mut self, room: impl Into<RoomId>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn state(mut self, state: DeviceState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn battery(mut self, level: u8) -> Self {
        self.battery = Some(Some(level));
        self
    }

    #[must_use]
    pub fn clear_battery(mut self) -> Self {
        self.battery = Some(None);
        self
    }

    #[must_use]
    pub fn capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = Some(capabilities.into_iter().map(Into::into).collect());
        self
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    room: Option<RoomId>,
    status: Option<DeviceStatus>,
    state: Option<DeviceState>,
    last_updated: Option<Timestamp>,
    battery: Option<u8>,
    capabilities: BTreeSet<String>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<DeviceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn room(mut self, room: impl Into<RoomId>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn state(mut self, state: DeviceState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn last_updated(mut self, last_updated: Timestamp) -> Self {
        self.last_updated = Some(last_updated);
        self
    }

    #[must_use]
    pub fn battery(mut self, level: u8) -> Self {
        self.battery = Some(level);
        self
    }

    #[must_use]
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// A missing id is generated; a missing room is the empty room id,
    /// which the store tolerates like any other dangling reference.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::Validation`] if `state` is missing
    /// ([`ValidationError::MissingState`]) or any invariant fails.
    pub fn build(self) -> Result<Device, HomeDashError> {
        let state = self.state.ok_or(ValidationError::MissingState)?;
        let device = Device {
            id: self.id.unwrap_or_else(DeviceId::generate),
            name: self.name.unwrap_or_default(),
            room: self.room.unwrap_or_else(|| RoomId::new("")),
            status: self.status.unwrap_or_default(),
            state,
            last_updated: self.last_updated.unwrap_or_else(now),
            battery: self.battery,
            capabilities: self.capabilities,
        };
        device.validate()?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> Device {
        Device::builder()
            .id("lamp1")
            .name("Lamp")
            .room("kitchen")
            .status(DeviceStatus::Online)
            .state(DeviceState::Light(LightState {
                on: false,
                brightness: 50,
            }))
            .capability("dimmable")
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_valid_device_when_all_fields_provided() {
        let device = lamp();
        assert_eq!(device.id.as_str(), "lamp1");
        assert_eq!(device.device_type(), DeviceType::Light);
        assert!(device.capabilities.contains("dimmable"));
        assert!(device.battery.is_none());
    }

    #[test]
    fn should_return_validation_error_when_state_missing() {
        let result = Device::builder().id("x").name("X").build();
        assert!(matches!(
            result,
            Err(HomeDashError::Validation(ValidationError::MissingState))
        ));
    }

    #[test]
    fn should_accept_device_without_name() {
        let device = Device::builder()
            .id("x")
            .state(DeviceState::Lock(LockState::default()))
            .build()
            .unwrap();
        assert_eq!(device.name, "");
    }

    #[test]
    fn should_reject_battery_above_hundred() {
        let result = Device::builder()
            .name("Sensor")
            .state(DeviceState::Sensor(SensorState::default()))
            .battery(120)
            .build();
        assert!(matches!(
            result,
            Err(HomeDashError::Validation(ValidationError::BatteryOutOfRange(120)))
        ));
    }

    #[test]
    fn should_update_only_battery_when_patch_sets_battery() {
        let mut device = lamp();
        let before = device.clone();

        device.apply(DevicePatch::default().battery(42)).unwrap();

        assert_eq!(device.battery, Some(42));
        assert_eq!(device.name, before.name);
        assert_eq!(device.room, before.room);
        assert_eq!(device.state, before.state);
        assert!(device.last_updated >= before.last_updated);
    }

    #[test]
    fn should_clear_battery_when_patch_clears_it() {
        let mut device = lamp();
        device.apply(DevicePatch::default().battery(10)).unwrap();
        device.apply(DevicePatch::default().clear_battery()).unwrap();
        assert!(device.battery.is_none());
    }

    #[test]
    fn should_leave_device_untouched_when_patch_is_invalid() {
        let mut device = lamp();
        let before = device.clone();

        let result = device.apply(DevicePatch::default().name("Renamed").battery(200));

        assert!(result.is_err());
        assert_eq!(device, before);
    }

    #[test]
    fn should_apply_unrelated_patch_when_record_holds_out_of_range_state() {
        let mut device = lamp();
        device.name = String::new();
        device.state = DeviceState::Light(LightState {
            on: true,
            brightness: 150,
        });

        device.apply(DevicePatch::default().battery(42)).unwrap();

        assert_eq!(device.battery, Some(42));
        assert_eq!(device.name, "");
    }

    #[test]
    fn should_reject_patch_carrying_out_of_range_state() {
        let mut device = lamp();
        let before = device.clone();
        let result = device.apply(DevicePatch::default().state(DeviceState::Light(LightState {
            on: true,
            brightness: 101,
        })));
        assert!(matches!(
            result,
            Err(HomeDashError::Validation(ValidationError::BrightnessOutOfRange(101)))
        ));
        assert_eq!(device, before);
    }

    #[test]
    fn should_reject_patch_changing_device_type() {
        let mut device = lamp();
        let result = device.apply(
            DevicePatch::default().state(DeviceState::Camera(CameraState::default())),
        );
        assert!(matches!(
            result,
            Err(HomeDashError::Validation(ValidationError::StateTypeMismatch {
                expected: DeviceType::Light,
                found: DeviceType::Camera,
            }))
        ));
    }

    #[test]
    fn should_replace_whole_state_of_same_type() {
        let mut device = lamp();
        device
            .replace_state(DeviceState::Light(LightState {
                on: true,
                brightness: 100,
            }))
            .unwrap();
        assert!(device.is_on());
    }

    #[test]
    fn should_be_active_only_when_online_and_on() {
        let mut device = lamp();
        assert!(!device.is_active());
        device.state.toggle();
        assert!(device.is_active());
        device.status = DeviceStatus::Offline;
        assert!(!device.is_active());
    }

    #[test]
    fn should_flag_low_battery_below_threshold() {
        let mut device = lamp();
        device.battery = Some(19);
        assert!(device.is_low_battery());
        device.battery = Some(20);
        assert!(!device.is_low_battery());
    }

    #[test]
    fn should_roundtrip_through_serde_json_with_camel_case_keys() {
        let device = lamp();
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["type"], "light");
        assert_eq!(json["state"]["on"], false);
        assert!(json.get("lastUpdated").is_some());
        assert!(json.get("battery").is_none());

        let parsed: Device = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, device);
    }
}
