//! Demo home: four rooms, one device of every type.

use homedash_app::ports::StateStorage;
use homedash_app::store::DeviceStore;
use homedash_domain::device::{
    CameraState, ClimateState, Device, DeviceState, DeviceStatus, LightState, LockState,
    SensorState, SpeakerState, SwitchState,
};
use homedash_domain::error::HomeDashError;
use homedash_domain::room::Room;

/// Rooms of the demo home, with `device_count` left at zero.
///
/// # Errors
///
/// Returns a validation error if a builder fails.
pub fn demo_rooms() -> Result<Vec<Room>, HomeDashError> {
    [
        ("living-room", "Living Room", "sofa"),
        ("bedroom", "Bedroom", "bed"),
        ("kitchen", "Kitchen", "utensils"),
        ("garage", "Garage", "car"),
    ]
    .into_iter()
    .map(|(id, name, icon)| Room::builder().id(id).name(name).icon(icon).build())
    .collect()
}

/// Devices of the demo home, one per device type.
///
/// # Errors
///
/// Returns a validation error if a builder fails.
pub fn demo_devices() -> Result<Vec<Device>, HomeDashError> {
    Ok(vec![
        Device::builder()
            .id("living-room-light")
            .name("Ceiling Light")
            .room("living-room")
            .status(DeviceStatus::Online)
            .state(DeviceState::Light(LightState {
                on: true,
                brightness: 80,
            }))
            .capability("dimmable")
            .build()?,
        Device::builder()
            .id("living-room-speaker")
            .name("Sound Bar")
            .room("living-room")
            .status(DeviceStatus::Online)
            .state(DeviceState::Speaker(SpeakerState {
                playing: false,
                volume: 35,
            }))
            .capability("volume")
            .build()?,
        Device::builder()
            .id("thermostat")
            .name("Thermostat")
            .room("living-room")
            .status(DeviceStatus::Online)
            .state(DeviceState::Climate(ClimateState {
                temperature: 19.5,
                target: Some(21.0),
            }))
            .capability("target-temperature")
            .build()?,
        Device::builder()
            .id("bedroom-light")
            .name("Bedside Lamp")
            .room("bedroom")
            .status(DeviceStatus::Online)
            .state(DeviceState::Light(LightState {
                on: false,
                brightness: 40,
            }))
            .capability("dimmable")
            .build()?,
        Device::builder()
            .id("bedroom-sensor")
            .name("Climate Sensor")
            .room("bedroom")
            .status(DeviceStatus::Online)
            .state(DeviceState::Sensor(
                SensorState::default()
                    .with("temperature", 20.5)
                    .with("humidity", 45.0),
            ))
            .battery(87)
            .build()?,
        Device::builder()
            .id("kitchen-switch")
            .name("Coffee Maker")
            .room("kitchen")
            .status(DeviceStatus::Online)
            .state(DeviceState::Switch(SwitchState { active: false }))
            .build()?,
        Device::builder()
            .id("garage-camera")
            .name("Driveway Camera")
            .room("garage")
            .status(DeviceStatus::Online)
            .state(DeviceState::Camera(CameraState {
                recording: true,
                motion: false,
            }))
            .battery(64)
            .capability("night-vision")
            .build()?,
        Device::builder()
            .id("garage-lock")
            .name("Side Door Lock")
            .room("garage")
            .status(DeviceStatus::Offline)
            .state(DeviceState::Lock(LockState { locked: true }))
            .battery(15)
            .build()?,
    ])
}

/// Add the demo home to `store`.
///
/// Room `device_count`s match the seeded devices. Records already present
/// under the same ids are overwritten.
///
/// # Errors
///
/// Returns a validation error if a demo record is invalid.
#[tracing::instrument(skip_all)]
pub fn seed_demo_home<S: StateStorage>(store: &DeviceStore<S>) -> Result<(), HomeDashError> {
    let devices = demo_devices()?;
    for mut room in demo_rooms()? {
        let count = devices.iter().filter(|d| d.room == room.id).count();
        room.device_count = u32::try_from(count).unwrap_or(u32::MAX);
        store.add_room(room)?;
    }
    let seeded = devices.len();
    for device in devices {
        store.add_device(device)?;
    }
    tracing::info!(devices = seeded, "seeded demo home");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use homedash_domain::device::DeviceType;
    use homedash_domain::id::RoomId;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryStorage {
        slots: Mutex<HashMap<String, String>>,
    }

    impl StateStorage for InMemoryStorage {
        fn load(&self, key: &str) -> Result<Option<String>, HomeDashError> {
            Ok(self.slots.lock().unwrap().get(key).cloned())
        }

        fn save(&self, key: &str, value: &str) -> Result<(), HomeDashError> {
            self.slots
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[test]
    fn should_seed_one_device_of_every_type() {
        let store = DeviceStore::new(InMemoryStorage::default());
        seed_demo_home(&store).unwrap();
        for device_type in DeviceType::ALL {
            assert!(
                !store.devices_by_type(device_type).is_empty(),
                "missing {device_type}"
            );
        }
    }

    #[test]
    fn should_seed_four_rooms() {
        let store = DeviceStore::new(InMemoryStorage::default());
        seed_demo_home(&store).unwrap();
        assert_eq!(store.all_rooms().len(), 4);
        assert!(store.room(&RoomId::new("garage")).is_some());
    }

    #[test]
    fn should_leave_store_consistent_when_seeded() {
        let store = DeviceStore::new(InMemoryStorage::default());
        seed_demo_home(&store).unwrap();
        assert!(store.consistency_report().is_consistent());
    }

    #[test]
    fn should_stay_consistent_when_seeded_twice() {
        let store = DeviceStore::new(InMemoryStorage::default());
        seed_demo_home(&store).unwrap();
        seed_demo_home(&store).unwrap();
        assert!(store.consistency_report().is_consistent());
        assert_eq!(store.all_devices().len(), demo_devices().unwrap().len());
    }

    #[test]
    fn should_include_a_low_battery_device() {
        let devices = demo_devices().unwrap();
        assert!(devices.iter().any(Device::is_low_battery));
    }
}
