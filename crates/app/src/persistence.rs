//! Persisted form of the store: devices and rooms only.
//!
//! The slot holds a versioned JSON envelope:
//!
//! ```json
//! {"state": {"devices": {"lamp1": {...}}, "rooms": {"kitchen": {...}}}, "version": 0}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use homedash_domain::device::Device;
use homedash_domain::id::{DeviceId, RoomId};
use homedash_domain::room::Room;

use crate::ports::StateStorage;
use crate::state::StoreState;

/// Fixed key of the storage slot.
pub const STORAGE_KEY: &str = "device-storage";

/// Envelope version written by this build.
pub const STORAGE_VERSION: u32 = 0;

/// The durable subset of [`StoreState`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub devices: BTreeMap<DeviceId, Device>,
    #[serde(default)]
    pub rooms: BTreeMap<RoomId, Room>,
}

#[derive(Serialize)]
struct PersistedStateRef<'a> {
    devices: &'a BTreeMap<DeviceId, Device>,
    rooms: &'a BTreeMap<RoomId, Room>,
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    version: u32,
}

/// Why a stored slot could not be used.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed JSON")]
    Json(#[from] serde_json::Error),

    #[error("unsupported storage version {0}")]
    UnsupportedVersion(u32),
}

/// Serialize the durable subset of `state`.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if serialization fails.
pub fn encode(state: &StoreState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope {
        state: PersistedStateRef {
            devices: &state.devices,
            rooms: &state.rooms,
        },
        version: STORAGE_VERSION,
    })
}

/// Parse a stored slot.
///
/// Records are re-keyed by their own id, so a map key that disagrees with
/// the record it holds can never survive a load.
///
/// # Errors
///
/// Returns [`DecodeError`] when the content is not a valid envelope of the
/// supported version.
pub fn decode(raw: &str) -> Result<PersistedState, DecodeError> {
    let envelope: Envelope<PersistedState> = serde_json::from_str(raw)?;
    if envelope.version != STORAGE_VERSION {
        return Err(DecodeError::UnsupportedVersion(envelope.version));
    }
    let PersistedState { devices, rooms } = envelope.state;
    Ok(PersistedState {
        devices: devices
            .into_values()
            .map(|device| (device.id.clone(), device))
            .collect(),
        rooms: rooms
            .into_values()
            .map(|room| (room.id.clone(), room))
            .collect(),
    })
}

/// Read the slot at `key`, falling back to empty state on any failure.
pub fn load(storage: &impl StateStorage, key: &str) -> PersistedState {
    let raw = match storage.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!(key, "no persisted state, starting empty");
            return PersistedState::default();
        }
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to read persisted state, starting empty");
            return PersistedState::default();
        }
    };
    match decode(&raw) {
        Ok(state) => {
            tracing::debug!(
                key,
                devices = state.devices.len(),
                rooms = state.rooms.len(),
                "loaded persisted state"
            );
            state
        }
        Err(err) => {
            tracing::warn!(key, error = %err, "discarding malformed persisted state");
            PersistedState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homedash_domain::device::{DeviceState, DeviceStatus, SwitchState};
    use homedash_domain::error::HomeDashError;
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

    struct BrokenStorage;

    impl StateStorage for BrokenStorage {
        fn load(&self, _key: &str) -> Result<Option<String>, HomeDashError> {
            Err(HomeDashError::Storage("disk on fire".into()))
        }

        fn save(&self, _key: &str, _value: &str) -> Result<(), HomeDashError> {
            Err(HomeDashError::Storage("disk on fire".into()))
        }
    }

    fn populated() -> StoreState {
        let plug = Device::builder()
            .id("plug")
            .name("Plug")
            .room("garage")
            .status(DeviceStatus::Online)
            .state(DeviceState::Switch(SwitchState { active: true }))
            .battery(64)
            .build()
            .unwrap();
        let garage = Room::builder()
            .id("garage")
            .name("Garage")
            .icon("car")
            .device_count(1)
            .build()
            .unwrap();
        let mut state = StoreState::with_records(
            [(plug.id.clone(), plug)].into(),
            [(garage.id.clone(), garage)].into(),
        );
        state.selected_room = Some(RoomId::new("garage"));
        state
    }

    #[test]
    fn should_reproduce_devices_and_rooms_after_encode_decode() {
        let state = populated();
        let decoded = decode(&encode(&state).unwrap()).unwrap();
        assert_eq!(decoded.devices, state.devices);
        assert_eq!(decoded.rooms, state.rooms);
    }

    #[test]
    fn should_not_persist_selection() {
        let raw = encode(&populated()).unwrap();
        assert!(!raw.contains("selected"));
        assert!(!raw.contains("connection"));
    }

    #[test]
    fn should_wrap_state_in_versioned_envelope() {
        let raw = encode(&StoreState::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": {"devices": {}, "rooms": {}}, "version": 0})
        );
    }

    #[test]
    fn should_rekey_records_by_their_own_id() {
        let raw = r#"{"state": {"devices": {}, "rooms": {"wrong": {"id": "hall", "name": "Hall", "icon": "home", "deviceCount": 0}}}, "version": 0}"#;
        let decoded = decode(raw).unwrap();
        assert!(decoded.rooms.contains_key(&RoomId::new("hall")));
        assert!(!decoded.rooms.contains_key(&RoomId::new("wrong")));
    }

    #[test]
    fn should_reject_unknown_version() {
        let raw = r#"{"state": {"devices": {}, "rooms": {}}, "version": 7}"#;
        assert!(matches!(
            decode(raw),
            Err(DecodeError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn should_fall_back_to_empty_when_slot_missing() {
        let storage = InMemoryStorage::default();
        assert_eq!(load(&storage, STORAGE_KEY), PersistedState::default());
    }

    #[test]
    fn should_fall_back_to_empty_when_slot_malformed() {
        let storage = InMemoryStorage::default();
        storage.save(STORAGE_KEY, "{not json").unwrap();
        assert_eq!(load(&storage, STORAGE_KEY), PersistedState::default());
    }

    #[test]
    fn should_fall_back_to_empty_when_storage_fails() {
        assert_eq!(load(&BrokenStorage, STORAGE_KEY), PersistedState::default());
    }

    #[test]
    fn should_load_what_was_saved() {
        let storage = InMemoryStorage::default();
        let state = populated();
        storage.save(STORAGE_KEY, &encode(&state).unwrap()).unwrap();

        let loaded = load(&storage, STORAGE_KEY);
        assert_eq!(loaded.devices, state.devices);
        assert_eq!(loaded.rooms, state.rooms);
    }
}
