//! Store state and its selectors.
//!
//! Observers receive an immutable [`StoreSnapshot`] and can run the same
//! selectors the store exposes, without touching the store again.

use std::collections::BTreeMap;
use std::sync::Arc;

use homedash_domain::connection::ConnectionStatus;
use homedash_domain::consistency::ConsistencyReport;
use homedash_domain::device::{Device, DeviceType};
use homedash_domain::id::{DeviceId, RoomId};
use homedash_domain::room::Room;
use homedash_domain::stats::{DashboardStats, RoomSummary};

/// Shared, immutable view of the store at one revision.
pub type StoreSnapshot = Arc<StoreState>;

/// Everything the store holds.
///
/// Only `devices` and `rooms` are durable; the selection cursors and the
/// connection status start from their defaults on every load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub devices: BTreeMap<DeviceId, Device>,
    pub rooms: BTreeMap<RoomId, Room>,
    pub selected_room: Option<RoomId>,
    pub selected_device: Option<DeviceId>,
    pub connection_status: ConnectionStatus,
    /// Bumped by every applied command.
    pub revision: u64,
}

impl StoreState {
    /// Fresh state holding the given durable records.
    #[must_use]
    pub fn with_records(
        devices: BTreeMap<DeviceId, Device>,
        rooms: BTreeMap<RoomId, Room>,
    ) -> Self {
        Self {
            devices,
            rooms,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    #[must_use]
    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Devices whose `room` equals `room`, in id order.
    pub fn devices_by_room<'a>(&'a self, room: &'a RoomId) -> impl Iterator<Item = &'a Device> {
        self.devices.values().filter(move |d| &d.room == room)
    }

    pub fn devices_by_type(&self, device_type: DeviceType) -> impl Iterator<Item = &Device> {
        self.devices
            .values()
            .filter(move |d| d.device_type() == device_type)
    }

    pub fn online_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().filter(|d| d.is_online())
    }

    #[must_use]
    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_devices(self.devices.values())
    }

    #[must_use]
    pub fn room_summaries(&self) -> Vec<RoomSummary> {
        self.rooms
            .values()
            .map(|room| RoomSummary::for_room(room, self.devices.values()))
            .collect()
    }

    #[must_use]
    pub fn consistency_report(&self) -> ConsistencyReport {
        ConsistencyReport::inspect(
            &self.devices,
            &self.rooms,
            self.selected_room.as_ref(),
            self.selected_device.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homedash_domain::device::{DeviceState, DeviceStatus, LightState, SensorState};

    fn state() -> StoreState {
        let lamp = Device::builder()
            .id("lamp1")
            .name("Lamp")
            .room("kitchen")
            .status(DeviceStatus::Online)
            .state(DeviceState::Light(LightState {
                on: true,
                brightness: 40,
            }))
            .build()
            .unwrap();
        let probe = Device::builder()
            .id("probe")
            .name("Probe")
            .room("garage")
            .status(DeviceStatus::Offline)
            .state(DeviceState::Sensor(SensorState::default()))
            .build()
            .unwrap();
        let kitchen = Room::builder().id("kitchen").name("Kitchen").build().unwrap();

        StoreState::with_records(
            [(lamp.id.clone(), lamp), (probe.id.clone(), probe)].into(),
            [(kitchen.id.clone(), kitchen)].into(),
        )
    }

    #[test]
    fn should_filter_devices_by_room() {
        let state = state();
        let kitchen = RoomId::new("kitchen");
        let ids: Vec<_> = state.devices_by_room(&kitchen).map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["lamp1"]);
    }

    #[test]
    fn should_filter_devices_by_type() {
        let state = state();
        assert_eq!(state.devices_by_type(DeviceType::Sensor).count(), 1);
        assert_eq!(state.devices_by_type(DeviceType::Camera).count(), 0);
    }

    #[test]
    fn should_list_only_online_devices() {
        let state = state();
        let ids: Vec<_> = state.online_devices().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["lamp1"]);
    }

    #[test]
    fn should_start_from_default_selection_and_status() {
        let state = state();
        assert!(state.selected_room.is_none());
        assert!(state.selected_device.is_none());
        assert_eq!(state.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(state.revision, 0);
    }

    #[test]
    fn should_report_garage_reference_as_dangling() {
        let report = state().consistency_report();
        assert_eq!(report.dangling_room_refs.len(), 1);
        assert_eq!(report.dangling_room_refs[0].room, RoomId::new("garage"));
    }
}
