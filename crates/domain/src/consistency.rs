//! Consistency report: makes referential drift detectable.
//!
//! The store never reconciles rooms and devices on its own. This report
//! lists every place where the denormalized or referential data disagrees
//! with the actual records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::device::Device;
use crate::id::{DeviceId, RoomId};
use crate::room::Room;

/// A device pointing at a room that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingRoomRef {
    pub device: DeviceId,
    pub room: RoomId,
}

/// A room whose `device_count` disagrees with actual membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCountDrift {
    pub room: RoomId,
    pub recorded: u32,
    pub actual: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConsistencyReport {
    pub dangling_room_refs: Vec<DanglingRoomRef>,
    pub device_count_drift: Vec<DeviceCountDrift>,
    pub dangling_selected_room: Option<RoomId>,
    pub dangling_selected_device: Option<DeviceId>,
}

impl ConsistencyReport {
    /// Inspect the given records and selection cursors.
    #[must_use]
    pub fn inspect(
        devices: &BTreeMap<DeviceId, Device>,
        rooms: &BTreeMap<RoomId, Room>,
        selected_room: Option<&RoomId>,
        selected_device: Option<&DeviceId>,
    ) -> Self {
        let mut membership: BTreeMap<&RoomId, u32> = BTreeMap::new();
        let mut dangling_room_refs = Vec::new();
        for device in devices.values() {
            if rooms.contains_key(&device.room) {
                *membership.entry(&device.room).or_default() += 1;
            } else {
                dangling_room_refs.push(DanglingRoomRef {
                    device: device.id.clone(),
                    room: device.room.clone(),
                });
            }
        }

        let device_count_drift = rooms
            .values()
            .filter_map(|room| {
                let actual = membership.get(&room.id).copied().unwrap_or_default();
                (actual != room.device_count).then(|| DeviceCountDrift {
                    room: room.id.clone(),
                    recorded: room.device_count,
                    actual,
                })
            })
            .collect();

        Self {
            dangling_room_refs,
            device_count_drift,
            dangling_selected_room: selected_room
                .filter(|id| !rooms.contains_key(*id))
                .cloned(),
            dangling_selected_device: selected_device
                .filter(|id| !devices.contains_key(*id))
                .cloned(),
        }
    }

    /// Whether nothing drifted.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.dangling_room_refs.is_empty()
            && self.device_count_drift.is_empty()
            && self.dangling_selected_room.is_none()
            && self.dangling_selected_device.is_none()
    }
}
