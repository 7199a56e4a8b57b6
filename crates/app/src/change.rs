//! Store changes: what an applied command did.

use homedash_domain::connection::ConnectionStatus;
use homedash_domain::device::Toggle;
use homedash_domain::id::{DeviceId, RoomId};

/// Description of one applied store command, delivered to observers
/// together with the resulting snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    DeviceAdded(DeviceId),
    DeviceUpdated(DeviceId),
    DeviceRemoved(DeviceId),
    DeviceToggled { id: DeviceId, outcome: Toggle },
    DeviceStateSet(DeviceId),
    RoomAdded(RoomId),
    RoomUpdated(RoomId),
    SelectedRoomChanged(Option<RoomId>),
    SelectedDeviceChanged(Option<DeviceId>),
    ConnectionStatusChanged(ConnectionStatus),
    /// `reconcile_device_counts` rewrote the listed rooms.
    DeviceCountsReconciled(Vec<RoomId>),
}

impl StoreChange {
    /// The device this change is about, if any.
    #[must_use]
    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            Self::DeviceAdded(id)
            | Self::DeviceUpdated(id)
            | Self::DeviceRemoved(id)
            | Self::DeviceStateSet(id)
            | Self::DeviceToggled { id, .. } => Some(id),
            Self::SelectedDeviceChanged(id) => id.as_ref(),
            Self::RoomAdded(_)
            | Self::RoomUpdated(_)
            | Self::SelectedRoomChanged(_)
            | Self::ConnectionStatusChanged(_)
            | Self::DeviceCountsReconciled(_) => None,
        }
    }

    /// Whether the change touched the persisted subset (devices and rooms).
    #[must_use]
    pub fn is_durable(&self) -> bool {
        !matches!(
            self,
            Self::SelectedRoomChanged(_)
                | Self::SelectedDeviceChanged(_)
                | Self::ConnectionStatusChanged(_)
        )
    }
}
