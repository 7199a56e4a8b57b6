//! Aggregate projections shown on the dashboard header and room cards.

use serde::Serialize;

use crate::device::Device;
use crate::id::RoomId;
use crate::room::Room;

/// Estimated draw of one active device, in kW.
pub const ENERGY_PER_ACTIVE_DEVICE_KW: f64 = 0.5;

/// Header numbers: device totals and the energy estimate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub online: usize,
    /// Online devices that are switched on.
    pub active: usize,
    /// [`ENERGY_PER_ACTIVE_DEVICE_KW`] × `active`.
    pub energy_kw: f64,
}

impl DashboardStats {
    #[must_use]
    pub fn from_devices<'a>(devices: impl IntoIterator<Item = &'a Device>) -> Self {
        let mut stats = Self::default();
        for device in devices {
            stats.total += 1;
            if device.is_online() {
                stats.online += 1;
            }
            if device.is_active() {
                stats.active += 1;
            }
        }
        stats.energy_kw = energy_estimate(stats.active);
        stats
    }
}

#[allow(clippy::cast_precision_loss)]
fn energy_estimate(active: usize) -> f64 {
    active as f64 * ENERGY_PER_ACTIVE_DEVICE_KW
}

/// Per-room card data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room: RoomId,
    pub name: String,
    /// Actual number of devices referencing the room.
    pub devices: usize,
    pub active: usize,
}

impl RoomSummary {
    #[must_use]
    pub fn for_room<'a>(room: &Room, devices: impl IntoIterator<Item = &'a Device>) -> Self {
        let mut summary = Self {
            room: room.id.clone(),
            name: room.name.clone(),
            devices: 0,
            active: 0,
        };
        for device in devices.into_iter().filter(|d| d.room == room.id) {
            summary.devices += 1;
            if device.is_active() {
                summary.active += 1;
            }
        }
        summary
    }
}
