//! Device store: the authoritative registry of devices and rooms.
//!
//! Every mutation goes through one of the commands below. An applied command
//! bumps the revision, writes the durable subset through the
//! [`StateStorage`] port and then notifies observers synchronously, all
//! before returning. Commands aimed at missing ids do nothing and return a
//! [`NotFoundError`] the caller is free to ignore.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use homedash_domain::connection::ConnectionStatus;
use homedash_domain::consistency::ConsistencyReport;
use homedash_domain::device::{Device, DevicePatch, DeviceState, DeviceType, Toggle};
use homedash_domain::error::{HomeDashError, NotFoundError};
use homedash_domain::id::{DeviceId, RoomId};
use homedash_domain::room::{Room, RoomPatch};
use homedash_domain::stats::{DashboardStats, RoomSummary};

use crate::change::StoreChange;
use crate::observer::{ObserverRegistry, SubscriptionId};
use crate::persistence::{self, STORAGE_KEY};
use crate::ports::StateStorage;
use crate::state::{StoreSnapshot, StoreState};

/// Result of a view-level toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleRequest {
    /// The device is online; carries the outcome of `toggle_device`.
    Applied(Toggle),
    /// The device is not online; nothing was sent.
    Refused,
}

/// Observable in-memory registry of devices and rooms.
///
/// Owned by the composition root and shared by handle (`Arc`). A single
/// mutex guards the whole state, so commands are serialized; readers get
/// copy-on-write [`StoreSnapshot`]s and never block writers for long.
pub struct DeviceStore<S> {
    storage: S,
    key: String,
    state: Mutex<StoreSnapshot>,
    persisted_revision: Mutex<u64>,
    observers: ObserverRegistry,
}

impl<S: StateStorage> DeviceStore<S> {
    /// Create a store from whatever is persisted under the default key.
    ///
    /// Never fails: an absent or malformed slot yields an empty store.
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, STORAGE_KEY)
    }

    /// Create a store persisting under a custom slot key.
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let loaded = persistence::load(&storage, &key);
        tracing::info!(
            key = %key,
            devices = loaded.devices.len(),
            rooms = loaded.rooms.len(),
            "device store ready"
        );
        Self {
            storage,
            key,
            state: Mutex::new(Arc::new(StoreState::with_records(
                loaded.devices,
                loaded.rooms,
            ))),
            persisted_revision: Mutex::new(0),
            observers: ObserverRegistry::new(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Insert or overwrite a device keyed by its own id.
    ///
    /// The room reference is not checked.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::Validation`] if the device breaks an invariant.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.id))]
    pub fn add_device(&self, device: Device) -> Result<(), HomeDashError> {
        device.validate()?;
        self.apply(|state| {
            let id = device.id.clone();
            state.devices.insert(id.clone(), device);
            Ok(((), StoreChange::DeviceAdded(id)))
        })
    }

    /// Merge `patch` into an existing device and refresh `last_updated`.
    ///
    /// Only the fields carried by the patch are checked. The device type
    /// cannot change: a patch whose `state` is another variant is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::NotFound`] (ignorable) when the device is
    /// absent, or [`HomeDashError::Validation`] when the patched battery or
    /// state is out of range or the state belongs to another device type.
    #[tracing::instrument(skip(self, patch))]
    pub fn update_device(&self, id: &DeviceId, patch: DevicePatch) -> Result<(), HomeDashError> {
        self.apply(|state| {
            device_mut(state, id)?.apply(patch)?;
            Ok(((), StoreChange::DeviceUpdated(id.clone())))
        })
    }

    /// Delete a device. Idempotent: returns the removed record, if any.
    #[tracing::instrument(skip(self))]
    pub fn remove_device(&self, id: &DeviceId) -> Option<Device> {
        self.apply(|state| {
            let removed = state.devices.remove(id).ok_or_else(|| not_found_device(id))?;
            Ok((removed, StoreChange::DeviceRemoved(id.clone())))
        })
        .ok()
    }

    /// Flip the primary boolean of a light (`on`) or switch (`active`).
    ///
    /// Other device types keep their state untouched and report
    /// [`Toggle::Unsupported`]. `last_updated` is refreshed whenever the
    /// device exists.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::NotFound`] (ignorable) when the device is absent.
    #[tracing::instrument(skip(self))]
    pub fn toggle_device(&self, id: &DeviceId) -> Result<Toggle, HomeDashError> {
        self.apply(|state| {
            let device = device_mut(state, id)?;
            let outcome = device.state.toggle();
            device.touch();
            Ok((
                outcome,
                StoreChange::DeviceToggled {
                    id: id.clone(),
                    outcome,
                },
            ))
        })
    }

    /// Toggle as the dashboard card does: only for online devices.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::NotFound`] (ignorable) when the device is absent.
    pub fn request_toggle(&self, id: &DeviceId) -> Result<ToggleRequest, HomeDashError> {
        let online = self
            .snapshot()
            .device(id)
            .map(Device::is_online)
            .ok_or_else(|| not_found_device(id))?;
        if !online {
            tracing::debug!(device_id = %id, "refusing toggle for device that is not online");
            return Ok(ToggleRequest::Refused);
        }
        self.toggle_device(id).map(ToggleRequest::Applied)
    }

    /// Replace the whole state payload of a device (no merge).
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::NotFound`] (ignorable) when the device is
    /// absent, or [`HomeDashError::Validation`] when `new_state` belongs to
    /// another device type or is out of range.
    #[tracing::instrument(skip(self, new_state))]
    pub fn set_device_state(
        &self,
        id: &DeviceId,
        new_state: DeviceState,
    ) -> Result<(), HomeDashError> {
        self.apply(|state| {
            device_mut(state, id)?.replace_state(new_state)?;
            Ok(((), StoreChange::DeviceStateSet(id.clone())))
        })
    }

    /// Insert or overwrite a room keyed by its own id.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::Validation`] if the room breaks an invariant.
    #[tracing::instrument(skip(self, room), fields(room_id = %room.id))]
    pub fn add_room(&self, room: Room) -> Result<(), HomeDashError> {
        room.validate()?;
        self.apply(|state| {
            let id = room.id.clone();
            state.rooms.insert(id.clone(), room);
            Ok(((), StoreChange::RoomAdded(id)))
        })
    }

    /// Merge `patch` into an existing room.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::NotFound`] (ignorable) when the room is absent.
    #[tracing::instrument(skip(self, patch))]
    pub fn update_room(&self, id: &RoomId, patch: RoomPatch) -> Result<(), HomeDashError> {
        self.apply(|state| {
            state
                .rooms
                .get_mut(id)
                .ok_or_else(|| NotFoundError {
                    entity: "Room",
                    id: id.to_string(),
                })?
                .apply(patch);
            Ok(((), StoreChange::RoomUpdated(id.clone())))
        })
    }

    /// Move the room cursor. The id is not checked.
    pub fn set_selected_room(&self, room: Option<RoomId>) {
        self.apply_transient(|state| {
            state.selected_room.clone_from(&room);
            StoreChange::SelectedRoomChanged(room)
        });
    }

    /// Move the device cursor. The id is not checked.
    pub fn set_selected_device(&self, device: Option<DeviceId>) {
        self.apply_transient(|state| {
            state.selected_device.clone_from(&device);
            StoreChange::SelectedDeviceChanged(device)
        });
    }

    /// Record the connection indicator. Gates nothing.
    pub fn set_connection_status(&self, status: ConnectionStatus) {
        self.apply_transient(|state| {
            state.connection_status = status;
            StoreChange::ConnectionStatusChanged(status)
        });
    }

    /// Rewrite every `Room::device_count` from actual membership.
    ///
    /// Explicit and opt-in: the store never runs this on its own. Returns the
    /// rooms whose count changed; nothing is persisted or notified when that
    /// list is empty.
    #[tracing::instrument(skip(self))]
    pub fn reconcile_device_counts(&self) -> Vec<RoomId> {
        let Ok(changed) = self.apply_if(|state| {
            let drift = state.consistency_report().device_count_drift;
            if drift.is_empty() {
                return Ok::<_, Infallible>((Vec::new(), None));
            }
            let mut changed = Vec::with_capacity(drift.len());
            for entry in drift {
                if let Some(room) = state.rooms.get_mut(&entry.room) {
                    room.device_count = entry.actual;
                    changed.push(entry.room);
                }
            }
            let change = StoreChange::DeviceCountsReconciled(changed.clone());
            Ok((changed, Some(change)))
        });
        changed
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Immutable view of the current state (cheap `Arc` clone).
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        Arc::clone(&self.lock())
    }

    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<Device> {
        self.snapshot().device(id).cloned()
    }

    #[must_use]
    pub fn room(&self, id: &RoomId) -> Option<Room> {
        self.snapshot().room(id).cloned()
    }

    #[must_use]
    pub fn all_devices(&self) -> Vec<Device> {
        self.snapshot().devices.values().cloned().collect()
    }

    #[must_use]
    pub fn all_rooms(&self) -> Vec<Room> {
        self.snapshot().rooms.values().cloned().collect()
    }

    /// Devices assigned to `room`, in id order.
    #[must_use]
    pub fn devices_by_room(&self, room: &RoomId) -> Vec<Device> {
        self.snapshot().devices_by_room(room).cloned().collect()
    }

    #[must_use]
    pub fn devices_by_type(&self, device_type: DeviceType) -> Vec<Device> {
        self.snapshot()
            .devices_by_type(device_type)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn online_devices(&self) -> Vec<Device> {
        self.snapshot().online_devices().cloned().collect()
    }

    #[must_use]
    pub fn selected_room(&self) -> Option<RoomId> {
        self.snapshot().selected_room.clone()
    }

    #[must_use]
    pub fn selected_device(&self) -> Option<DeviceId> {
        self.snapshot().selected_device.clone()
    }

    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.snapshot().connection_status
    }

    #[must_use]
    pub fn stats(&self) -> DashboardStats {
        self.snapshot().stats()
    }

    #[must_use]
    pub fn room_summaries(&self) -> Vec<RoomSummary> {
        self.snapshot().room_summaries()
    }

    /// Dangling references and `device_count` drift, if any.
    #[must_use]
    pub fn consistency_report(&self) -> ConsistencyReport {
        self.snapshot().consistency_report()
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Register a handler called after every applied command.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StoreChange, &StoreSnapshot) + Send + Sync + 'static,
    {
        self.observers.subscribe(handler)
    }

    /// Stop notifying a handler. Returns `false` for an unknown id.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, StoreSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `mutation` as one atomic step, then persist and notify.
    ///
    /// `mutation` must leave the state untouched when it returns an error.
    fn apply<T>(
        &self,
        mutation: impl FnOnce(&mut StoreState) -> Result<(T, StoreChange), HomeDashError>,
    ) -> Result<T, HomeDashError> {
        self.apply_if(|state| mutation(state).map(|(value, change)| (value, Some(change))))
    }

    /// [`apply`](Self::apply) for mutations that cannot fail.
    fn apply_transient(&self, mutation: impl FnOnce(&mut StoreState) -> StoreChange) {
        let Ok(()) = self.apply_if(|state| Ok::<_, Infallible>(((), Some(mutation(state)))));
    }

    /// Like [`apply`](Self::apply), but a `None` change means nothing was
    /// modified: no revision bump, no write, no notification.
    fn apply_if<T, E>(
        &self,
        mutation: impl FnOnce(&mut StoreState) -> Result<(T, Option<StoreChange>), E>,
    ) -> Result<T, E> {
        let (value, applied) = {
            let mut guard = self.lock();
            let state = Arc::make_mut(&mut guard);
            let (value, change) = mutation(state)?;
            if change.is_some() {
                state.revision += 1;
            }
            let applied = change.map(|change| (change, Arc::clone(&guard)));
            (value, applied)
        };

        if let Some((change, snapshot)) = applied {
            tracing::debug!(revision = snapshot.revision, ?change, "applied store command");
            if change.is_durable() {
                self.persist(&snapshot);
            }
            self.observers.notify(&change, &snapshot);
        }
        Ok(value)
    }

    /// Write the durable subset unless a newer revision is already stored.
    ///
    /// A failed write is logged; the in-memory mutation stands.
    fn persist(&self, snapshot: &StoreState) {
        let mut persisted = self
            .persisted_revision
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if snapshot.revision <= *persisted {
            return;
        }
        let result = persistence::encode(snapshot)
            .map_err(|err| HomeDashError::Storage(Box::new(err)))
            .and_then(|raw| self.storage.save(&self.key, &raw));
        match result {
            Ok(()) => *persisted = snapshot.revision,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to persist device store");
            }
        }
    }
}

fn device_mut<'a>(state: &'a mut StoreState, id: &DeviceId) -> Result<&'a mut Device, NotFoundError> {
    state.devices.get_mut(id).ok_or_else(|| not_found_device(id))
}

fn not_found_device(id: &DeviceId) -> NotFoundError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
}
