//! Room: the grouping every device belongs to.

use serde::{Deserialize, Serialize};

use crate::error::HomeDashError;
use crate::id::RoomId;

/// A room such as the kitchen or the garage.
///
/// `device_count` is denormalized display data. Nothing keeps it in sync
/// with actual membership automatically; see
/// [`ConsistencyReport`](crate::consistency::ConsistencyReport).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub device_count: u32,
}

impl Room {
    /// Create a builder for constructing a [`Room`].
    #[must_use]
    pub fn builder() -> RoomBuilder {
        RoomBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::Validation`] when `id` is empty.
    pub fn validate(&self) -> Result<(), HomeDashError> {
        self.id.validate()?;
        Ok(())
    }

    /// Merge `patch` into this room.
    pub fn apply(&mut self, patch: RoomPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        if let Some(device_count) = patch.device_count {
            self.device_count = device_count;
        }
    }
}

/// Partial update for [`Room::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub device_count: Option<u32>,
}

impl RoomPatch {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn device_count(mut self, device_count: u32) -> Self {
        self.device_count = Some(device_count);
        self
    }
}

/// Step-by-step builder for [`Room`].
#[derive(Debug, Default)]
pub struct RoomBuilder {
    id: Option<RoomId>,
    name: Option<String>,
    icon: Option<String>,
    device_count: u32,
}

impl RoomBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<RoomId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn device_count(mut self, device_count: u32) -> Self {
        self.device_count = device_count;
        self
    }

    /// Consume the builder, validate, and return a [`Room`].
    ///
    /// # Errors
    ///
    /// Returns [`HomeDashError::Validation`] if the id is empty.
    pub fn build(self) -> Result<Room, HomeDashError> {
        let room = Room {
            id: self.id.unwrap_or_else(RoomId::generate),
            name: self.name.unwrap_or_default(),
            icon: self.icon.unwrap_or_else(|| "home".to_string()),
            device_count: self.device_count,
        };
        room.validate()?;
        Ok(room)
    }
}
